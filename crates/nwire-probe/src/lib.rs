//! Ultrasound probe calibration with N-wire phantoms.
//!
//! [`ProbeCalibrator`] turns labeled frames plus tracked poses into the
//! image-to-probe matrix. The pieces it is built from are public as well:
//! frame preprocessing, the robust linear solve, trimmed statistics and the
//! reprojection reports.

mod calibrator;
mod error;
pub mod frame;
pub mod lsq;
pub mod reprojection;
pub mod stats;

pub use calibrator::{
    AxisSolveSummary, CalibrationOptions, CalibrationRefiner, CalibrationResult, InlierSample,
    ProbeCalibrator,
};
pub use error::{CalibrationError, SolveError, TransformKind};
pub use frame::{PatternSample, PreparedFrame, TrackedFrame};
pub use lsq::{solve_robust, RobustSolution, RobustSolveParams};
pub use reprojection::{
    Reprojection2dReport, Reprojection3dReport, ReprojectionErrorReport, WireAxisStats,
};
pub use stats::ErrorStats;
