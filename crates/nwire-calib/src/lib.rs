//! Facade crate for the `nwire-*` workspace.
//!
//! - re-exports of the geometry, recognition and calibration crates
//! - [`NWireCalibConfig`]: JSON configuration building a ready pipeline
//! - [`NWireCalibration`]: label raw frames, then calibrate
//!
//! ## Quickstart
//!
//! ```no_run
//! use nwire_calib::{AcquiredFrame, NWireCalibConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NWireCalibConfig::load_json("nwire_config.json")?;
//! let pipeline = config.build_pipeline()?;
//!
//! let frames: Vec<AcquiredFrame> =
//!     serde_json::from_str(&std::fs::read_to_string("frames.json")?)?;
//! let result = pipeline.run(&[], &frames)?;
//! println!("{:?}", result.image_to_probe);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `nwire_calib::core`: dots, lines, phantom definition, pattern geometry.
//! - `nwire_calib::detect`: line finder, pattern labeler, per-frame detector.
//! - `nwire_calib::probe`: robust solve, reprojection statistics, calibrator.

pub use nwire_core as core;
pub use nwire_detect as detect;
pub use nwire_probe as probe;

pub use nwire_core::{Dot, LabeledDot, LabelingResult, PatternKind, PhantomDefinition};
pub use nwire_detect::{DetectionResult, FrameDots, NWireDetector, NWireDetectorParams};
pub use nwire_probe::{
    CalibrationError, CalibrationOptions, CalibrationRefiner, CalibrationResult,
    ProbeCalibrator, TrackedFrame,
};

mod io;
mod pipeline;

pub use io::{NWireCalibConfig, NWireConfigError, NWireIoError};
pub use pipeline::{AcquiredFrame, NWireCalibration};
