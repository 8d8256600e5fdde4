use std::fmt;

use nwire_core::{PatternKind, PhantomError};
use serde::Serialize;

/// Which tracked pose of a frame an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TransformKind {
    ProbeToReference,
    PhantomToReference,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::ProbeToReference => f.write_str("probe-to-reference"),
            TransformKind::PhantomToReference => f.write_str("phantom-to-reference"),
        }
    }
}

/// Failures of the robust linear solve.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("linear system has no rows")]
    Empty,
    #[error("linear system has {rows} rows but {rhs} right-hand-side values")]
    DimensionMismatch { rows: usize, rhs: usize },
    #[error("least-squares system is rank deficient")]
    RankDeficient,
    #[error("{inliers} inlier rows left after outlier rejection, need {needed}")]
    TooFewInliers { inliers: usize, needed: usize },
}

/// Failures that abort a calibration run.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("{found} usable frames, at least {required} required")]
    InsufficientFrames { found: usize, required: usize },
    #[error("frame {frame}: missing {kind} transform")]
    MissingTransform { frame: usize, kind: TransformKind },
    #[error("frame {frame}: {kind} transform is not a finite invertible matrix")]
    InvalidTransform { frame: usize, kind: TransformKind },
    #[error("frame {frame}: pattern {pattern} is not labeled once per wire")]
    IncompleteLabeling { frame: usize, pattern: usize },
    #[error("frame {frame}: outer wires of pattern {pattern} coincide in the image")]
    DegenerateOuterWires { frame: usize, pattern: usize },
    #[error("phantom family {0:?} has no middle-wire interpolation")]
    UnsupportedFamily(PatternKind),
    #[error("solve for matrix row {axis} failed")]
    Solve {
        axis: usize,
        #[source]
        source: SolveError,
    },
    #[error("solved in-plane axes are parallel")]
    DegenerateMatrix,
    #[error("refinement failed")]
    Refinement(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("phantom definition: {0}")]
    Phantom(#[from] PhantomError),
}
