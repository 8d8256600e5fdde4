//! Core types for N-wire phantom recognition and probe calibration.
//!
//! This crate is purely geometric: dots detected in an image, straight-line
//! candidates over them, the static phantom description, and the
//! inter-pattern tolerances derived from it. It has no notion of images or
//! trackers.

mod dot;
mod geometry;
mod labeling;
mod line;
mod logger;
mod phantom;
pub mod synthetic;

pub use dot::Dot;
pub use geometry::{
    fold_to_half_pi, pattern_plane, wire_image_intersection, PatternGeometry, Plane,
};
pub use labeling::{LabeledDot, LabelingResult};
pub use line::Line;
pub use phantom::{
    Pattern, PatternKind, PhantomDefinition, PhantomError, Wire, WIRES_PER_PATTERN,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
