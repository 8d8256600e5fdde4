use nwire_core::PhantomError;

/// Failures that prevent a frame from being labeled at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("pixel spacing must be finite and positive, got {0} mm/px")]
    InvalidSpacing(f64),
    #[error("phantom definition: {0}")]
    Phantom(#[from] PhantomError),
}
