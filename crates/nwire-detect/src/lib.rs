//! Recognition of N-wire phantom patterns in a frame of detected dots.
//!
//! Two stages:
//! - [`LineFinder`] builds straight-line candidates whose dot spacing matches
//!   the phantom's wire distances.
//! - [`PatternLabeler`] picks one candidate per pattern by pairwise geometry
//!   and assigns `(pattern, wire)` identities to the member dots.
//!
//! [`NWireDetector`] ties both together behind a single `detect` call.

mod combinations;
mod detector;
mod error;
mod labeler;
mod line_finder;
mod params;
mod theta;

pub use combinations::DecreasingCombinations;
pub use detector::{DetectionResult, FrameDots, NWireDetector};
pub use error::DetectError;
pub use labeler::{Assignment, PatternLabeler};
pub use line_finder::{LineFinder, LineSearch};
pub use params::{LabelerParams, LineFinderParams, NWireDetectorParams, PixelSpacing};
pub use theta::ThetaRange;
