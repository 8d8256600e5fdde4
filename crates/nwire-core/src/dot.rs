use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One candidate fiducial detected in an image, in pixel coordinates.
///
/// Dots of a frame live in one ordered slice; everything downstream refers to
/// them by their index in that slice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub x: f64,
    pub y: f64,
    /// Summed pixel intensity reported by the segmenter.
    pub intensity: f64,
}

impl Dot {
    pub fn new(x: f64, y: f64, intensity: f64) -> Self {
        Self { x, y, intensity }
    }

    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance_to(&self, other: &Dot) -> f64 {
        (self.position() - other.position()).norm()
    }
}
