use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::WIRES_PER_PATTERN;

/// A detected dot identified as the crossing of one phantom wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledDot {
    pub x: f64,
    pub y: f64,
    pub pattern_id: usize,
    pub wire_id: usize,
}

impl LabeledDot {
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Per-frame correspondences between wires and pixel positions.
///
/// Empty when no pattern was recognised in the frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelingResult {
    pub dots: Vec<LabeledDot>,
}

impl LabelingResult {
    pub fn new(dots: Vec<LabeledDot>) -> Self {
        Self { dots }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dots.len()
    }

    /// Wire positions of one pattern ordered by wire id.
    ///
    /// `None` unless each wire of the pattern is labeled exactly once.
    pub fn pattern_points(&self, pattern_id: usize) -> Option<[Point2<f64>; WIRES_PER_PATTERN]> {
        let mut out = [None; WIRES_PER_PATTERN];
        for dot in self.dots.iter().filter(|d| d.pattern_id == pattern_id) {
            let slot = out.get_mut(dot.wire_id)?;
            if slot.is_some() {
                return None;
            }
            *slot = Some(dot.position());
        }
        Some([out[0]?, out[1]?, out[2]?])
    }
}
