//! Static phantom description: patterns of three wires each.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Number of wires in every pattern.
pub const WIRES_PER_PATTERN: usize = 3;

/// One straight wire, endpoints in phantom coordinates (mm).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    #[serde(default)]
    pub name: String,
    pub end_point_front: Point3<f64>,
    pub end_point_back: Point3<f64>,
}

impl Wire {
    pub fn new(end_point_front: Point3<f64>, end_point_back: Point3<f64>) -> Self {
        Self {
            name: String::new(),
            end_point_front,
            end_point_back,
        }
    }

    /// Point at fraction `t` from front (`0`) to back (`1`); not clamped.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.end_point_front + (self.end_point_back - self.end_point_front) * t
    }

    pub fn length(&self) -> f64 {
        (self.end_point_back - self.end_point_front).norm()
    }
}

/// Phantom family a pattern belongs to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Two parallel outer wires and a diagonal middle wire. Wire 1 runs from a
    /// point on wire 0 to a point on wire 2, starting at its front endpoint.
    #[default]
    NWire,
    /// Three coplanar wires labeled as left / diagonal / right lines.
    CoplanarParallelWires,
}

/// One repeating unit of the phantom.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub kind: PatternKind,
    pub wires: [Wire; WIRES_PER_PATTERN],
    /// Expected distance (mm) of each wire's intersection from wire 0's
    /// intersection, along the imaged line.
    pub distance_to_origin_mm: [f64; WIRES_PER_PATTERN],
    /// Allowed deviation (mm) for each entry of `distance_to_origin_mm`.
    pub distance_to_origin_tolerance_mm: [f64; WIRES_PER_PATTERN],
}

impl Pattern {
    /// The interpolated wire of an N-wire pattern.
    pub fn middle_wire(&self) -> Option<&Wire> {
        match self.kind {
            PatternKind::NWire => Some(&self.wires[1]),
            PatternKind::CoplanarParallelWires => None,
        }
    }
}

/// Validation failures for a phantom definition.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PhantomError {
    #[error("phantom has no patterns")]
    NoPatterns,
    #[error("pattern {pattern} is {found:?}, expected {expected:?} like the first pattern")]
    MixedFamilies {
        pattern: usize,
        expected: PatternKind,
        found: PatternKind,
    },
    #[error("pattern {pattern} wire {wire} has non-finite or coincident endpoints")]
    DegenerateWire { pattern: usize, wire: usize },
    #[error("pattern {pattern} has a non-finite distance or a negative tolerance")]
    InvalidDistances { pattern: usize },
    #[error("pattern {pattern} endpoints do not span a plane")]
    DegeneratePlane { pattern: usize },
}

/// Full phantom: an ordered list of patterns, all of one family.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhantomDefinition {
    pub patterns: Vec<Pattern>,
}

impl PhantomDefinition {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Check the structural assumptions the detectors and calibrator rely on.
    pub fn validate(&self) -> Result<(), PhantomError> {
        let first = self.patterns.first().ok_or(PhantomError::NoPatterns)?;
        for (pi, pattern) in self.patterns.iter().enumerate() {
            if pattern.kind != first.kind {
                return Err(PhantomError::MixedFamilies {
                    pattern: pi,
                    expected: first.kind,
                    found: pattern.kind,
                });
            }
            for (wi, wire) in pattern.wires.iter().enumerate() {
                let finite = wire
                    .end_point_front
                    .iter()
                    .chain(wire.end_point_back.iter())
                    .all(|v| v.is_finite());
                if !finite || wire.length() <= 1e-9 {
                    return Err(PhantomError::DegenerateWire {
                        pattern: pi,
                        wire: wi,
                    });
                }
            }
            let distances_ok = pattern.distance_to_origin_mm.iter().all(|d| d.is_finite())
                && pattern
                    .distance_to_origin_tolerance_mm
                    .iter()
                    .all(|t| t.is_finite() && *t >= 0.0);
            if !distances_ok {
                return Err(PhantomError::InvalidDistances { pattern: pi });
            }
        }
        Ok(())
    }

    /// Family shared by all patterns; `None` for an empty phantom.
    pub fn family(&self) -> Option<PatternKind> {
        self.patterns.first().map(|p| p.kind)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Total wire count, used to index per-wire statistics.
    pub fn wire_count(&self) -> usize {
        self.patterns.len() * WIRES_PER_PATTERN
    }

    /// Points per complete line: the number of wires in a pattern.
    pub fn max_points_per_line(&self) -> usize {
        WIRES_PER_PATTERN
    }
}
