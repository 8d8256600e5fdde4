//! Tracked frames and their conversion into calibration samples.

use nalgebra::{Matrix4, Point2, Point3};
use nwire_core::{LabelingResult, PhantomDefinition, WIRES_PER_PATTERN};
use serde::{Deserialize, Serialize};

use crate::{CalibrationError, TransformKind};

const MIN_OUTER_SPAN_PX: f64 = 1e-9;

/// One frame's labeling together with its tracked poses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedFrame {
    pub labeling: LabelingResult,
    pub probe_to_reference: Option<Matrix4<f64>>,
    pub phantom_to_reference: Option<Matrix4<f64>>,
}

impl TrackedFrame {
    pub fn new(
        labeling: LabelingResult,
        probe_to_reference: Matrix4<f64>,
        phantom_to_reference: Matrix4<f64>,
    ) -> Self {
        Self {
            labeling,
            probe_to_reference: Some(probe_to_reference),
            phantom_to_reference: Some(phantom_to_reference),
        }
    }
}

/// One pattern seen in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternSample {
    /// Index of the frame in the caller's input slice.
    pub frame: usize,
    pub pattern: usize,
    /// Detected crossings in wire order, in pixels.
    pub image_points: [Point2<f64>; WIRES_PER_PATTERN],
    /// Position of the middle crossing between the outer two.
    pub alpha: f64,
    /// Middle-wire crossing in phantom coordinates (mm).
    pub middle_phantom: Point3<f64>,
    /// Middle-wire crossing in probe coordinates (mm).
    pub middle_probe: Point3<f64>,
}

impl PatternSample {
    /// Detected middle-wire crossing, in pixels.
    #[inline]
    pub fn middle_image(&self) -> Point2<f64> {
        self.image_points[1]
    }
}

/// Frame converted into per-pattern samples.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedFrame {
    pub frame: usize,
    pub phantom_to_probe: Matrix4<f64>,
    pub samples: Vec<PatternSample>,
}

/// Turn a tracked frame into calibration samples.
///
/// `Ok(None)` for a frame without any labeled dots. A frame that is labeled
/// but cannot be used fails the whole call.
pub fn prepare_frame(
    index: usize,
    frame: &TrackedFrame,
    phantom: &PhantomDefinition,
) -> Result<Option<PreparedFrame>, CalibrationError> {
    if frame.labeling.is_empty() {
        return Ok(None);
    }

    let probe_to_reference =
        checked_transform(index, frame.probe_to_reference, TransformKind::ProbeToReference)?;
    let phantom_to_reference = checked_transform(
        index,
        frame.phantom_to_reference,
        TransformKind::PhantomToReference,
    )?;
    let reference_to_probe =
        probe_to_reference
            .try_inverse()
            .ok_or(CalibrationError::InvalidTransform {
                frame: index,
                kind: TransformKind::ProbeToReference,
            })?;
    let phantom_to_probe = reference_to_probe * phantom_to_reference;

    let mut samples = Vec::with_capacity(phantom.pattern_count());
    for (pattern_id, pattern) in phantom.patterns.iter().enumerate() {
        let points = frame.labeling.pattern_points(pattern_id).ok_or(
            CalibrationError::IncompleteLabeling {
                frame: index,
                pattern: pattern_id,
            },
        )?;
        let outer_span = (points[2] - points[0]).norm();
        if outer_span <= MIN_OUTER_SPAN_PX {
            return Err(CalibrationError::DegenerateOuterWires {
                frame: index,
                pattern: pattern_id,
            });
        }
        let alpha = (points[1] - points[0]).norm() / outer_span;
        let middle_phantom = pattern.wires[1].point_at(alpha);
        samples.push(PatternSample {
            frame: index,
            pattern: pattern_id,
            image_points: points,
            alpha,
            middle_phantom,
            middle_probe: phantom_to_probe.transform_point(&middle_phantom),
        });
    }

    Ok(Some(PreparedFrame {
        frame: index,
        phantom_to_probe,
        samples,
    }))
}

/// Prepare every frame, skipping the ones without labels.
pub fn prepare_frames(
    frames: &[TrackedFrame],
    phantom: &PhantomDefinition,
) -> Result<Vec<PreparedFrame>, CalibrationError> {
    let mut prepared = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        if let Some(p) = prepare_frame(i, frame, phantom)? {
            prepared.push(p);
        }
    }
    Ok(prepared)
}

fn checked_transform(
    frame: usize,
    transform: Option<Matrix4<f64>>,
    kind: TransformKind,
) -> Result<Matrix4<f64>, CalibrationError> {
    let m = transform.ok_or(CalibrationError::MissingTransform { frame, kind })?;
    if m.iter().all(|v| v.is_finite()) && m.is_invertible() {
        Ok(m)
    } else {
        Err(CalibrationError::InvalidTransform { frame, kind })
    }
}
