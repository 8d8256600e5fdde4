//! Reprojection errors of a calibration on a set of prepared frames.

use std::collections::BTreeSet;

use log::warn;
use nalgebra::{Matrix4, Point2, Point3};
use nwire_core::{wire_image_intersection, PhantomDefinition, WIRES_PER_PATTERN};
use serde::Serialize;

use crate::frame::PreparedFrame;
use crate::stats::{trimmed_signed_stats, trimmed_stats, ErrorStats};

/// Middle-wire errors in probe space (mm).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Reprojection3dReport {
    pub stats: ErrorStats,
    /// One error per sample, in sample order.
    pub errors: Vec<f64>,
}

/// Signed pixel error statistics of one wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct WireAxisStats {
    pub x: ErrorStats,
    pub y: ErrorStats,
}

/// Per-wire image-space errors of every detected crossing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Reprojection2dReport {
    /// Indexed by `pattern * 3 + wire`.
    pub per_wire: Vec<WireAxisStats>,
    /// Predicted minus measured `(x, y)` for each sample and wire; `None`
    /// when the wire does not cross the image plane.
    pub errors: Vec<[Option<[f64; 2]>; WIRES_PER_PATTERN]>,
    /// RMS pixel distance over the crossings of non-outlier samples.
    pub rms: f64,
    pub rms_count: usize,
    pub invalid_count: usize,
}

/// Both error reports for one dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReprojectionErrorReport {
    pub sample_count: usize,
    pub errors_3d: Reprojection3dReport,
    pub errors_2d: Reprojection2dReport,
}

impl ReprojectionErrorReport {
    /// Compute both reports; `outliers` holds sample indices left out of the
    /// 2-D RMS.
    pub fn compute(
        image_to_probe: &Matrix4<f64>,
        frames: &[PreparedFrame],
        phantom: &PhantomDefinition,
        outliers: &BTreeSet<usize>,
        confidence: f64,
    ) -> Self {
        Self {
            sample_count: frames.iter().map(|f| f.samples.len()).sum(),
            errors_3d: reprojection_3d(image_to_probe, frames, confidence),
            errors_2d: reprojection_2d(image_to_probe, frames, phantom, outliers, confidence),
        }
    }
}

/// Distance between the calibrated middle-wire crossing and its known probe
/// position, per sample.
pub fn reprojection_3d(
    image_to_probe: &Matrix4<f64>,
    frames: &[PreparedFrame],
    confidence: f64,
) -> Reprojection3dReport {
    let errors: Vec<f64> = frames
        .iter()
        .flat_map(|f| &f.samples)
        .map(|s| {
            let image = s.middle_image();
            let mapped = image_to_probe.transform_point(&Point3::new(image.x, image.y, 0.0));
            (mapped - s.middle_probe).norm()
        })
        .collect();
    Reprojection3dReport {
        stats: trimmed_stats(&errors, confidence),
        errors,
    }
}

/// Image-space error of every wire crossing, predicted by intersecting the
/// wire with the image plane under the calibration.
pub fn reprojection_2d(
    image_to_probe: &Matrix4<f64>,
    frames: &[PreparedFrame],
    phantom: &PhantomDefinition,
    outliers: &BTreeSet<usize>,
    confidence: f64,
) -> Reprojection2dReport {
    let wire_count = phantom.wire_count();
    let mut per_wire_x: Vec<Vec<f64>> = vec![Vec::new(); wire_count];
    let mut per_wire_y: Vec<Vec<f64>> = vec![Vec::new(); wire_count];
    let mut errors = Vec::new();
    let mut sum_sq = 0.0;
    let mut rms_count = 0;
    let mut invalid_count = 0;

    let Some(probe_to_image) = image_to_probe.try_inverse() else {
        warn!("calibration matrix is not invertible; no 2-D errors");
        return Reprojection2dReport::default();
    };

    let mut sample_index = 0;
    for frame in frames {
        let phantom_to_image = probe_to_image * frame.phantom_to_probe;
        for sample in &frame.samples {
            let pattern = &phantom.patterns[sample.pattern];
            let mut sample_errors = [None; WIRES_PER_PATTERN];
            for (w, wire) in pattern.wires.iter().enumerate() {
                let Some(predicted) = wire_image_intersection(wire, &phantom_to_image) else {
                    warn!(
                        "frame {}: wire {w} of pattern {} is parallel to the image plane",
                        frame.frame, sample.pattern
                    );
                    invalid_count += 1;
                    continue;
                };
                let measured: Point2<f64> = sample.image_points[w];
                let (ex, ey) = (predicted.x - measured.x, predicted.y - measured.y);
                sample_errors[w] = Some([ex, ey]);

                let slot = sample.pattern * WIRES_PER_PATTERN + w;
                per_wire_x[slot].push(ex);
                per_wire_y[slot].push(ey);
                if !outliers.contains(&sample_index) {
                    sum_sq += ex * ex + ey * ey;
                    rms_count += 1;
                }
            }
            errors.push(sample_errors);
            sample_index += 1;
        }
    }

    let per_wire = per_wire_x
        .iter()
        .zip(&per_wire_y)
        .map(|(xs, ys)| WireAxisStats {
            x: trimmed_signed_stats(xs, confidence),
            y: trimmed_signed_stats(ys, confidence),
        })
        .collect();
    let rms = if rms_count > 0 {
        (sum_sq / rms_count as f64).sqrt()
    } else {
        0.0
    };

    Reprojection2dReport {
        per_wire,
        errors,
        rms,
        rms_count,
        invalid_count,
    }
}
