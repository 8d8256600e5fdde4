//! Image-to-probe calibration from labeled, tracked frames.
//!
//! Each frame-pattern pair gives one correspondence: the detected middle-wire
//! crossing `(x, y)` in pixels and its probe-space position, interpolated
//! along the middle wire. Rows 0..2 of the image-to-probe matrix are solved
//! independently as `[x, y, 1] · (m_r0, m_r1, m_r3) = p_r`. The image z axis
//! is not observed, so column 2 is completed from the in-plane axes.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector, Matrix4, Point2, Point3, RowVector4, Vector3};
use nwire_core::{PatternKind, PhantomDefinition};
use serde::{Deserialize, Serialize, Serializer};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::frame::{prepare_frames, PatternSample, PreparedFrame, TrackedFrame};
use crate::lsq::{solve_robust, RobustSolveParams, RobustSolution};
use crate::reprojection::ReprojectionErrorReport;
use crate::CalibrationError;

/// Calibration settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Fraction of smallest errors kept in the error statistics.
    pub confidence_level: f64,
    /// Minimum number of labeled calibration frames.
    pub min_frames: usize,
    /// Hand the linear solution to the attached [`CalibrationRefiner`].
    pub refine: bool,
    /// Allowed deviation of the in-plane axes from perpendicular (degrees).
    pub max_column_angle_deviation_deg: f64,
    pub robust: RobustSolveParams,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_frames: 10,
            refine: false,
            max_column_angle_deviation_deg: 1.0,
            robust: RobustSolveParams::default(),
        }
    }
}

/// Middle-wire correspondence that survived outlier rejection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InlierSample {
    pub image: Point2<f64>,
    pub probe: Point3<f64>,
}

/// Iterative refinement of the linear calibration.
pub trait CalibrationRefiner {
    fn refine(
        &self,
        seed: &Matrix4<f64>,
        inliers: &[InlierSample],
    ) -> Result<Matrix4<f64>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Residual summary of one solved matrix row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AxisSolveSummary {
    pub outlier_count: usize,
    pub iterations: usize,
    pub residual_mean: f64,
    pub residual_stdev: f64,
}

impl From<&RobustSolution> for AxisSolveSummary {
    fn from(sol: &RobustSolution) -> Self {
        let (residual_mean, residual_stdev) = sol.inlier_residual_stats();
        Self {
            outlier_count: sol.outliers.len(),
            iterations: sol.iterations,
            residual_mean,
            residual_stdev,
        }
    }
}

/// Calibration matrix with its quality report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationResult {
    /// Maps image pixels (z = 0) into probe coordinates.
    #[serde(serialize_with = "serialize_row_major")]
    pub image_to_probe: Matrix4<f64>,
    /// Rejected sample indices, ascending; union over the three rows.
    pub outliers: Vec<usize>,
    /// `(frame, pattern)` of each calibration sample, by sample index.
    pub sample_sources: Vec<(usize, usize)>,
    pub axis_summaries: [AxisSolveSummary; 3],
    /// Angle between the first two columns (degrees).
    pub column_angle_deg: f64,
    pub frames_used: usize,
    pub refined: bool,
    pub validation: ReprojectionErrorReport,
    pub calibration: ReprojectionErrorReport,
}

impl CalibrationResult {
    /// Calibration frames with at least one rejected sample, ascending.
    pub fn outlier_frames(&self) -> Vec<usize> {
        let frames: BTreeSet<usize> = self
            .outliers
            .iter()
            .filter_map(|&i| self.sample_sources.get(i).map(|&(frame, _)| frame))
            .collect();
        frames.into_iter().collect()
    }
}

fn serialize_row_major<S: Serializer>(m: &Matrix4<f64>, s: S) -> Result<S::Ok, S::Error> {
    let rows: [[f64; 4]; 4] = std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]));
    rows.serialize(s)
}

/// Solves the image-to-probe transform for one phantom.
pub struct ProbeCalibrator {
    phantom: PhantomDefinition,
    options: CalibrationOptions,
    refiner: Option<Box<dyn CalibrationRefiner + Send + Sync>>,
}

impl ProbeCalibrator {
    pub fn new(
        phantom: PhantomDefinition,
        options: CalibrationOptions,
    ) -> Result<Self, CalibrationError> {
        phantom.validate()?;
        match phantom.family() {
            Some(PatternKind::NWire) => {}
            Some(other) => return Err(CalibrationError::UnsupportedFamily(other)),
            None => return Err(nwire_core::PhantomError::NoPatterns.into()),
        }
        Ok(Self {
            phantom,
            options,
            refiner: None,
        })
    }

    pub fn with_refiner<R>(mut self, refiner: R) -> Self
    where
        R: CalibrationRefiner + Send + Sync + 'static,
    {
        self.refiner = Some(Box::new(refiner));
        self
    }

    pub fn options(&self) -> &CalibrationOptions {
        &self.options
    }

    pub fn phantom(&self) -> &PhantomDefinition {
        &self.phantom
    }

    /// Solve from `calibration` frames and report errors on both sets.
    ///
    /// Frames with an empty labeling are skipped. Any other unusable frame
    /// aborts the run.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, validation, calibration),
            fields(validation = validation.len(), calibration = calibration.len())
        )
    )]
    pub fn calibrate(
        &self,
        validation: &[TrackedFrame],
        calibration: &[TrackedFrame],
    ) -> Result<CalibrationResult, CalibrationError> {
        let calib_frames = prepare_frames(calibration, &self.phantom)?;
        if calib_frames.len() < self.options.min_frames {
            return Err(CalibrationError::InsufficientFrames {
                found: calib_frames.len(),
                required: self.options.min_frames,
            });
        }
        let valid_frames = prepare_frames(validation, &self.phantom)?;

        let samples: Vec<&PatternSample> =
            calib_frames.iter().flat_map(|f| &f.samples).collect();
        let sample_sources = samples.iter().map(|s| (s.frame, s.pattern)).collect();
        debug!(
            "{} calibration samples from {} frames",
            samples.len(),
            calib_frames.len()
        );

        let a = DMatrix::from_fn(samples.len(), 3, |r, c| {
            let p = samples[r].middle_image();
            match c {
                0 => p.x,
                1 => p.y,
                _ => 1.0,
            }
        });

        let mut matrix = Matrix4::identity();
        let mut outliers = BTreeSet::new();
        let mut axis_summaries = [AxisSolveSummary::default(); 3];
        for axis in 0..3 {
            let b = DVector::from_fn(samples.len(), |r, _| samples[r].middle_probe[axis]);
            let sol = solve_robust(&a, &b, &self.options.robust)
                .map_err(|source| CalibrationError::Solve { axis, source })?;
            matrix[(axis, 0)] = sol.coefficients[0];
            matrix[(axis, 1)] = sol.coefficients[1];
            matrix[(axis, 3)] = sol.coefficients[2];
            outliers.extend(sol.outliers.iter().copied());
            axis_summaries[axis] = AxisSolveSummary::from(&sol);
        }
        complete_third_column(&mut matrix)?;

        let mut refined = false;
        if self.options.refine {
            match &self.refiner {
                Some(refiner) => {
                    let inliers: Vec<InlierSample> = samples
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !outliers.contains(i))
                        .map(|(_, s)| InlierSample {
                            image: s.middle_image(),
                            probe: s.middle_probe,
                        })
                        .collect();
                    matrix = refiner
                        .refine(&matrix, &inliers)
                        .map_err(CalibrationError::Refinement)?;
                    refined = true;
                }
                None => warn!("refinement requested but no refiner is attached"),
            }
        }
        matrix
            .fixed_view_mut::<1, 4>(3, 0)
            .copy_from(&RowVector4::new(0.0, 0.0, 0.0, 1.0));

        let column_angle_deg = column_angle_deg(&matrix);
        if (column_angle_deg - 90.0).abs() > self.options.max_column_angle_deviation_deg {
            warn!(
                "image axes are {column_angle_deg:.3} deg apart in probe space; matrix kept as solved"
            );
        }

        let confidence = self.options.confidence_level;
        let calibration_report = ReprojectionErrorReport::compute(
            &matrix,
            &calib_frames,
            &self.phantom,
            &outliers,
            confidence,
        );
        let validation_report = ReprojectionErrorReport::compute(
            &matrix,
            &valid_frames,
            &self.phantom,
            &BTreeSet::new(),
            confidence,
        );
        info!(
            "calibrated from {} frames, {} outlier samples; 3-D error {:.4} mm (validation {:.4} mm), 2-D rms {:.4} px",
            calib_frames.len(),
            outliers.len(),
            calibration_report.errors_3d.stats.mean,
            validation_report.errors_3d.stats.mean,
            calibration_report.errors_2d.rms,
        );

        Ok(CalibrationResult {
            image_to_probe: matrix,
            outliers: outliers.into_iter().collect(),
            sample_sources,
            axis_summaries,
            column_angle_deg,
            frames_used: calib_frames.len(),
            refined,
            validation: validation_report,
            calibration: calibration_report,
        })
    }

    /// Preprocessed frames, for callers that want the samples themselves.
    pub fn prepare(&self, frames: &[TrackedFrame]) -> Result<Vec<PreparedFrame>, CalibrationError> {
        prepare_frames(frames, &self.phantom)
    }
}

/// Set column 2 perpendicular to columns 0 and 1 with their mean length.
fn complete_third_column(m: &mut Matrix4<f64>) -> Result<(), CalibrationError> {
    let c0: Vector3<f64> = m.fixed_view::<3, 1>(0, 0).into_owned();
    let c1: Vector3<f64> = m.fixed_view::<3, 1>(0, 1).into_owned();
    let normal = c0
        .cross(&c1)
        .try_normalize(1e-12)
        .ok_or(CalibrationError::DegenerateMatrix)?;
    let c2 = normal * (0.5 * (c0.norm() + c1.norm()));
    m.fixed_view_mut::<3, 1>(0, 2).copy_from(&c2);
    Ok(())
}

fn column_angle_deg(m: &Matrix4<f64>) -> f64 {
    let c0: Vector3<f64> = m.fixed_view::<3, 1>(0, 0).into_owned();
    let c1: Vector3<f64> = m.fixed_view::<3, 1>(0, 1).into_owned();
    let cos = c0.normalize().dot(&c1.normalize()).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn third_column_completes_a_scaled_rotation() {
        let rot = nalgebra::Rotation3::from_euler_angles(0.2, -0.4, 1.1);
        let mut expected = Matrix4::identity();
        expected
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rot.matrix() * 0.25));
        let mut m = expected;
        m.fixed_view_mut::<3, 1>(0, 2).fill(0.0);
        complete_third_column(&mut m).expect("complete");
        assert_relative_eq!(m, expected, epsilon = 1e-12);
        assert_relative_eq!(column_angle_deg(&m), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn parallel_columns_are_degenerate() {
        let mut m = Matrix4::identity();
        m[(0, 1)] = 1.0;
        m[(1, 1)] = 0.0;
        assert!(matches!(
            complete_third_column(&mut m),
            Err(CalibrationError::DegenerateMatrix)
        ));
    }

    #[test]
    fn result_serializes_rows_in_order() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 7.0;
        let result = CalibrationResult {
            image_to_probe: m,
            outliers: vec![4],
            sample_sources: vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)],
            axis_summaries: [AxisSolveSummary::default(); 3],
            column_angle_deg: 90.0,
            frames_used: 2,
            refined: false,
            validation: ReprojectionErrorReport::default(),
            calibration: ReprojectionErrorReport::default(),
        };
        let json = serde_json::to_value(&result).expect("json");
        assert_eq!(json["image_to_probe"][0][3], 7.0);
        assert_eq!(json["image_to_probe"][3][3], 1.0);
        assert_eq!(result.outlier_frames(), vec![1]);
    }
}
