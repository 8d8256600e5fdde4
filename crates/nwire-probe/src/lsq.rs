//! Least squares with iterative outlier rejection.
//!
//! Rows are weighted 0 or 1. After each solve, inlier rows whose absolute
//! residual exceeds `mean + k * stdev` of the inlier residuals (and a small
//! absolute floor) are dropped and the system is solved again. Dropped rows
//! are never readmitted.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::stats::mean_stdev;
use crate::SolveError;

/// Relative singular-value cutoff for rank detection.
const RANK_EPS: f64 = 1e-10;

/// Outlier rejection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustSolveParams {
    /// Rejection threshold in standard deviations above the mean residual.
    /// `f64::INFINITY` disables rejection.
    pub outlier_threshold_sigma: f64,
    /// Residuals at or below this are never rejected.
    pub min_outlier_residual: f64,
    /// Upper bound on reject-and-resolve rounds.
    pub max_iterations: usize,
}

impl Default for RobustSolveParams {
    fn default() -> Self {
        Self {
            outlier_threshold_sigma: 3.0,
            min_outlier_residual: 1e-6,
            max_iterations: 10,
        }
    }
}

/// Solution of one right-hand side.
#[derive(Clone, Debug, PartialEq)]
pub struct RobustSolution {
    pub coefficients: DVector<f64>,
    /// Rejected row indices, ascending.
    pub outliers: Vec<usize>,
    /// Absolute residual of every row under the final coefficients.
    pub residuals: DVector<f64>,
    pub iterations: usize,
}

impl RobustSolution {
    /// Mean and population stdev of the inlier residuals.
    pub fn inlier_residual_stats(&self) -> (f64, f64) {
        let inliers: Vec<f64> = self
            .residuals
            .iter()
            .enumerate()
            .filter(|(i, _)| self.outliers.binary_search(i).is_err())
            .map(|(_, &r)| r)
            .collect();
        mean_stdev(&inliers)
    }
}

/// Solve `a x ≈ b`, rejecting outlier rows.
pub fn solve_robust(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    params: &RobustSolveParams,
) -> Result<RobustSolution, SolveError> {
    let rows = a.nrows();
    if rows == 0 || a.ncols() == 0 {
        return Err(SolveError::Empty);
    }
    if b.len() != rows {
        return Err(SolveError::DimensionMismatch {
            rows,
            rhs: b.len(),
        });
    }

    let mut inlier = vec![true; rows];
    let mut x = solve_masked(a, b, &inlier)?;
    let mut iterations = 0;
    let rejecting = params.outlier_threshold_sigma.is_finite();

    while rejecting && iterations < params.max_iterations {
        iterations += 1;
        let residuals = (a * &x - b).abs();
        let current: Vec<f64> = (0..rows)
            .filter(|&i| inlier[i])
            .map(|i| residuals[i])
            .collect();
        let (mean, stdev) = mean_stdev(&current);
        let threshold = (mean + params.outlier_threshold_sigma * stdev)
            .max(params.min_outlier_residual);

        let mut rejected = 0;
        for (i, keep) in inlier.iter_mut().enumerate() {
            if *keep && residuals[i] > threshold {
                *keep = false;
                rejected += 1;
            }
        }
        if rejected == 0 {
            break;
        }

        let remaining = inlier.iter().filter(|&&k| k).count();
        debug!("rejected {rejected} rows (threshold {threshold:.4}), {remaining} left");
        if remaining < a.ncols() {
            return Err(SolveError::TooFewInliers {
                inliers: remaining,
                needed: a.ncols(),
            });
        }
        x = solve_masked(a, b, &inlier)?;
    }

    let residuals = (a * &x - b).abs();
    let outliers = (0..rows).filter(|&i| !inlier[i]).collect();
    Ok(RobustSolution {
        coefficients: x,
        outliers,
        residuals,
        iterations,
    })
}

/// Ordinary least squares over the rows where `mask` is set.
fn solve_masked(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    mask: &[bool],
) -> Result<DVector<f64>, SolveError> {
    let rows: Vec<usize> = (0..a.nrows()).filter(|&i| mask[i]).collect();
    if rows.len() < a.ncols() {
        return Err(SolveError::TooFewInliers {
            inliers: rows.len(),
            needed: a.ncols(),
        });
    }
    let sub_a = DMatrix::from_fn(rows.len(), a.ncols(), |r, c| a[(rows[r], c)]);
    let sub_b = DVector::from_fn(rows.len(), |r, _| b[rows[r]]);

    let svd = sub_a.svd(true, true);
    let eps = RANK_EPS * svd.singular_values.max();
    if svd.rank(eps) < a.ncols() {
        return Err(SolveError::RankDeficient);
    }
    svd.solve(&sub_b, eps).map_err(|_| SolveError::RankDeficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Rows `[x, y, 1]` over a small grid with `b = 2x - 3y + 5`.
    fn plane_system() -> (DMatrix<f64>, DVector<f64>) {
        let pts: Vec<(f64, f64)> = (0..6)
            .flat_map(|i| (0..5).map(move |j| (i as f64 * 7.0, j as f64 * 3.0 + i as f64)))
            .collect();
        let a = DMatrix::from_fn(pts.len(), 3, |r, c| match c {
            0 => pts[r].0,
            1 => pts[r].1,
            _ => 1.0,
        });
        let b = DVector::from_fn(pts.len(), |r, _| 2.0 * pts[r].0 - 3.0 * pts[r].1 + 5.0);
        (a, b)
    }

    #[test]
    fn exact_system_has_no_outliers() {
        let (a, b) = plane_system();
        let sol = solve_robust(&a, &b, &RobustSolveParams::default()).expect("solve");
        assert!(sol.outliers.is_empty());
        assert_relative_eq!(sol.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(sol.coefficients[1], -3.0, epsilon = 1e-9);
        assert_relative_eq!(sol.coefficients[2], 5.0, epsilon = 1e-9);
        assert_eq!(sol.iterations, 1);
    }

    #[test]
    fn gross_outlier_is_rejected() {
        let (a, mut b) = plane_system();
        b[7] += 80.0;
        let sol = solve_robust(&a, &b, &RobustSolveParams::default()).expect("solve");
        assert_eq!(sol.outliers, vec![7]);
        assert_relative_eq!(sol.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(sol.coefficients[2], 5.0, epsilon = 1e-9);
        let (mean, _) = sol.inlier_residual_stats();
        assert!(mean < 1e-9);

        let naive = RobustSolveParams {
            outlier_threshold_sigma: f64::INFINITY,
            ..RobustSolveParams::default()
        };
        let biased = solve_robust(&a, &b, &naive).expect("solve");
        assert!(biased.outliers.is_empty());
        assert!((biased.coefficients[2] - 5.0).abs() > 0.1);
    }

    #[test]
    fn infinite_sigma_keeps_rows_with_identical_residuals() {
        // every row misses the fit by exactly 1, so the inlier stdev is 0
        let a = DMatrix::from_element(4, 1, 1.0);
        let b = DVector::from_row_slice(&[0.0, 0.0, 2.0, 2.0]);
        let off = RobustSolveParams {
            outlier_threshold_sigma: f64::INFINITY,
            ..RobustSolveParams::default()
        };
        let sol = solve_robust(&a, &b, &off).expect("solve");
        assert!(sol.outliers.is_empty());
        assert_eq!(sol.iterations, 0);
        assert_relative_eq!(sol.coefficients[0], 1.0, epsilon = 1e-12);

        let sol = solve_robust(&a, &b, &RobustSolveParams::default()).expect("solve");
        assert!(sol.outliers.is_empty());
    }

    #[test]
    fn rank_deficient_system_fails() {
        let a = DMatrix::from_row_slice(4, 3, &[
            1.0, 2.0, 1.0, //
            2.0, 4.0, 1.0, //
            3.0, 6.0, 1.0, //
            4.0, 8.0, 1.0,
        ]);
        let b = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            solve_robust(&a, &b, &RobustSolveParams::default()),
            Err(SolveError::RankDeficient)
        );
    }

    #[test]
    fn validates_dimensions() {
        let a = DMatrix::<f64>::zeros(0, 3);
        let b = DVector::<f64>::zeros(0);
        assert_eq!(
            solve_robust(&a, &b, &RobustSolveParams::default()),
            Err(SolveError::Empty)
        );
        let a = DMatrix::<f64>::identity(3, 3);
        let b = DVector::<f64>::zeros(2);
        assert_eq!(
            solve_robust(&a, &b, &RobustSolveParams::default()),
            Err(SolveError::DimensionMismatch { rows: 3, rhs: 2 })
        );
    }
}
