//! Pattern-plane geometry and the matching tolerances derived from it.

use std::f64::consts::{FRAC_PI_2, PI};

use log::warn;
use nalgebra::{Matrix4, Point2, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Pattern, PhantomDefinition, PhantomError, Wire};

const PLANE_NORMAL_EPS: f64 = 1e-9;
const PARALLEL_EPS: f64 = 1e-9;

/// Fold an angle into `[0, π/2]`, treating opposite directions as equal.
///
/// Expects input in `[-π, π]`; values outside `[-π/2, π/2]` are shifted by π
/// before taking the magnitude.
#[inline]
pub fn fold_to_half_pi(angle: f64) -> f64 {
    let folded = if angle > FRAC_PI_2 {
        angle - PI
    } else if angle < -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    };
    folded.abs()
}

/// Plane given by a point and a unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl Plane {
    /// Plane through three points; `None` if they are collinear.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        Unit::try_new(n, PLANE_NORMAL_EPS).map(|normal| Self { origin: *a, normal })
    }

    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    /// Angle between the normals folded into `[0, π/2]`.
    pub fn angle_to(&self, other: &Plane) -> f64 {
        let cos = self.normal.dot(&other.normal).clamp(-1.0, 1.0);
        fold_to_half_pi(cos.acos())
    }
}

/// Plane through a pattern's wire endpoints.
///
/// Uses the front and back of wire 0 plus the first remaining endpoint that is
/// not collinear with them. Endpoints farther than `epsilon_mm` from the plane
/// are reported as a data-quality warning.
pub fn pattern_plane(
    pattern_index: usize,
    pattern: &Pattern,
    epsilon_mm: f64,
) -> Result<Plane, PhantomError> {
    let endpoints: Vec<Point3<f64>> = pattern
        .wires
        .iter()
        .flat_map(|w| [w.end_point_front, w.end_point_back])
        .collect();

    let plane = endpoints[2..]
        .iter()
        .find_map(|c| Plane::from_points(&endpoints[0], &endpoints[1], c))
        .ok_or(PhantomError::DegeneratePlane {
            pattern: pattern_index,
        })?;

    for p in &endpoints {
        let d = plane.signed_distance(p).abs();
        if d > epsilon_mm {
            warn!(
                "pattern {pattern_index}: wire endpoint ({:.3}, {:.3}, {:.3}) is {d:.4} mm off the pattern plane",
                p.x, p.y, p.z
            );
        }
    }
    Ok(plane)
}

/// Inter-pattern tolerances used by the labeler's pairwise check.
///
/// Distances are in mm, angles in radians within `[0, π/2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternGeometry {
    pub min_line_pair_dist_mm: f64,
    pub max_line_pair_dist_mm: f64,
    pub min_line_pair_angle_rad: f64,
    pub max_line_pair_angle_rad: f64,
}

impl PatternGeometry {
    /// Derive the tolerances from the phantom's wire geometry.
    ///
    /// `distance_error_percent` widens the distance range on both sides. A
    /// phantom with a single pattern has no pairs and yields all zeros.
    pub fn compute(
        phantom: &PhantomDefinition,
        distance_error_percent: f64,
        plane_epsilon_mm: f64,
    ) -> Result<Self, PhantomError> {
        phantom.validate()?;

        let planes = phantom
            .patterns
            .iter()
            .enumerate()
            .map(|(i, p)| pattern_plane(i, p, plane_epsilon_mm))
            .collect::<Result<Vec<_>, _>>()?;

        let mut min_dist = f64::INFINITY;
        let mut max_dist = f64::NEG_INFINITY;
        let mut min_angle = f64::INFINITY;
        let mut max_angle = f64::NEG_INFINITY;

        for (i, a) in planes.iter().enumerate() {
            for b in &planes[i + 1..] {
                let dist = a.signed_distance(&b.origin).abs();
                let angle = a.angle_to(b);
                min_dist = min_dist.min(dist);
                max_dist = max_dist.max(dist);
                min_angle = min_angle.min(angle);
                max_angle = max_angle.max(angle);
            }
        }

        if planes.len() < 2 {
            return Ok(Self::default());
        }

        let tol = distance_error_percent / 100.0;
        Ok(Self {
            min_line_pair_dist_mm: min_dist * (1.0 - tol),
            max_line_pair_dist_mm: max_dist * (1.0 + tol),
            min_line_pair_angle_rad: min_angle,
            max_line_pair_angle_rad: max_angle,
        })
    }
}

/// Where a wire crosses the image plane, in image coordinates.
///
/// `phantom_to_image` maps phantom mm into image space (pixels in x/y, the
/// image plane at z = 0). The wire is treated as an infinite line; `None` when
/// it is parallel to the image plane.
pub fn wire_image_intersection(
    wire: &Wire,
    phantom_to_image: &Matrix4<f64>,
) -> Option<Point2<f64>> {
    let front = phantom_to_image.transform_point(&wire.end_point_front);
    let back = phantom_to_image.transform_point(&wire.end_point_back);
    let along = back - front;
    if along.z.abs() <= PARALLEL_EPS * along.norm() {
        return None;
    }
    let t = -front.z / along.z;
    let p = front + along * t;
    Some(Point2::new(p.x, p.y))
}
