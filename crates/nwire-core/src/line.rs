//! Straight-line candidates built from dot indices.
//!
//! A [`Line`] never copies dot coordinates: it stores indices into the frame's
//! dot slice and a few attributes derived from them at construction time.

use std::cmp::Ordering;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::Dot;

const MIN_LINE_LENGTH: f64 = 1e-9;

/// Collinear dot set with derived start/end, length, intensity and direction.
///
/// Invariants: `points` is strictly increasing, and both endpoints are members
/// of `points`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    points: Vec<usize>,
    start_point_index: usize,
    end_point_index: usize,
    length: f64,
    intensity: f64,
    direction: Vector2<f64>,
}

impl Line {
    /// Build a line from dot indices.
    ///
    /// Indices are sorted and deduplicated. Returns `None` for fewer than two
    /// distinct points, an index outside `dots`, or coincident endpoints.
    pub fn fit(mut points: Vec<usize>, dots: &[Dot]) -> Option<Self> {
        points.sort_unstable();
        points.dedup();
        if points.len() < 2 || points.iter().any(|&i| i >= dots.len()) {
            return None;
        }

        let (start, end) = extreme_points(&points, dots);
        let chord = dots[end].position() - dots[start].position();
        let length = chord.norm();
        if length <= MIN_LINE_LENGTH {
            return None;
        }

        let direction = if points.len() == 2 {
            chord / length
        } else {
            let axis = principal_axis(&points, dots);
            if axis.dot(&chord) < 0.0 {
                -axis
            } else {
                axis
            }
        };

        let intensity = points.iter().map(|&i| dots[i].intensity).sum();

        Some(Self {
            points,
            start_point_index: start,
            end_point_index: end,
            length,
            intensity,
            direction,
        })
    }

    /// Line with one more point, refitted from scratch.
    pub fn with_point(&self, index: usize, dots: &[Dot]) -> Option<Self> {
        let mut points = self.points.clone();
        points.push(index);
        Self::fit(points, dots)
    }

    /// Sorted member indices.
    #[inline]
    pub fn points(&self) -> &[usize] {
        &self.points
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn start_point_index(&self) -> usize {
        self.start_point_index
    }

    #[inline]
    pub fn end_point_index(&self) -> usize {
        self.end_point_index
    }

    /// Pixel distance between start and end.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Sum of member intensities.
    #[inline]
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Unit direction, oriented from start towards end.
    #[inline]
    pub fn direction(&self) -> Vector2<f64> {
        self.direction
    }

    /// Orientation of [`Line::direction`] in `(-π, π]`.
    #[inline]
    pub fn orientation(&self) -> f64 {
        self.direction.y.atan2(self.direction.x)
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.points.binary_search(&index).is_ok()
    }

    pub fn start(&self, dots: &[Dot]) -> Point2<f64> {
        dots[self.start_point_index].position()
    }

    pub fn end(&self, dots: &[Dot]) -> Point2<f64> {
        dots[self.end_point_index].position()
    }

    /// Midpoint between start and end.
    pub fn midpoint(&self, dots: &[Dot]) -> Point2<f64> {
        nalgebra::center(&self.start(dots), &self.end(dots))
    }

    /// Perpendicular distance from `p` to the infinite line.
    pub fn distance_to_point(&self, dots: &[Dot], p: &Point2<f64>) -> f64 {
        let v = p - self.start(dots);
        (self.direction.x * v.y - self.direction.y * v.x).abs()
    }

    /// Signed position of `p` along the direction, measured from start.
    pub fn projection(&self, dots: &[Dot], p: &Point2<f64>) -> f64 {
        (p - self.start(dots)).dot(&self.direction)
    }

    /// True when both lines have a common start or end dot.
    pub fn shares_endpoint(&self, other: &Line) -> bool {
        let ours = [self.start_point_index, self.end_point_index];
        ours.contains(&other.start_point_index) || ours.contains(&other.end_point_index)
    }

    /// Order on the sorted point sets; equal iff the lines are duplicates.
    #[inline]
    pub fn cmp_points(&self, other: &Line) -> Ordering {
        self.points.cmp(&other.points)
    }
}

/// Endpoints as the mutually-farthest pair reached by alternating searches.
fn extreme_points(points: &[usize], dots: &[Dot]) -> (usize, usize) {
    let farthest_from = |from: usize| {
        let origin = &dots[from];
        let mut best = points[0];
        let mut best_dist = f64::NEG_INFINITY;
        for &i in points {
            let d = origin.distance_to(&dots[i]);
            if d > best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    };

    let mut start = points[0];
    let mut end = farthest_from(start);
    for _ in 0..points.len() {
        let next_start = farthest_from(end);
        let next_end = farthest_from(next_start);
        if next_start == start && next_end == end {
            break;
        }
        start = next_start;
        end = next_end;
    }
    (start, end)
}

/// Orthogonal-regression direction: major axis of the point covariance.
fn principal_axis(points: &[usize], dots: &[Dot]) -> Vector2<f64> {
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &i| (sx + dots[i].x, sy + dots[i].y));
    let (cx, cy) = (sx / n, sy / n);

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for &i in points {
        let dx = dots[i].x - cx;
        let dy = dots[i].y - cy;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Vector2::new(theta.cos(), theta.sin())
}
