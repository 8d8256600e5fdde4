//! Assignment of candidate lines to phantom patterns.
//!
//! The search walks line tuples in [`DecreasingCombinations`] order and stops
//! at the first tuple whose every pair passes the geometric check and whose
//! lines can be put into pattern slots. The first match wins; there is no
//! scoring between matching tuples.

use std::cmp::Ordering;

use log::debug;
use nwire_core::{
    Dot, LabeledDot, LabelingResult, Line, PatternGeometry, PatternKind, PhantomDefinition,
    PhantomError, WIRES_PER_PATTERN,
};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::combinations::DecreasingCombinations;
use crate::params::{LabelerParams, PixelSpacing};

/// Slack on distance and shift bounds, in pixels.
const BOUND_EPS_PX: f64 = 1e-9;

/// Chosen line for each pattern slot, as indices into the candidate slice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub lines: Vec<usize>,
}

/// Matches line tuples against the phantom's inter-pattern geometry.
#[derive(Clone, Debug)]
pub struct PatternLabeler {
    family: PatternKind,
    pattern_count: usize,
    geometry: PatternGeometry,
    params: LabelerParams,
}

impl PatternLabeler {
    /// Labeler for `phantom`, deriving the pattern geometry from its wires.
    pub fn new(phantom: &PhantomDefinition, params: LabelerParams) -> Result<Self, PhantomError> {
        let geometry = PatternGeometry::compute(
            phantom,
            params.max_line_pair_distance_error_percent,
            params.plane_epsilon_mm,
        )?;
        let family = phantom.family().ok_or(PhantomError::NoPatterns)?;
        Ok(Self::with_geometry(
            family,
            phantom.pattern_count(),
            geometry,
            params,
        ))
    }

    /// Labeler with precomputed geometry.
    pub fn with_geometry(
        family: PatternKind,
        pattern_count: usize,
        geometry: PatternGeometry,
        params: LabelerParams,
    ) -> Self {
        Self {
            family,
            pattern_count,
            geometry,
            params,
        }
    }

    pub fn geometry(&self) -> &PatternGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &LabelerParams {
        &self.params
    }

    pub fn family(&self) -> PatternKind {
        self.family
    }

    /// First line tuple that fits the phantom, in pattern-slot order.
    ///
    /// Only lines with one point per wire take part.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, dots, lines), fields(lines = lines.len()))
    )]
    pub fn find_assignment(
        &self,
        dots: &[Dot],
        lines: &[Line],
        spacing: PixelSpacing,
    ) -> Option<Assignment> {
        let complete: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.point_count() == WIRES_PER_PATTERN)
            .map(|(i, _)| i)
            .collect();
        if self.pattern_count == 0 || complete.len() < self.pattern_count {
            debug!(
                "{} complete lines, {} patterns: nothing to match",
                complete.len(),
                self.pattern_count
            );
            return None;
        }

        for combo in DecreasingCombinations::new(complete.len(), self.pattern_count) {
            let chosen: Vec<&Line> = combo.iter().map(|&c| &lines[complete[c]]).collect();
            if !self.pairs_consistent(&chosen, dots, spacing) {
                continue;
            }
            let Some(slots) = self.resolve(&chosen, dots) else {
                continue;
            };
            let lines = slots.into_iter().map(|s| complete[combo[s]]).collect();
            return Some(Assignment { lines });
        }
        None
    }

    /// Labeled dots for an assignment, wire 0 being the rightmost dot.
    pub fn labeling_for(
        &self,
        dots: &[Dot],
        lines: &[Line],
        assignment: &Assignment,
    ) -> LabelingResult {
        let mut labeled = Vec::with_capacity(assignment.lines.len() * WIRES_PER_PATTERN);
        for (pattern_id, &line_idx) in assignment.lines.iter().enumerate() {
            let mut points = lines[line_idx].points().to_vec();
            points.sort_by(|&a, &b| right_to_left(dots, a, b));
            for (wire_id, &i) in points.iter().enumerate() {
                labeled.push(LabeledDot {
                    x: dots[i].x,
                    y: dots[i].y,
                    pattern_id,
                    wire_id,
                });
            }
        }
        LabelingResult::new(labeled)
    }

    /// Search and label in one step; empty when nothing matches.
    pub fn label(&self, dots: &[Dot], lines: &[Line], spacing: PixelSpacing) -> LabelingResult {
        self.find_assignment(dots, lines, spacing)
            .map(|a| self.labeling_for(dots, lines, &a))
            .unwrap_or_default()
    }

    fn pairs_consistent(&self, chosen: &[&Line], dots: &[Dot], spacing: PixelSpacing) -> bool {
        chosen.iter().enumerate().all(|(i, a)| {
            chosen[i + 1..]
                .iter()
                .all(|b| self.line_pair_consistent(a, b, dots, spacing))
        })
    }

    fn line_pair_consistent(&self, a: &Line, b: &Line, dots: &[Dot], spacing: PixelSpacing) -> bool {
        let tol = self.params.angle_tolerance_rad;
        let angle = a.direction().dot(&b.direction()).abs().min(1.0).acos();

        if angle < tol {
            let distance = a.distance_to_point(dots, &b.midpoint(dots));
            let min = spacing.to_pixels(self.geometry.min_line_pair_dist_mm);
            let max = spacing.to_pixels(self.geometry.max_line_pair_dist_mm);
            if distance < min - BOUND_EPS_PX || distance > max + BOUND_EPS_PX {
                return false;
            }
            let shift = (b.midpoint(dots) - a.midpoint(dots))
                .dot(&a.direction())
                .abs();
            shift <= spacing.to_pixels(self.params.max_line_shift_mm) + BOUND_EPS_PX
        } else if a.shares_endpoint(b) {
            (angle - self.params.inclined_line_angle_rad).abs() <= tol
        } else {
            angle >= self.geometry.min_line_pair_angle_rad - tol
                && angle <= self.geometry.max_line_pair_angle_rad + tol
        }
    }

    /// Pattern slot order over `chosen`, or `None` if the family rule fails.
    fn resolve(&self, chosen: &[&Line], dots: &[Dot]) -> Option<Vec<usize>> {
        match self.family {
            PatternKind::NWire => {
                // slot by image row only; asymmetric spacing can mis-map lines
                let mut slots: Vec<usize> = (0..chosen.len()).collect();
                slots.sort_by(|&a, &b| {
                    chosen[a]
                        .midpoint(dots)
                        .y
                        .total_cmp(&chosen[b].midpoint(dots).y)
                });
                Some(slots)
            }
            PatternKind::CoplanarParallelWires => resolve_coplanar(chosen, dots),
        }
    }
}

/// `[left, diagonal, right]`: the two lines without a common endpoint are the
/// sides, ordered by start x; the remaining one is the diagonal.
fn resolve_coplanar(chosen: &[&Line], dots: &[Dot]) -> Option<Vec<usize>> {
    if chosen.len() != 3 {
        return None;
    }
    let mut disjoint = [(0usize, 1usize), (0, 2), (1, 2)]
        .into_iter()
        .filter(|&(i, j)| !chosen[i].shares_endpoint(chosen[j]));
    let (i, j) = disjoint.next()?;
    if disjoint.next().is_some() {
        return None;
    }
    let diagonal = 3 - i - j;
    let (left, right) = if chosen[i].start(dots).x <= chosen[j].start(dots).x {
        (i, j)
    } else {
        (j, i)
    };
    Some(vec![left, diagonal, right])
}

/// Descending x, then ascending y, then index.
fn right_to_left(dots: &[Dot], a: usize, b: usize) -> Ordering {
    dots[b]
        .x
        .total_cmp(&dots[a].x)
        .then_with(|| dots[a].y.total_cmp(&dots[b].y))
        .then_with(|| a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spacing() -> PixelSpacing {
        PixelSpacing::new(1.0).expect("spacing")
    }

    fn row(y: f64, x0: f64) -> [Dot; 3] {
        [
            Dot::new(x0, y, 1.0),
            Dot::new(x0 + 10.0, y, 1.0),
            Dot::new(x0 + 20.0, y, 1.0),
        ]
    }

    fn parallel_geometry() -> PatternGeometry {
        PatternGeometry {
            min_line_pair_dist_mm: 10.0,
            max_line_pair_dist_mm: 20.0,
            min_line_pair_angle_rad: 0.0,
            max_line_pair_angle_rad: 0.0,
        }
    }

    fn two_rows(y0: f64, y1: f64, x1: f64) -> (Vec<Dot>, Vec<Line>) {
        let mut dots = row(y0, 0.0).to_vec();
        dots.extend(row(y1, x1));
        let lines = vec![
            Line::fit(vec![0, 1, 2], &dots).expect("a"),
            Line::fit(vec![3, 4, 5], &dots).expect("b"),
        ];
        (dots, lines)
    }

    fn nwire_labeler(count: usize) -> PatternLabeler {
        PatternLabeler::with_geometry(
            PatternKind::NWire,
            count,
            parallel_geometry(),
            LabelerParams::default(),
        )
    }

    #[test]
    fn distance_bounds_are_inclusive() {
        let labeler = nwire_labeler(2);
        for (y1, expected) in [(10.0, true), (9.0, false), (20.0, true), (20.5, false)] {
            let (dots, lines) = two_rows(0.0, y1, 0.0);
            assert_eq!(
                labeler.find_assignment(&dots, &lines, spacing()).is_some(),
                expected,
                "row distance {y1}"
            );
        }
    }

    #[test]
    fn distance_bounds_scale_with_spacing() {
        let labeler = nwire_labeler(2);
        // 10 mm at 0.5 mm/px is 20 px
        let (dots, lines) = two_rows(0.0, 15.0, 0.0);
        let half = PixelSpacing::new(0.5).expect("spacing");
        assert!(labeler.find_assignment(&dots, &lines, half).is_none());
        let (dots, lines) = two_rows(0.0, 30.0, 0.0);
        assert!(labeler.find_assignment(&dots, &lines, half).is_some());
    }

    #[test]
    fn large_shift_along_the_line_is_rejected() {
        let labeler = nwire_labeler(2);
        let (dots, lines) = two_rows(0.0, 15.0, 9.0);
        assert!(labeler.find_assignment(&dots, &lines, spacing()).is_some());
        let (dots, lines) = two_rows(0.0, 15.0, 15.0);
        assert!(labeler.find_assignment(&dots, &lines, spacing()).is_none());
    }

    #[test]
    fn nwire_slots_follow_image_rows() {
        let labeler = nwire_labeler(2);
        let (dots, lines) = two_rows(40.0, 28.0, 0.0);
        let assignment = labeler
            .find_assignment(&dots, &lines, spacing())
            .expect("match");
        assert_eq!(assignment.lines, vec![1, 0]);

        let labeling = labeler.labeling_for(&dots, &lines, &assignment);
        assert_eq!(labeling.len(), 6);
        let first = labeling.pattern_points(0).expect("pattern 0");
        assert_relative_eq!(first[0].y, 28.0);
        // wire 0 is the rightmost dot
        for (p, x) in first.iter().zip([20.0, 10.0, 0.0]) {
            assert_relative_eq!(p.x, x);
        }
    }

    #[test]
    fn short_lines_never_match() {
        let labeler = nwire_labeler(2);
        let dots = [row(0.0, 0.0), row(12.0, 0.0)].concat();
        let lines = vec![
            Line::fit(vec![0, 1], &dots).expect("a"),
            Line::fit(vec![3, 4], &dots).expect("b"),
        ];
        assert!(labeler.find_assignment(&dots, &lines, spacing()).is_none());
        assert!(labeler.label(&dots, &lines, spacing()).is_empty());
    }

    #[test]
    fn first_matching_tuple_wins() {
        let labeler = nwire_labeler(2);
        // three rows; (0,1) and (1,2) and (0,2) all fit
        let dots = [row(0.0, 0.0), row(10.0, 0.0), row(20.0, 0.0)].concat();
        let lines = vec![
            Line::fit(vec![0, 1, 2], &dots).expect("a"),
            Line::fit(vec![3, 4, 5], &dots).expect("b"),
            Line::fit(vec![6, 7, 8], &dots).expect("c"),
        ];
        let assignment = labeler
            .find_assignment(&dots, &lines, spacing())
            .expect("match");
        assert_eq!(assignment.lines, vec![0, 1]);
    }

    #[test]
    fn coplanar_lines_resolve_to_left_diagonal_right() {
        // Z shape: two horizontal sides joined by a diagonal at shared dots
        let dots = vec![
            Dot::new(0.0, 0.0, 1.0),
            Dot::new(10.0, 0.0, 1.0),
            Dot::new(20.0, 0.0, 1.0),
            Dot::new(5.0, 20.0, 1.0),
            Dot::new(15.0, 20.0, 1.0),
            Dot::new(25.0, 20.0, 1.0),
            Dot::new(12.5, 10.0, 1.0),
        ];
        let diagonal = Line::fit(vec![2, 3, 6], &dots).expect("diagonal");
        let right = Line::fit(vec![3, 4, 5], &dots).expect("right");
        let left = Line::fit(vec![0, 1, 2], &dots).expect("left");
        let lines = vec![diagonal, right, left];

        let params = LabelerParams {
            inclined_line_angle_rad: (20.0f64).atan2(15.0),
            ..LabelerParams::default()
        };
        let geometry = PatternGeometry {
            min_line_pair_dist_mm: 15.0,
            max_line_pair_dist_mm: 25.0,
            ..PatternGeometry::default()
        };
        let labeler =
            PatternLabeler::with_geometry(PatternKind::CoplanarParallelWires, 3, geometry, params);
        let assignment = labeler
            .find_assignment(&dots, &lines, spacing())
            .expect("match");
        assert_eq!(assignment.lines, vec![2, 0, 1]);

        let wrong_angle = PatternLabeler::with_geometry(
            PatternKind::CoplanarParallelWires,
            3,
            geometry,
            LabelerParams::default(),
        );
        assert!(wrong_angle
            .find_assignment(&dots, &lines, spacing())
            .is_none());
    }

    #[test]
    fn separate_inclined_lines_use_the_pattern_angle_window() {
        let (s, c) = 0.5f64.sin_cos();
        let mut dots = row(0.0, 0.0).to_vec();
        dots.extend((0..3).map(|i| {
            let t = 10.0 * i as f64;
            Dot::new(40.0 + t * c, 30.0 + t * s, 1.0)
        }));
        let a = Line::fit(vec![0, 1, 2], &dots).expect("a");
        let b = Line::fit(vec![3, 4, 5], &dots).expect("b");
        assert!(!a.shares_endpoint(&b));

        let with_angles = |min, max| {
            let geometry = PatternGeometry {
                min_line_pair_angle_rad: min,
                max_line_pair_angle_rad: max,
                ..parallel_geometry()
            };
            PatternLabeler::with_geometry(PatternKind::NWire, 2, geometry, LabelerParams::default())
        };
        assert!(with_angles(0.45, 0.48).line_pair_consistent(&a, &b, &dots, spacing()));
        assert!(!with_angles(0.7, 0.8).line_pair_consistent(&a, &b, &dots, spacing()));
    }

    #[test]
    fn ties_in_x_are_ordered_by_y() {
        let dots = vec![
            Dot::new(5.0, 9.0, 1.0),
            Dot::new(5.0, 1.0, 1.0),
            Dot::new(9.0, 4.0, 1.0),
        ];
        let mut order = vec![0, 1, 2];
        order.sort_by(|&a, &b| right_to_left(&dots, a, b));
        assert_eq!(order, vec![2, 1, 0]);
    }
}
