//! Candidate straight lines through detected dots.
//!
//! Lines grow one point at a time: all acceptable dot pairs first, then each
//! n-point line is extended by every dot that lies on it, between its ends,
//! at a plausible distance from its start. Point sets are kept sorted so that
//! duplicates are caught with a binary search.

use log::debug;
use nwire_core::{Dot, Line, PhantomDefinition};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::{LineFinderParams, PixelSpacing};
use crate::theta::ThetaRange;

/// Expected distance (mm) from a wire crossing to the first wire's crossing.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ExpectedDistance {
    distance_mm: f64,
    tolerance_mm: f64,
}

/// Lines grouped by point count.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LineSearch {
    /// `tiers[i]` holds lines of `i + 2` points.
    tiers: Vec<Vec<Line>>,
}

impl LineSearch {
    /// Lines with exactly `points` members.
    pub fn tier(&self, points: usize) -> &[Line] {
        points
            .checked_sub(2)
            .and_then(|i| self.tiers.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Largest point count reached; 0 when no line was found.
    pub fn max_points(&self) -> usize {
        self.tiers
            .iter()
            .rposition(|t| !t.is_empty())
            .map_or(0, |i| i + 2)
    }

    /// Final candidates: the longest non-empty tier, brightest first.
    pub fn candidates(&self) -> &[Line] {
        self.tier(self.max_points())
    }

    pub fn total_lines(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }
}

/// Finds collinear dot sets whose spacing matches the phantom's wires.
#[derive(Clone, Debug)]
pub struct LineFinder {
    params: LineFinderParams,
    theta: ThetaRange,
    expected: Vec<ExpectedDistance>,
    max_points: usize,
}

impl LineFinder {
    pub fn new(phantom: &PhantomDefinition, params: LineFinderParams) -> Self {
        let expected = phantom
            .patterns
            .iter()
            .flat_map(|p| {
                p.distance_to_origin_mm
                    .iter()
                    .zip(p.distance_to_origin_tolerance_mm.iter())
                    .skip(1)
                    .map(|(&distance_mm, &tolerance_mm)| ExpectedDistance {
                        distance_mm,
                        tolerance_mm,
                    })
            })
            .collect();

        Self {
            theta: ThetaRange::new(params.min_theta_rad, params.max_theta_rad),
            params,
            expected,
            max_points: phantom.max_points_per_line(),
        }
    }

    pub fn params(&self) -> &LineFinderParams {
        &self.params
    }

    pub fn theta_range(&self) -> ThetaRange {
        self.theta
    }

    /// Search all line tiers up to the phantom's wires per pattern.
    ///
    /// The final tier is sorted by descending total intensity; lower tiers
    /// stay in point-set order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, dots), fields(dots = dots.len()))
    )]
    pub fn find_lines(&self, dots: &[Dot], spacing: PixelSpacing) -> LineSearch {
        if dots.len() < 2 {
            return LineSearch::default();
        }

        let mut tiers = vec![self.two_point_lines(dots, spacing)];
        for points in 3..=self.max_points {
            let Some(shorter) = tiers.last() else { break };
            if shorter.is_empty() {
                break;
            }
            let longer = self.extend_lines(shorter, dots, spacing);
            debug!("{} candidate lines with {points} points", longer.len());
            tiers.push(longer);
        }

        let mut search = LineSearch { tiers };
        if let Some(last) = search.max_points().checked_sub(2) {
            search.tiers[last].sort_by(|a, b| b.intensity().total_cmp(&a.intensity()));
        }
        search
    }

    fn accepts_length(&self, length_px: f64, spacing: PixelSpacing) -> bool {
        self.expected.iter().any(|e| {
            (length_px - spacing.to_pixels(e.distance_mm)).abs()
                <= spacing.to_pixels(e.tolerance_mm)
        })
    }

    fn two_point_lines(&self, dots: &[Dot], spacing: PixelSpacing) -> Vec<Line> {
        let mut lines: Vec<Line> = Vec::new();
        for i in 0..dots.len() {
            for j in (i + 1)..dots.len() {
                if !self.accepts_length(dots[i].distance_to(&dots[j]), spacing) {
                    continue;
                }
                let theta = (dots[j].y - dots[i].y).atan2(dots[j].x - dots[i].x);
                if !self.theta.accepts(theta) {
                    continue;
                }
                let Some(line) = Line::fit(vec![i, j], dots) else {
                    continue;
                };
                if let Err(pos) = lines.binary_search_by(|l| l.cmp_points(&line)) {
                    lines.insert(pos, line);
                }
            }
        }
        debug!("{} candidate lines with 2 points", lines.len());
        lines
    }

    fn extend_lines(&self, shorter: &[Line], dots: &[Dot], spacing: PixelSpacing) -> Vec<Line> {
        let max_offset_px = spacing.to_pixels(self.params.collinear_point_max_distance_mm);
        let mut lines: Vec<Line> = Vec::new();

        for line in shorter {
            let start = line.start(dots);
            let end_t = line.projection(dots, &line.end(dots));
            let (lo, hi) = (end_t.min(0.0), end_t.max(0.0));

            for (idx, dot) in dots.iter().enumerate() {
                if line.contains(idx) {
                    continue;
                }
                let p = dot.position();
                if line.distance_to_point(dots, &p) > max_offset_px {
                    continue;
                }
                let t = line.projection(dots, &p);
                if t < lo || t > hi {
                    continue;
                }
                if !self.accepts_length((p - start).norm(), spacing) {
                    continue;
                }

                let mut points = line.points().to_vec();
                points.push(idx);
                points.sort_unstable();
                let pos = match lines.binary_search_by(|l| l.points().cmp(points.as_slice())) {
                    Ok(_) => continue,
                    Err(pos) => pos,
                };
                let Some(candidate) = Line::fit(points, dots) else {
                    continue;
                };
                if self.theta.accepts(candidate.orientation()) {
                    lines.insert(pos, candidate);
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwire_core::synthetic::reference_nwire_phantom;

    fn dots(coords: &[(f64, f64)]) -> Vec<Dot> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Dot::new(x, y, 1.0 + i as f64))
            .collect()
    }

    fn finder() -> LineFinder {
        LineFinder::new(&reference_nwire_phantom(), LineFinderParams::default())
    }

    fn unit_spacing() -> PixelSpacing {
        PixelSpacing::new(1.0).expect("spacing")
    }

    #[test]
    fn too_few_dots_give_nothing() {
        let f = finder();
        assert_eq!(f.find_lines(&[], unit_spacing()).max_points(), 0);
        let one = dots(&[(3.0, 4.0)]);
        let search = f.find_lines(&one, unit_spacing());
        assert!(search.candidates().is_empty());
        assert_eq!(search.total_lines(), 0);
    }

    #[test]
    fn three_collinear_dots_form_one_full_line() {
        let d = dots(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let search = finder().find_lines(&d, unit_spacing());
        assert_eq!(search.tier(2).len(), 3);
        assert_eq!(search.max_points(), 3);
        assert_eq!(search.candidates().len(), 1);
        assert_eq!(search.candidates()[0].points(), &[0, 1, 2]);
    }

    #[test]
    fn off_line_dot_is_not_added() {
        let d = dots(&[(0.0, 0.0), (10.0, 3.0), (20.0, 0.0)]);
        let search = finder().find_lines(&d, unit_spacing());
        assert_eq!(search.max_points(), 2);
        assert!(search.tier(3).is_empty());
    }

    #[test]
    fn dot_beyond_the_segment_is_not_added() {
        // pair (0, 1) spans 10 px; dot 2 sits on the extension
        let d = dots(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (60.0, 0.0)]);
        let search = finder().find_lines(&d, unit_spacing());
        for line in search.tier(3) {
            assert_eq!(line.points(), &[0, 1, 2]);
        }
        assert_eq!(search.tier(3).len(), 1);
    }

    #[test]
    fn steep_pairs_are_rejected() {
        let d = dots(&[(0.0, 0.0), (0.0, 20.0)]);
        assert_eq!(finder().find_lines(&d, unit_spacing()).total_lines(), 0);
    }

    #[test]
    fn final_tier_is_sorted_by_intensity_without_duplicates() {
        let mut d = dots(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (20.0, 0.0),
            (0.0, 50.0),
            (10.0, 50.0),
            (20.0, 50.0),
        ]);
        d[4].intensity = 500.0;
        let search = finder().find_lines(&d, unit_spacing());
        let finals = search.candidates();
        assert_eq!(finals.len(), 2);
        assert_eq!(finals[0].points(), &[3, 4, 5]);
        assert!(finals
            .windows(2)
            .all(|w| w[0].intensity() >= w[1].intensity()));

        for tier in [search.tier(2), search.tier(3)] {
            let mut sets: Vec<&[usize]> = tier.iter().map(Line::points).collect();
            let n = sets.len();
            sets.sort();
            sets.dedup();
            assert_eq!(sets.len(), n);
        }
    }

    #[test]
    fn search_is_idempotent() {
        let d = dots(&[
            (0.0, 0.0),
            (10.0, 0.5),
            (20.0, 0.0),
            (5.0, 12.0),
            (25.0, 11.0),
        ]);
        let f = finder();
        assert_eq!(
            f.find_lines(&d, unit_spacing()),
            f.find_lines(&d, unit_spacing())
        );
    }
}
