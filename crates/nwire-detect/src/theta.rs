//! Orientation acceptance for undirected lines.
//!
//! A line and its 180°-rotated twin are the same line, so an orientation θ is
//! accepted when θ or one of its π-shifted copies lies in `[min, max]`. Which
//! copies can land in the range depends on where the range sits relative to
//! ±π/2.

use std::f64::consts::{FRAC_PI_2, PI};

/// Accepted orientation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThetaRange {
    /// `[min, max]` within `[-π/2, π/2]`.
    Centered { min: f64, max: f64 },
    /// `max` above π/2.
    ExtendsAbove { min: f64, max: f64 },
    /// `min` below -π/2.
    ExtendsBelow { min: f64, max: f64 },
    /// Span of π or more: every orientation passes.
    Full,
}

impl ThetaRange {
    pub fn new(min_theta: f64, max_theta: f64) -> Self {
        let (min, max) = if min_theta <= max_theta {
            (min_theta, max_theta)
        } else {
            (max_theta, min_theta)
        };
        if max - min >= PI {
            ThetaRange::Full
        } else if max > FRAC_PI_2 {
            ThetaRange::ExtendsAbove { min, max }
        } else if min < -FRAC_PI_2 {
            ThetaRange::ExtendsBelow { min, max }
        } else {
            ThetaRange::Centered { min, max }
        }
    }

    /// Whether a line with orientation `theta` (from `atan2`) is accepted.
    pub fn accepts(&self, theta: f64) -> bool {
        let within = |min: f64, max: f64, a: f64| a >= min && a <= max;
        match *self {
            ThetaRange::Full => true,
            ThetaRange::Centered { min, max } => {
                within(min, max, theta)
                    || within(min, max, theta - PI)
                    || within(min, max, theta + PI)
            }
            ThetaRange::ExtendsAbove { min, max } => {
                // upper part of the window is reached from negative θ
                within(min, max, theta)
                    || within(min, max, theta + PI)
                    || (min < 0.0 && within(min, max, theta - PI))
            }
            ThetaRange::ExtendsBelow { min, max } => {
                within(min, max, theta)
                    || within(min, max, theta - PI)
                    || (max > 0.0 && within(min, max, theta + PI))
            }
        }
    }
}
