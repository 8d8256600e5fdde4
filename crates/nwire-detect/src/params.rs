use serde::{Deserialize, Serialize};

use crate::DetectError;

/// Approximate image spacing in mm per pixel, validated positive and finite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PixelSpacing(f64);

impl PixelSpacing {
    pub fn new(mm_per_pixel: f64) -> Result<Self, DetectError> {
        if mm_per_pixel.is_finite() && mm_per_pixel > 0.0 {
            Ok(Self(mm_per_pixel))
        } else {
            Err(DetectError::InvalidSpacing(mm_per_pixel))
        }
    }

    #[inline]
    pub fn mm_per_pixel(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn to_pixels(self, mm: f64) -> f64 {
        mm / self.0
    }
}

/// Parameters for line candidate search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFinderParams {
    /// Lower bound of accepted line orientation (radians).
    pub min_theta_rad: f64,
    /// Upper bound of accepted line orientation (radians).
    pub max_theta_rad: f64,
    /// Max perpendicular distance of an added point from a line (mm).
    pub collinear_point_max_distance_mm: f64,
}

impl Default for LineFinderParams {
    fn default() -> Self {
        Self {
            min_theta_rad: (-30.0f64).to_radians(),
            max_theta_rad: 30.0f64.to_radians(),
            collinear_point_max_distance_mm: 0.5,
        }
    }
}

/// Parameters for matching line tuples against the phantom.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerParams {
    /// Lines closer than this in angle count as parallel; also the slack on
    /// every angle window (radians).
    pub angle_tolerance_rad: f64,
    /// Widening of the inter-pattern distance range, in percent.
    pub max_line_pair_distance_error_percent: f64,
    /// Max shift between parallel line midpoints along the line (mm).
    pub max_line_shift_mm: f64,
    /// Expected angle between two lines meeting at a common dot (radians).
    pub inclined_line_angle_rad: f64,
    /// Allowed distance of wire endpoints from their pattern plane (mm).
    pub plane_epsilon_mm: f64,
}

impl Default for LabelerParams {
    fn default() -> Self {
        Self {
            angle_tolerance_rad: 5.0f64.to_radians(),
            max_line_pair_distance_error_percent: 10.0,
            max_line_shift_mm: 10.0,
            inclined_line_angle_rad: 35.0f64.to_radians(),
            plane_epsilon_mm: 1e-2,
        }
    }
}

/// Combined detector parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NWireDetectorParams {
    pub line_finder: LineFinderParams,
    pub labeler: LabelerParams,
}
