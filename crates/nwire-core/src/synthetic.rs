//! Deterministic synthetic data for tests, benches and examples.
//!
//! Everything here is noise-free: dots are exact wire / image-plane
//! intersections for a known image pose and a known image-to-probe transform.

use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Vector3};

use crate::{
    wire_image_intersection, Dot, LabeledDot, LabelingResult, Pattern, PatternKind,
    PhantomDefinition, Wire,
};

/// Three N-wire patterns stacked 10 mm apart along phantom y.
///
/// Wires run along phantom z (0..40 mm). Wire 0 sits at x = 20, wire 2 at
/// x = 0, and the diagonal starts on wire 0's front end, so an image plane
/// at constant z shows wire 0 on the right.
pub fn reference_nwire_phantom() -> PhantomDefinition {
    let pattern = |y: f64| Pattern {
        kind: PatternKind::NWire,
        wires: [
            Wire::new(Point3::new(20.0, y, 0.0), Point3::new(20.0, y, 40.0)),
            Wire::new(Point3::new(20.0, y, 0.0), Point3::new(0.0, y, 40.0)),
            Wire::new(Point3::new(0.0, y, 0.0), Point3::new(0.0, y, 40.0)),
        ],
        distance_to_origin_mm: [0.0, 10.0, 20.0],
        distance_to_origin_tolerance_mm: [1.0, 10.0, 1.0],
    };
    PhantomDefinition::new(vec![pattern(0.0), pattern(10.0), pattern(20.0)])
}

/// Similarity from image pixels (plane z = 0) into phantom mm.
pub fn image_to_phantom(
    rotation: &Rotation3<f64>,
    origin: &Point3<f64>,
    mm_per_pixel: f64,
) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&(rotation.matrix() * mm_per_pixel));
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);
    m
}

/// Labeled wire crossings of every pattern, in (pattern, wire) order.
///
/// `None` if any wire is parallel to the image plane.
pub fn project_phantom(
    phantom: &PhantomDefinition,
    image_to_phantom: &Matrix4<f64>,
) -> Option<LabelingResult> {
    let phantom_to_image = image_to_phantom.try_inverse()?;
    let mut dots = Vec::with_capacity(phantom.wire_count());
    for (pattern_id, pattern) in phantom.patterns.iter().enumerate() {
        for (wire_id, wire) in pattern.wires.iter().enumerate() {
            let p = wire_image_intersection(wire, &phantom_to_image)?;
            dots.push(LabeledDot {
                x: p.x,
                y: p.y,
                pattern_id,
                wire_id,
            });
        }
    }
    Some(LabelingResult::new(dots))
}

/// Unlabeled dots for a labeling, with slightly distinct intensities.
pub fn dots_from_labeling(labeling: &LabelingResult) -> Vec<Dot> {
    labeling
        .dots
        .iter()
        .enumerate()
        .map(|(i, d)| Dot::new(d.x, d.y, 100.0 + i as f64))
        .collect()
}

/// One synthetic tracked frame.
#[derive(Clone, Debug)]
pub struct SyntheticFrame {
    pub labeling: LabelingResult,
    pub dots: Vec<Dot>,
    pub probe_to_reference: Matrix4<f64>,
    pub phantom_to_reference: Matrix4<f64>,
}

/// Known calibration setup producing consistent tracked frames.
#[derive(Clone, Debug)]
pub struct SyntheticRig {
    /// Ground-truth image-to-probe transform.
    pub image_to_probe: Matrix4<f64>,
    pub phantom_to_reference: Matrix4<f64>,
    pub mm_per_pixel: f64,
}

impl SyntheticRig {
    /// A fixed, non-trivial rig at 0.2 mm per pixel.
    pub fn reference() -> Self {
        let mm_per_pixel = 0.2;
        let rotation = Rotation3::from_euler_angles(0.1, -0.05, 0.2);
        let image_to_probe =
            image_to_phantom(&rotation, &Point3::new(10.0, -5.0, 3.0), mm_per_pixel);
        let phantom_to_reference = Translation3::new(100.0, 50.0, -20.0).to_homogeneous()
            * Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3).to_homogeneous();
        Self {
            image_to_probe,
            phantom_to_reference,
            mm_per_pixel,
        }
    }

    /// Image pose `i` of an `n`-step sweep through the phantom.
    ///
    /// Depth runs from 10 to 30 mm along the wires with small tilts, keeping
    /// all crossings inside the wire segments.
    pub fn sweep_pose(&self, i: usize, n: usize) -> Matrix4<f64> {
        let fi = i as f64;
        let t = if n > 1 { fi / (n - 1) as f64 } else { 0.5 };
        let rotation = Rotation3::from_euler_angles(
            0.12 * (1.7 * fi).sin(),
            0.10 * (2.3 * fi).cos(),
            0.15 * (0.9 * fi + 0.4).sin(),
        );
        let origin = Point3::new(
            -8.0 + 1.5 * (1.1 * fi).sin(),
            -6.0 + 1.5 * (0.7 * fi).cos(),
            10.0 + 20.0 * t,
        );
        image_to_phantom(&rotation, &origin, self.mm_per_pixel)
    }

    /// Frame seen from `image_to_phantom`, with the probe pose that makes it
    /// consistent with [`SyntheticRig::image_to_probe`].
    pub fn frame(
        &self,
        phantom: &PhantomDefinition,
        image_to_phantom: &Matrix4<f64>,
    ) -> Option<SyntheticFrame> {
        let labeling = project_phantom(phantom, image_to_phantom)?;
        let probe_to_reference =
            self.phantom_to_reference * image_to_phantom * self.image_to_probe.try_inverse()?;
        Some(SyntheticFrame {
            dots: dots_from_labeling(&labeling),
            labeling,
            probe_to_reference,
            phantom_to_reference: self.phantom_to_reference,
        })
    }

    /// `n` frames along [`SyntheticRig::sweep_pose`].
    pub fn sweep(&self, phantom: &PhantomDefinition, n: usize) -> Vec<SyntheticFrame> {
        (0..n)
            .filter_map(|i| self.frame(phantom, &self.sweep_pose(i, n)))
            .collect()
    }
}
