use approx::assert_relative_eq;
use nwire_calib::core::synthetic::{reference_nwire_phantom, SyntheticFrame, SyntheticRig};
use nwire_calib::{AcquiredFrame, CalibrationError, Dot, FrameDots, NWireCalibConfig};

fn acquired(frames: &[SyntheticFrame], mm_per_pixel: f64) -> Vec<AcquiredFrame> {
    frames
        .iter()
        .map(|f| AcquiredFrame {
            dots: FrameDots {
                dots: f.dots.clone(),
                mm_per_pixel,
            },
            probe_to_reference: Some(f.probe_to_reference),
            phantom_to_reference: Some(f.phantom_to_reference),
        })
        .collect()
}

fn config() -> NWireCalibConfig {
    NWireCalibConfig {
        phantom: reference_nwire_phantom(),
        ..NWireCalibConfig::default()
    }
}

#[test]
fn dots_to_calibration_matrix() {
    let _ = env_logger::builder().is_test(true).try_init();
    let rig = SyntheticRig::reference();
    let phantom = reference_nwire_phantom();
    let calibration = acquired(&rig.sweep(&phantom, 30), rig.mm_per_pixel);
    let validation = acquired(&rig.sweep(&phantom, 9), rig.mm_per_pixel);

    let pipeline = config().build_pipeline().expect("pipeline");
    let result = pipeline.run(&validation, &calibration).expect("calibrate");

    assert_relative_eq!(result.image_to_probe, rig.image_to_probe, epsilon = 1e-6);
    assert_eq!(result.frames_used, 30);
    assert!(result.outliers.is_empty());
    assert!(result.calibration.errors_3d.stats.mean < 1e-6);
    assert!(result.validation.errors_2d.rms < 1e-6);
}

#[test]
fn unrecognized_frames_are_skipped() {
    let rig = SyntheticRig::reference();
    let phantom = reference_nwire_phantom();
    let mut calibration = acquired(&rig.sweep(&phantom, 14), rig.mm_per_pixel);
    // a frame of clutter and a frame with a broken spacing
    calibration.push(AcquiredFrame {
        dots: FrameDots {
            dots: vec![Dot::new(10.0, 10.0, 5.0), Dot::new(400.0, 300.0, 5.0)],
            mm_per_pixel: rig.mm_per_pixel,
        },
        probe_to_reference: None,
        phantom_to_reference: None,
    });
    calibration[0].dots.mm_per_pixel = 0.0;

    let pipeline = config().build_pipeline().expect("pipeline");
    let tracked = pipeline.label_frames(&calibration);
    assert_eq!(tracked.len(), 15);
    assert!(tracked[0].labeling.is_empty());
    assert!(tracked[14].labeling.is_empty());
    assert_eq!(tracked.iter().filter(|f| !f.labeling.is_empty()).count(), 13);

    let result = pipeline.run(&[], &calibration).expect("calibrate");
    assert_eq!(result.frames_used, 13);
    assert_relative_eq!(result.image_to_probe, rig.image_to_probe, epsilon = 1e-6);
}

#[test]
fn too_few_recognized_frames_fail() {
    let rig = SyntheticRig::reference();
    let phantom = reference_nwire_phantom();
    let calibration = acquired(&rig.sweep(&phantom, 5), rig.mm_per_pixel);
    let err = config()
        .build_pipeline()
        .expect("pipeline")
        .run(&[], &calibration)
        .unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::InsufficientFrames {
            found: 5,
            required: 10
        }
    ));
}
