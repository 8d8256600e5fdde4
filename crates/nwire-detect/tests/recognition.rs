use nwire_core::synthetic::{reference_nwire_phantom, SyntheticRig};
use nwire_core::Dot;
use nwire_detect::{NWireDetector, NWireDetectorParams};

fn detector() -> NWireDetector {
    NWireDetector::new(reference_nwire_phantom(), NWireDetectorParams::default())
        .expect("detector")
}

#[test]
fn labels_every_sweep_frame() {
    let _ = env_logger::builder().is_test(true).try_init();
    let phantom = reference_nwire_phantom();
    let rig = SyntheticRig::reference();
    let detector = detector();

    for frame in rig.sweep(&phantom, 8) {
        let result = detector
            .detect(&frame.dots, rig.mm_per_pixel)
            .expect("detect");
        assert!(result.found());
        assert_eq!(result.lines.max_points(), 3);
        assert_eq!(result.labeling, frame.labeling);
    }
}

#[test]
fn distractor_dots_do_not_change_the_labeling() {
    let phantom = reference_nwire_phantom();
    let rig = SyntheticRig::reference();
    let frame = rig.frame(&phantom, &rig.sweep_pose(4, 8)).expect("frame");

    let mut dots = vec![Dot::new(300.0, 300.0, 50.0), Dot::new(5.0, 250.0, 60.0)];
    dots.extend(frame.dots.iter().copied());
    dots.push(Dot::new(400.0, 10.0, 900.0));

    let detector = detector();
    let first = detector.detect(&dots, rig.mm_per_pixel).expect("detect");
    let second = detector.detect(&dots, rig.mm_per_pixel).expect("detect");
    assert_eq!(first, second);
    assert_eq!(first.labeling, frame.labeling);
}

#[test]
fn dot_order_does_not_change_the_labeling() {
    let phantom = reference_nwire_phantom();
    let rig = SyntheticRig::reference();
    let frame = rig.frame(&phantom, &rig.sweep_pose(1, 8)).expect("frame");

    let mut reversed = frame.dots.clone();
    reversed.reverse();
    let result = detector()
        .detect(&reversed, rig.mm_per_pixel)
        .expect("detect");
    assert_eq!(result.labeling, frame.labeling);
}

#[test]
fn missing_wire_means_no_match() {
    let phantom = reference_nwire_phantom();
    let rig = SyntheticRig::reference();
    let frame = rig.frame(&phantom, &rig.sweep_pose(0, 8)).expect("frame");

    // drop the middle dot of the second pattern
    let mut dots = frame.dots.clone();
    dots.remove(4);
    let result = detector().detect(&dots, rig.mm_per_pixel).expect("detect");
    assert!(!result.found());
    assert!(result.labeling.is_empty());
}

#[test]
fn wrong_spacing_finds_nothing() {
    let phantom = reference_nwire_phantom();
    let rig = SyntheticRig::reference();
    let frame = rig.frame(&phantom, &rig.sweep_pose(0, 8)).expect("frame");
    let result = detector()
        .detect(&frame.dots, rig.mm_per_pixel * 3.0)
        .expect("detect");
    assert!(result.labeling.is_empty());
}
