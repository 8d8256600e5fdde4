use log::debug;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use nwire_detect::{FrameDots, NWireDetector};
use nwire_probe::{CalibrationError, CalibrationResult, ProbeCalibrator, TrackedFrame};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Raw input of one acquired frame: segmented dots plus tracked poses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquiredFrame {
    #[serde(flatten)]
    pub dots: FrameDots,
    #[serde(default)]
    pub probe_to_reference: Option<Matrix4<f64>>,
    #[serde(default)]
    pub phantom_to_reference: Option<Matrix4<f64>>,
}

/// Recognition followed by calibration.
pub struct NWireCalibration {
    detector: NWireDetector,
    calibrator: ProbeCalibrator,
}

impl NWireCalibration {
    pub fn new(detector: NWireDetector, calibrator: ProbeCalibrator) -> Self {
        Self {
            detector,
            calibrator,
        }
    }

    pub fn detector(&self) -> &NWireDetector {
        &self.detector
    }

    pub fn calibrator(&self) -> &ProbeCalibrator {
        &self.calibrator
    }

    /// Label every frame. Frames where the phantom is not recognized keep an
    /// empty labeling and are later skipped by the calibrator.
    pub fn label_frames(&self, frames: &[AcquiredFrame]) -> Vec<TrackedFrame> {
        let dots: Vec<FrameDots> = frames.iter().map(|f| f.dots.clone()).collect();
        self.detector
            .detect_frames(&dots)
            .into_iter()
            .zip(frames)
            .map(|(labeling, frame)| TrackedFrame {
                labeling,
                probe_to_reference: frame.probe_to_reference,
                phantom_to_reference: frame.phantom_to_reference,
            })
            .collect()
    }

    /// Label both frame sets and calibrate.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, validation, calibration),
            fields(validation = validation.len(), calibration = calibration.len())
        )
    )]
    pub fn run(
        &self,
        validation: &[AcquiredFrame],
        calibration: &[AcquiredFrame],
    ) -> Result<CalibrationResult, CalibrationError> {
        let validation = self.label_frames(validation);
        let calibration = self.label_frames(calibration);
        debug!(
            "recognized phantom in {} of {} calibration frames",
            calibration.iter().filter(|f| !f.labeling.is_empty()).count(),
            calibration.len()
        );
        self.calibrator.calibrate(&validation, &calibration)
    }
}
