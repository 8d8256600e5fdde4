//! JSON configuration for the N-wire calibration pipeline.

use std::{
    fs,
    path::{Path, PathBuf},
};

use nwire_core::PhantomDefinition;
use nwire_detect::{DetectError, NWireDetector, NWireDetectorParams};
use nwire_probe::{CalibrationError, CalibrationOptions, ProbeCalibrator};
use serde::{Deserialize, Serialize};

use crate::pipeline::NWireCalibration;

#[derive(thiserror::Error, Debug)]
pub enum NWireIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum NWireConfigError {
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Phantom geometry plus every parameter group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NWireCalibConfig {
    pub phantom: PhantomDefinition,
    #[serde(default)]
    pub detector: NWireDetectorParams,
    #[serde(default)]
    pub calibration: CalibrationOptions,
    /// Where to write the calibration report.
    #[serde(default)]
    pub output_path: Option<String>,
}

impl NWireCalibConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, NWireIoError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, NWireIoError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), NWireIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("nwire_calibration_report.json"))
    }

    pub fn build_detector(&self) -> Result<NWireDetector, NWireConfigError> {
        Ok(NWireDetector::new(
            self.phantom.clone(),
            self.detector.clone(),
        )?)
    }

    pub fn build_calibrator(&self) -> Result<ProbeCalibrator, NWireConfigError> {
        Ok(ProbeCalibrator::new(
            self.phantom.clone(),
            self.calibration.clone(),
        )?)
    }

    /// Detector and calibrator sharing this config's phantom.
    pub fn build_pipeline(&self) -> Result<NWireCalibration, NWireConfigError> {
        Ok(NWireCalibration::new(
            self.build_detector()?,
            self.build_calibrator()?,
        ))
    }
}
