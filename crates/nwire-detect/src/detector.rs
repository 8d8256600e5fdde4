use log::{debug, warn};
use nwire_core::{Dot, LabelingResult, PhantomDefinition};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::labeler::{Assignment, PatternLabeler};
use crate::line_finder::{LineFinder, LineSearch};
use crate::params::{NWireDetectorParams, PixelSpacing};
use crate::DetectError;

/// Dots of one frame together with its approximate pixel spacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDots {
    pub dots: Vec<Dot>,
    pub mm_per_pixel: f64,
}

/// Outcome of labeling one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Empty when no tuple of lines matched the phantom.
    pub labeling: LabelingResult,
    pub lines: LineSearch,
    /// Indices into `lines.candidates()`, one per pattern.
    pub assignment: Option<Assignment>,
}

impl DetectionResult {
    pub fn found(&self) -> bool {
        self.assignment.is_some()
    }
}

/// N-wire phantom recognizer: line search followed by pattern labeling.
#[derive(Clone, Debug)]
pub struct NWireDetector {
    params: NWireDetectorParams,
    phantom: PhantomDefinition,
    finder: LineFinder,
    labeler: PatternLabeler,
}

impl NWireDetector {
    /// Validate the phantom and derive its pattern geometry once.
    pub fn new(
        phantom: PhantomDefinition,
        params: NWireDetectorParams,
    ) -> Result<Self, DetectError> {
        let labeler = PatternLabeler::new(&phantom, params.labeler.clone())?;
        let finder = LineFinder::new(&phantom, params.line_finder.clone());
        debug!(
            "detector for {} patterns, geometry {:?}",
            phantom.pattern_count(),
            labeler.geometry()
        );
        Ok(Self {
            params,
            phantom,
            finder,
            labeler,
        })
    }

    pub fn params(&self) -> &NWireDetectorParams {
        &self.params
    }

    pub fn phantom(&self) -> &PhantomDefinition {
        &self.phantom
    }

    pub fn labeler(&self) -> &PatternLabeler {
        &self.labeler
    }

    pub fn line_finder(&self) -> &LineFinder {
        &self.finder
    }

    /// Label one frame's dots.
    ///
    /// Not finding the phantom is a normal outcome with an empty labeling;
    /// only an unusable pixel spacing is an error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, dots), fields(dots = dots.len()))
    )]
    pub fn detect(&self, dots: &[Dot], mm_per_pixel: f64) -> Result<DetectionResult, DetectError> {
        let spacing = PixelSpacing::new(mm_per_pixel)?;
        let lines = self.finder.find_lines(dots, spacing);
        let candidates = lines.candidates();
        let assignment = self.labeler.find_assignment(dots, candidates, spacing);
        let labeling = match &assignment {
            Some(a) => self.labeler.labeling_for(dots, candidates, a),
            None => {
                debug!(
                    "no pattern match among {} candidate lines of {} points",
                    candidates.len(),
                    lines.max_points()
                );
                LabelingResult::default()
            }
        };
        Ok(DetectionResult {
            labeling,
            lines,
            assignment,
        })
    }

    /// Label a batch of frames; a frame that fails yields an empty labeling.
    pub fn detect_frames(&self, frames: &[FrameDots]) -> Vec<LabelingResult> {
        let labelings: Vec<LabelingResult> = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| match self.detect(&frame.dots, frame.mm_per_pixel) {
                Ok(result) => result.labeling,
                Err(err) => {
                    warn!("frame {i}: {err}");
                    LabelingResult::default()
                }
            })
            .collect();
        let found = labelings.iter().filter(|l| !l.is_empty()).count();
        debug!("labeled {found} of {} frames", frames.len());
        labelings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwire_core::synthetic::{reference_nwire_phantom, SyntheticRig};

    fn detector() -> NWireDetector {
        NWireDetector::new(reference_nwire_phantom(), NWireDetectorParams::default())
            .expect("detector")
    }

    #[test]
    fn rejects_bad_spacing() {
        let d = detector();
        assert_eq!(
            d.detect(&[], 0.0).unwrap_err(),
            DetectError::InvalidSpacing(0.0)
        );
    }

    #[test]
    fn rejects_empty_phantom() {
        let err = NWireDetector::new(PhantomDefinition::default(), NWireDetectorParams::default())
            .unwrap_err();
        assert!(matches!(err, DetectError::Phantom(_)));
    }

    #[test]
    fn empty_frame_is_not_an_error() {
        let result = detector().detect(&[], 0.2).expect("detect");
        assert!(!result.found());
        assert!(result.labeling.is_empty());
    }

    #[test]
    fn batch_keeps_frame_positions() {
        let phantom = reference_nwire_phantom();
        let rig = SyntheticRig::reference();
        let frame = rig.frame(&phantom, &rig.sweep_pose(2, 6)).expect("frame");
        let frames = vec![
            FrameDots {
                dots: frame.dots.clone(),
                mm_per_pixel: rig.mm_per_pixel,
            },
            FrameDots {
                dots: frame.dots.clone(),
                mm_per_pixel: -1.0,
            },
            FrameDots {
                dots: Vec::new(),
                mm_per_pixel: rig.mm_per_pixel,
            },
        ];
        let labelings = detector().detect_frames(&frames);
        assert_eq!(labelings.len(), 3);
        assert_eq!(labelings[0], frame.labeling);
        assert!(labelings[1].is_empty());
        assert!(labelings[2].is_empty());
    }
}
