//! Acoustic feature frontend.
//!
//! Turns a raw waveform into normalized, LFR-stacked feature frames:
//! filterbank rows from the external DSP seam, low-frame-rate stacking,
//! then CMVN. Built once per utterance and consumed once by the scheduler.

pub mod cmvn;
pub mod fbank;
pub mod lfr;

use crate::config::FrontendConfig;
use crate::defaults;
use crate::error::{Result, VadError};
use cmvn::CmvnStats;
use fbank::FilterBank;
use std::sync::Arc;

/// Ordered fixed-width feature frames for one utterance.
///
/// Stored flat; one frame is `dim` consecutive floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    data: Vec<f32>,
    dim: usize,
}

impl FeatureSequence {
    /// Build a sequence from per-frame rows of uniform width `dim`.
    pub fn from_frames(frames: Vec<Vec<f32>>, dim: usize) -> Self {
        let mut data = Vec::with_capacity(frames.len() * dim);
        for frame in frames {
            debug_assert_eq!(frame.len(), dim);
            data.extend_from_slice(&frame);
        }
        Self { data, dim }
    }

    /// Width of one frame.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of frames.
    pub fn num_frames(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    /// Returns true if the sequence holds no frames.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One frame as a slice.
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// A contiguous run of `count` frames starting at `start`.
    pub fn frames(&self, start: usize, count: usize) -> &[f32] {
        &self.data[start * self.dim..(start + count) * self.dim]
    }
}

/// Feature extraction pipeline: fbank → LFR → CMVN.
pub struct Frontend {
    filter_bank: Arc<dyn FilterBank>,
    cmvn: CmvnStats,
    config: FrontendConfig,
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("cmvn", &self.cmvn)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Frontend {
    /// Create a frontend, checking the stats against the configured geometry.
    ///
    /// CMVN stats must cover either the mel width (broadcast across LFR
    /// copies) or the full stacked width; anything else fails here, before
    /// any inference starts.
    pub fn new(
        filter_bank: Arc<dyn FilterBank>,
        cmvn: CmvnStats,
        config: FrontendConfig,
    ) -> Result<Self> {
        if filter_bank.mel_bins() != config.mel_bins {
            return Err(VadError::DimensionMismatch {
                context: "filterbank mel bins".to_string(),
                expected: config.mel_bins,
                actual: filter_bank.mel_bins(),
            });
        }
        let stats_dim = cmvn.dim();
        if stats_dim != config.mel_bins && stats_dim != config.feature_dim() {
            return Err(VadError::DimensionMismatch {
                context: "CMVN statistics".to_string(),
                expected: config.feature_dim(),
                actual: stats_dim,
            });
        }
        Ok(Self {
            filter_bank,
            cmvn,
            config,
        })
    }

    /// Extract normalized LFR-stacked features for one waveform.
    pub fn extract(&self, waveform: &[f32]) -> Result<FeatureSequence> {
        let scaled: Vec<f32> = waveform.iter().map(|&s| s * defaults::PCM_SCALE).collect();
        let rows = self
            .filter_bank
            .compute(&scaled, self.config.sample_rate)?;

        let mut stacked = lfr::apply_lfr(&rows, self.config.lfr_m, self.config.lfr_n);
        let dim = self.config.feature_dim();
        self.cmvn.apply(&mut stacked, dim)?;
        Ok(FeatureSequence::from_frames(stacked, dim))
    }

    /// Frontend configuration in effect.
    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbank::MockFilterBank;

    fn test_config(mel_bins: usize, lfr_m: usize, lfr_n: usize) -> FrontendConfig {
        FrontendConfig {
            mel_bins,
            lfr_m,
            lfr_n,
            ..FrontendConfig::default()
        }
    }

    fn test_frontend(mel_bins: usize, lfr_m: usize, lfr_n: usize) -> Frontend {
        let config = test_config(mel_bins, lfr_m, lfr_n);
        let fbank = Arc::new(MockFilterBank::new(
            mel_bins,
            config.frame_shift_samples(),
            config.frame_length_samples(),
        ));
        Frontend::new(fbank, CmvnStats::identity(mel_bins), config).unwrap()
    }

    #[test]
    fn test_feature_sequence_accessors() {
        let seq = FeatureSequence::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2);
        assert_eq!(seq.num_frames(), 2);
        assert_eq!(seq.dim(), 2);
        assert_eq!(seq.frame(1), &[3.0, 4.0]);
        assert_eq!(seq.frames(0, 2), &[1.0, 2.0, 3.0, 4.0]);
        assert!(!seq.is_empty());
    }

    #[test]
    fn test_extract_stacks_to_feature_dim() {
        let frontend = test_frontend(8, 5, 1);
        // One second of silence at 16kHz.
        let features = frontend.extract(&vec![0.0; 16000]).unwrap();
        assert_eq!(features.dim(), 40);
        assert!(features.num_frames() > 0);
    }

    #[test]
    fn test_extract_short_waveform_yields_at_most_one_frame() {
        let frontend = test_frontend(8, 5, 1);
        // Shorter than one frame shift.
        let features = frontend.extract(&vec![0.0; 100]).unwrap();
        assert!(features.num_frames() <= 1);
    }

    #[test]
    fn test_lfr_disabled_round_trips_fbank_rows() {
        let config = test_config(4, 1, 1);
        let fbank = MockFilterBank::new(
            4,
            config.frame_shift_samples(),
            config.frame_length_samples(),
        );
        let waveform: Vec<f32> = (0..3200).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect();

        let scaled: Vec<f32> = waveform.iter().map(|&s| s * defaults::PCM_SCALE).collect();
        let raw_rows = fbank.compute(&scaled, config.sample_rate).unwrap();

        let frontend = Frontend::new(
            Arc::new(fbank),
            CmvnStats::identity(4),
            config,
        )
        .unwrap();
        let features = frontend.extract(&waveform).unwrap();

        assert_eq!(features.num_frames(), raw_rows.len());
        for (i, row) in raw_rows.iter().enumerate() {
            assert_eq!(features.frame(i), row.as_slice());
        }
    }

    #[test]
    fn test_cmvn_dimension_mismatch_rejected_at_construction() {
        let config = test_config(8, 5, 1);
        let fbank = Arc::new(MockFilterBank::new(
            8,
            config.frame_shift_samples(),
            config.frame_length_samples(),
        ));
        // Neither mel width (8) nor stacked width (40).
        let err = Frontend::new(fbank, CmvnStats::identity(13), config).unwrap_err();
        assert!(matches!(err, VadError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_mel_bin_mismatch_rejected() {
        let config = test_config(8, 5, 1);
        let fbank = Arc::new(MockFilterBank::new(16, 160, 400));
        let err = Frontend::new(fbank, CmvnStats::identity(8), config).unwrap_err();
        assert!(matches!(err, VadError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_cmvn_broadcast_applies_per_sub_frame() {
        let config = test_config(2, 2, 1);
        let fbank = Arc::new(MockFilterBank::new(
            2,
            config.frame_shift_samples(),
            config.frame_length_samples(),
        ));
        let stats = CmvnStats {
            shift: vec![1.0, 1.0],
            scale: vec![2.0, 2.0],
        };
        let frontend = Frontend::new(fbank, stats, config).unwrap();
        let features = frontend.extract(&vec![0.0; 1600]).unwrap();
        // Silence rows are 0.0; (0 + 1) * 2 = 2 in every position.
        for i in 0..features.num_frames() {
            assert!(features.frame(i).iter().all(|&v| v == 2.0));
        }
    }
}
