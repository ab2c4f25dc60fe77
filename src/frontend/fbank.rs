//! Filterbank extraction seam.
//!
//! The log-mel DSP primitive is an external collaborator; this module only
//! defines the trait boundary the frontend consumes, plus a deterministic
//! mock used throughout the test suite.

use crate::error::{Result, VadError};
use std::sync::Arc;

/// Trait for log-mel filterbank extraction.
///
/// This trait allows swapping implementations (a real Kaldi-compatible
/// fbank vs a mock).
pub trait FilterBank: Send + Sync {
    /// Compute per-frame log-mel vectors for a sample buffer.
    ///
    /// # Arguments
    /// * `samples` - PCM samples already scaled to 16-bit magnitude
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// One row per frame, each `mel_bins` wide.
    fn compute(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<Vec<f32>>>;

    /// Number of mel bins per row.
    fn mel_bins(&self) -> usize;
}

/// Implement FilterBank for Arc<T> to allow sharing across utterances.
impl<T: FilterBank> FilterBank for Arc<T> {
    fn compute(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<Vec<f32>>> {
        (**self).compute(samples, sample_rate)
    }

    fn mel_bins(&self) -> usize {
        (**self).mel_bins()
    }
}

/// Mock filterbank for testing.
///
/// Emits one row per snip-edges window, every bin holding the window's RMS
/// normalized back to unit range. Frame energy therefore survives into the
/// feature domain, which is what the mock scorer keys on.
#[derive(Debug, Clone)]
pub struct MockFilterBank {
    mel_bins: usize,
    frame_shift: usize,
    frame_length: usize,
    should_fail: bool,
}

impl MockFilterBank {
    /// Create a mock with the given geometry (shift/length in samples).
    pub fn new(mel_bins: usize, frame_shift: usize, frame_length: usize) -> Self {
        Self {
            mel_bins,
            frame_shift,
            frame_length,
            should_fail: false,
        }
    }

    /// Configure the mock to fail on compute.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl FilterBank for MockFilterBank {
    fn compute(&self, samples: &[f32], _sample_rate: u32) -> Result<Vec<Vec<f32>>> {
        if self.should_fail {
            return Err(VadError::Other("mock filterbank failure".to_string()));
        }

        // Snip-edges framing: only windows that fit entirely.
        if samples.len() < self.frame_length {
            return Ok(Vec::new());
        }
        let num_frames = 1 + (samples.len() - self.frame_length) / self.frame_shift;

        let mut rows = Vec::with_capacity(num_frames);
        for i in 0..num_frames {
            let window = &samples[i * self.frame_shift..i * self.frame_shift + self.frame_length];
            let mean_square: f64 = window
                .iter()
                .map(|&s| {
                    let normalized = s as f64 / crate::defaults::PCM_SCALE as f64;
                    normalized * normalized
                })
                .sum::<f64>()
                / window.len() as f64;
            let rms = mean_square.sqrt() as f32;
            rows.push(vec![rms; self.mel_bins]);
        }
        Ok(rows)
    }

    fn mel_bins(&self) -> usize {
        self.mel_bins
    }
}
