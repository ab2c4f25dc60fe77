//! Acoustic scorer seam.
//!
//! The neural inference engine is an external collaborator; this module
//! defines the trait boundary plus a deterministic mock for tests. A scorer
//! is pure `(features, cache) -> (scores, cache')` and never mutates shared
//! buffers, so one instance is safely shared across utterance threads.

use crate::cache::CacheSet;
use crate::error::{Result, VadError};
use std::sync::Arc;

/// Per-chunk scorer output: one speech score per frame, paired with the
/// updated cache buffers the next chunk of the same utterance must carry.
#[derive(Debug, Clone)]
pub struct ScorerOutput {
    /// Speech score in `0.0..=1.0` per feature frame, in time order.
    pub scores: Vec<f32>,
    /// Updated cache buffers, positionally matching the input set.
    pub out_cache: Vec<Vec<f32>>,
}

/// Trait for per-chunk acoustic scoring.
///
/// This trait allows swapping implementations (a real FSMN inference
/// session vs a mock).
pub trait Scorer: Send + Sync {
    /// Score one feature chunk.
    ///
    /// # Arguments
    /// * `features` - `num_frames * dim` floats, logical layout `[1, frames, dim]`
    /// * `num_frames` - Frames in the chunk
    /// * `cache` - Recurrent state from the previous chunk of this utterance
    fn score(&self, features: &[f32], num_frames: usize, cache: &CacheSet)
    -> Result<ScorerOutput>;
}

/// Implement Scorer for Arc<T> to allow sharing across utterances.
impl<T: Scorer> Scorer for Arc<T> {
    fn score(
        &self,
        features: &[f32],
        num_frames: usize,
        cache: &CacheSet,
    ) -> Result<ScorerOutput> {
        (**self).score(features, num_frames, cache)
    }
}

/// Mock scorer for testing.
///
/// Marks a frame as speech (score 1.0) when its mean feature value reaches
/// `level`, silence (0.0) otherwise, and passes the cache through unchanged.
/// Paired with [`crate::frontend::fbank::MockFilterBank`], which encodes
/// frame energy into the feature values, this gives a deterministic
/// end-to-end detector.
#[derive(Debug, Clone)]
pub struct MockScorer {
    level: f32,
    should_fail: bool,
}

impl MockScorer {
    /// Create a mock with the given activation level.
    pub fn new(level: f32) -> Self {
        Self {
            level,
            should_fail: false,
        }
    }

    /// Configure the mock to fail on score.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Scorer for MockScorer {
    fn score(
        &self,
        features: &[f32],
        num_frames: usize,
        cache: &CacheSet,
    ) -> Result<ScorerOutput> {
        if self.should_fail {
            return Err(VadError::ScorerFailure {
                message: "mock scorer failure".to_string(),
            });
        }
        if num_frames == 0 || features.len() % num_frames != 0 {
            return Err(VadError::ScorerFailure {
                message: format!(
                    "feature buffer of {} floats does not divide into {} frames",
                    features.len(),
                    num_frames
                ),
            });
        }

        let dim = features.len() / num_frames;
        let scores = features
            .chunks_exact(dim)
            .map(|frame| {
                let mean = frame.iter().sum::<f32>() / dim as f32;
                if mean >= self.level { 1.0 } else { 0.0 }
            })
            .collect();
        Ok(ScorerOutput {
            scores,
            out_cache: cache.layers().to_vec(),
        })
    }
}
