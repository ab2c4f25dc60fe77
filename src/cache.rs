//! Recurrent cache store.
//!
//! One FSMN memory buffer per layer, threaded through successive chunk
//! calls of a single utterance. The set is zero-initialized at utterance
//! start and replaced wholesale after every scorer call; shapes are fixed
//! for the utterance's lifetime and never shared across utterances.

use crate::config::EncoderConfig;
use crate::error::{Result, VadError};

/// Per-utterance recurrent state, logical shape `[1, proj_dim, lorder-1, 1]`
/// per layer, identified positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSet {
    layers: Vec<Vec<f32>>,
    layer_len: usize,
}

impl CacheSet {
    /// Allocate a zero-initialized cache set for the given encoder geometry.
    pub fn new(encoder: &EncoderConfig) -> Self {
        let layer_len = encoder.cache_len();
        Self {
            layers: vec![vec![0.0; layer_len]; encoder.fsmn_layers],
            layer_len,
        }
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Values per layer.
    pub fn layer_len(&self) -> usize {
        self.layer_len
    }

    /// Layer buffers in positional order.
    pub fn layers(&self) -> &[Vec<f32>] {
        &self.layers
    }

    /// Atomically replace the whole set with the scorer's updated buffers.
    ///
    /// The replacement must match the existing shape exactly; a mismatch is
    /// rejected without touching the current state — no partial updates.
    pub fn replace(&mut self, updated: Vec<Vec<f32>>) -> Result<()> {
        if updated.len() != self.layers.len() {
            return Err(VadError::CacheShapeMismatch {
                layer: updated.len().min(self.layers.len()),
                expected: self.layers.len(),
                actual: updated.len(),
            });
        }
        for (i, layer) in updated.iter().enumerate() {
            if layer.len() != self.layer_len {
                return Err(VadError::CacheShapeMismatch {
                    layer: i,
                    expected: self.layer_len,
                    actual: layer.len(),
                });
            }
        }
        self.layers = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_encoder() -> EncoderConfig {
        EncoderConfig {
            fsmn_layers: 3,
            proj_dim: 4,
            lorder: 3,
        }
    }

    #[test]
    fn test_new_is_zero_initialized() {
        let cache = CacheSet::new(&small_encoder());
        assert_eq!(cache.num_layers(), 3);
        assert_eq!(cache.layer_len(), 8);
        for layer in cache.layers() {
            assert!(layer.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_replace_swaps_whole_set() {
        let mut cache = CacheSet::new(&small_encoder());
        let updated = vec![vec![1.0; 8], vec![2.0; 8], vec![3.0; 8]];
        cache.replace(updated).unwrap();
        assert_eq!(cache.layers()[1][0], 2.0);
    }

    #[test]
    fn test_replace_rejects_wrong_layer_count() {
        let mut cache = CacheSet::new(&small_encoder());
        let err = cache.replace(vec![vec![0.0; 8]; 2]).unwrap_err();
        assert!(matches!(err, VadError::CacheShapeMismatch { .. }));
    }

    #[test]
    fn test_replace_rejects_wrong_layer_len() {
        let mut cache = CacheSet::new(&small_encoder());
        let err = cache
            .replace(vec![vec![0.0; 8], vec![0.0; 7], vec![0.0; 8]])
            .unwrap_err();
        assert!(matches!(
            err,
            VadError::CacheShapeMismatch {
                layer: 1,
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_replace_failure_leaves_state_untouched() {
        let mut cache = CacheSet::new(&small_encoder());
        cache
            .replace(vec![vec![5.0; 8], vec![5.0; 8], vec![5.0; 8]])
            .unwrap();
        // Bad replacement must not clobber anything.
        assert!(cache.replace(vec![vec![0.0; 1]; 3]).is_err());
        assert_eq!(cache.layers()[0][0], 5.0);
    }
}
