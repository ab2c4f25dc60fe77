//! Default configuration constants for fsmn-vad.
//!
//! This module provides shared constants used across the configuration types
//! to ensure consistency and eliminate duplication. The values match the
//! FSMN-VAD model family these detectors are built for.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition models and the rate the
/// FSMN-VAD acoustic scorer is trained at.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of log-mel filterbank bins per raw frame.
pub const MEL_BINS: usize = 80;

/// Filterbank frame shift in milliseconds.
pub const FRAME_SHIFT_MS: u32 = 10;

/// Filterbank frame length in milliseconds.
pub const FRAME_LENGTH_MS: u32 = 25;

/// Number of consecutive raw frames stacked into one LFR output frame.
pub const LFR_M: usize = 5;

/// Stride (in raw frames) between successive LFR output frames.
pub const LFR_N: usize = 1;

/// Number of FSMN memory layers in the acoustic scorer.
pub const FSMN_LAYERS: usize = 4;

/// Projection dimension of each FSMN memory layer.
pub const PROJ_DIM: usize = 128;

/// Left-order of the FSMN memory; each layer caches `proj_dim * (lorder - 1)` values.
pub const LORDER: usize = 20;

/// Per-frame speech score at or above which a frame counts as voiced.
pub const SPEECH_THRESHOLD: f32 = 0.6;

/// Debounce window in milliseconds before a voiced run opens a segment.
///
/// Rejects isolated score spikes: speech must persist this long before the
/// detector commits to a segment start.
pub const SIL_TO_SPEECH_MS: u32 = 150;

/// Trailing silence in milliseconds tolerated before an open segment ends.
///
/// The hangover window: longer values merge phrases separated by short
/// pauses, shorter values split them.
pub const MAX_END_SILENCE_MS: u32 = 800;

/// Minimum RMS energy for a frame's sample span to count as voiced.
///
/// Scores alone can flicker above threshold on degenerate input; a frame is
/// only voiced when its waveform span also carries audible energy.
pub const ENERGY_FLOOR: f32 = 1.0e-4;

/// Maximum chunk width in LFR frames for one scorer call.
pub const MAX_CHUNK_FRAMES: usize = 6000;

/// Width in LFR frames of the all-silence placeholder chunk.
///
/// Emitted for a micro-batch member that has run out of features so chunk
/// counts stay aligned across the batch.
pub const PLACEHOLDER_FRAMES: usize = 80;

/// Number of independent utterances processed per micro-batch.
pub const BATCH_SIZE: usize = 1;

/// Synthetic silent tail in seconds appended in streaming mode.
///
/// Sustains the chunk stream long enough for the terminal flush; segment
/// slices are clipped back to the true waveform length by the mapper.
pub const TAIL_PADDING_SECS: u32 = 60;

/// Scale factor applied to unit-range samples before filterbank extraction.
///
/// The acoustic model expects 16-bit PCM magnitudes.
pub const PCM_SCALE: f32 = 32768.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_geometry_is_consistent() {
        // Layer cache must be non-empty for the recurrent handoff to matter.
        assert!(LORDER > 1);
        assert!(PROJ_DIM * (LORDER - 1) > 0);
    }

    #[test]
    fn test_debounce_shorter_than_hangover() {
        assert!(SIL_TO_SPEECH_MS < MAX_END_SILENCE_MS);
    }

    #[test]
    fn test_frame_shift_divides_thresholds() {
        assert_eq!(SIL_TO_SPEECH_MS % FRAME_SHIFT_MS, 0);
        assert_eq!(MAX_END_SILENCE_MS % FRAME_SHIFT_MS, 0);
    }
}
