//! Configuration for the VAD pipeline.
//!
//! All sections deserialize from TOML with per-field defaults, so a partial
//! file (or none at all) yields a working detector. Derived quantities such
//! as the frame↔sample stride are computed here once and nowhere else.

use crate::defaults;
use crate::error::{Result, VadError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub frontend: FrontendConfig,
    pub encoder: EncoderConfig,
    pub post: PostConfig,
    pub runtime: RuntimeConfig,
}

/// Acoustic feature frontend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrontendConfig {
    pub sample_rate: u32,
    pub mel_bins: usize,
    pub dither: bool,
    pub frame_shift_ms: u32,
    pub frame_length_ms: u32,
    /// Raw frames stacked per LFR output frame.
    pub lfr_m: usize,
    /// Stride in raw frames between LFR output frames.
    pub lfr_n: usize,
}

/// FSMN encoder geometry, fixed by the scorer model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    pub fsmn_layers: usize,
    pub proj_dim: usize,
    pub lorder: usize,
}

/// Score-to-segment decision configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostConfig {
    pub speech_threshold: f32,
    pub sil_to_speech_ms: u32,
    pub max_end_silence_ms: u32,
    pub energy_floor: f32,
}

/// Chunking and batching configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub max_chunk_frames: usize,
    pub batch_size: usize,
    pub tail_padding_secs: u32,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            mel_bins: defaults::MEL_BINS,
            dither: false,
            frame_shift_ms: defaults::FRAME_SHIFT_MS,
            frame_length_ms: defaults::FRAME_LENGTH_MS,
            lfr_m: defaults::LFR_M,
            lfr_n: defaults::LFR_N,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            fsmn_layers: defaults::FSMN_LAYERS,
            proj_dim: defaults::PROJ_DIM,
            lorder: defaults::LORDER,
        }
    }
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            speech_threshold: defaults::SPEECH_THRESHOLD,
            sil_to_speech_ms: defaults::SIL_TO_SPEECH_MS,
            max_end_silence_ms: defaults::MAX_END_SILENCE_MS,
            energy_floor: defaults::ENERGY_FLOOR,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_chunk_frames: defaults::MAX_CHUNK_FRAMES,
            batch_size: defaults::BATCH_SIZE,
            tail_padding_secs: defaults::TAIL_PADDING_SECS,
        }
    }
}

impl FrontendConfig {
    /// Filterbank frame shift in samples.
    pub fn frame_shift_samples(&self) -> usize {
        (self.sample_rate / 1000 * self.frame_shift_ms) as usize
    }

    /// Filterbank frame length in samples.
    pub fn frame_length_samples(&self) -> usize {
        (self.sample_rate / 1000 * self.frame_length_ms) as usize
    }

    /// Width of one LFR-stacked feature frame.
    pub fn feature_dim(&self) -> usize {
        self.mel_bins * self.lfr_m
    }

    /// Duration of one LFR output frame in milliseconds.
    pub fn lfr_frame_ms(&self) -> u32 {
        self.frame_shift_ms * self.lfr_n as u32
    }
}

impl EncoderConfig {
    /// Values cached per FSMN layer, logical shape `[1, proj_dim, lorder-1, 1]`.
    pub fn cache_len(&self) -> usize {
        self.proj_dim * (self.lorder - 1)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check dimensional and range consistency across sections.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> VadError {
            VadError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.frontend.sample_rate == 0 || self.frontend.sample_rate % 1000 != 0 {
            return Err(invalid("sample_rate", "must be a positive multiple of 1000"));
        }
        if self.frontend.mel_bins == 0 {
            return Err(invalid("mel_bins", "must be positive"));
        }
        if self.frontend.lfr_m == 0 {
            return Err(invalid("lfr_m", "must be positive"));
        }
        if self.frontend.lfr_n == 0 {
            return Err(invalid("lfr_n", "must be positive"));
        }
        if self.frontend.frame_shift_ms == 0 {
            return Err(invalid("frame_shift_ms", "must be positive"));
        }
        if self.frontend.frame_length_ms < self.frontend.frame_shift_ms {
            return Err(invalid(
                "frame_length_ms",
                "must be at least frame_shift_ms",
            ));
        }
        if self.encoder.fsmn_layers == 0 {
            return Err(invalid("fsmn_layers", "must be positive"));
        }
        if self.encoder.lorder < 2 {
            return Err(invalid("lorder", "must be at least 2"));
        }
        if self.encoder.proj_dim == 0 {
            return Err(invalid("proj_dim", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.post.speech_threshold) {
            return Err(invalid("speech_threshold", "must be within 0.0..=1.0"));
        }
        if self.runtime.max_chunk_frames == 0 {
            return Err(invalid("max_chunk_frames", "must be positive"));
        }
        if self.runtime.batch_size == 0 {
            return Err(invalid("batch_size", "must be positive"));
        }
        Ok(())
    }

    /// Samples covered by one LFR output frame, the frame↔sample stride.
    ///
    /// This is the single place the stride is derived; everything that maps
    /// frame indices to sample offsets goes through [`crate::FrameSampleMapper`].
    pub fn samples_per_frame(&self) -> usize {
        self.frontend.frame_shift_samples() * self.frontend.lfr_n
    }

    /// Debounce threshold in LFR frames before a segment opens.
    pub fn sil_to_speech_frames(&self) -> usize {
        (self.post.sil_to_speech_ms / self.frontend.lfr_frame_ms()).max(1) as usize
    }

    /// Hangover window in LFR frames before an open segment closes.
    pub fn max_end_silence_frames(&self) -> usize {
        (self.post.max_end_silence_ms / self.frontend.lfr_frame_ms()).max(1) as usize
    }

    /// Synthetic silent tail length in samples for streaming mode.
    pub fn tail_padding_samples(&self) -> usize {
        (self.runtime.tail_padding_secs * self.frontend.sample_rate) as usize
    }
}
