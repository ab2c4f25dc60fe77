//! fsmn-vad - Streaming FSMN voice activity detection
//!
//! Consumes raw PCM audio and emits sample-accurate speech segment
//! boundaries for downstream recognition. The acoustic scorer and the
//! filterbank DSP are external collaborators behind traits; everything
//! else — feature assembly, chunked recurrent-cache scheduling, the
//! score-to-segment decision state machine, and frame↔sample mapping —
//! lives here.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod cache;
pub mod config;
pub mod decision;
pub mod defaults;
pub mod error;
pub mod frontend;
pub mod scheduler;
pub mod scorer;
pub mod segment;
pub mod vad;

// External seams (scorer and DSP implementations plug in here)
pub use frontend::fbank::{FilterBank, MockFilterBank};
pub use scorer::{MockScorer, Scorer, ScorerOutput};

// Pipeline
pub use cache::CacheSet;
pub use decision::{DecisionConfig, DecisionMachine, Latency, Phase};
pub use frontend::cmvn::CmvnStats;
pub use frontend::{FeatureSequence, Frontend};
pub use scheduler::{Chunk, ChunkScheduler};
pub use segment::{FrameSampleMapper, SegmentEntity, SpeechSegment};
pub use vad::{DetectOptions, FsmnVad};

// Error handling
pub use error::{Result, VadError};

// Config
pub use config::{Config, EncoderConfig, FrontendConfig, PostConfig, RuntimeConfig};
