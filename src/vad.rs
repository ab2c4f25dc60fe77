//! FSMN VAD engine.
//!
//! Drives the full pipeline for micro-batches of independent utterances:
//! frontend features, chunk scheduling with recurrent cache handoff, the
//! decision state machine, and frame→sample mapping of the confirmed
//! segments. The scorer is shared read-only across utterance threads; each
//! utterance owns its cache and decision state.

use crate::cache::CacheSet;
use crate::config::Config;
use crate::decision::{DecisionConfig, DecisionMachine, Latency};
use crate::error::{Result, VadError};
use crate::frontend::{FeatureSequence, Frontend};
use crate::scheduler::ChunkScheduler;
use crate::scorer::Scorer;
use crate::segment::{FrameSampleMapper, SegmentEntity};
use std::sync::Arc;
use tracing::warn;

/// Per-call detection options.
#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Override the configured hangover window, in milliseconds.
    /// The original exposes this as a speech-speed adjustment.
    pub max_end_silence_ms: Option<u32>,
    /// When confirmed segments surface from the decision machine.
    pub latency: Latency,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            max_end_silence_ms: None,
            latency: Latency::Offline,
        }
    }
}

/// Streaming voice-activity detector.
pub struct FsmnVad {
    frontend: Frontend,
    scorer: Arc<dyn Scorer>,
    config: Config,
}

impl FsmnVad {
    /// Create an engine from a validated configuration.
    pub fn new(frontend: Frontend, scorer: Arc<dyn Scorer>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            frontend,
            scorer,
            config,
        })
    }

    /// Configuration in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Detect segments with one whole-utterance chunk per utterance.
    ///
    /// Every chunk is terminal, so the decision machine flushes
    /// immediately — batch semantics.
    pub fn segments(&self, utterances: &[Vec<f32>]) -> Result<Vec<SegmentEntity>> {
        self.segments_with(utterances, false, &DetectOptions::default())
    }

    /// Detect segments chunk by chunk with recurrent cache handoff.
    ///
    /// Waveforms get a synthetic silent tail so the chunk stream reaches
    /// the terminal flush; emitted slices are clipped back to the true
    /// waveform length.
    pub fn segments_streaming(&self, utterances: &[Vec<f32>]) -> Result<Vec<SegmentEntity>> {
        self.segments_with(utterances, true, &DetectOptions::default())
    }

    /// Detect segments with explicit chunking mode and options.
    pub fn segments_with(
        &self,
        utterances: &[Vec<f32>],
        streaming: bool,
        options: &DetectOptions,
    ) -> Result<Vec<SegmentEntity>> {
        let mut results = Vec::with_capacity(utterances.len());
        let batch_size = self.config.runtime.batch_size.max(1);
        for batch in utterances.chunks(batch_size) {
            results.extend(self.run_batch(batch, streaming, options)?);
        }
        Ok(results)
    }

    fn run_batch(
        &self,
        batch: &[Vec<f32>],
        streaming: bool,
        options: &DetectOptions,
    ) -> Result<Vec<SegmentEntity>> {
        // Features are extracted up front: the batch horizon (maximum
        // feature length) governs every member's chunk count.
        let mut prepared = Vec::with_capacity(batch.len());
        for waveform in batch {
            prepared.push(self.prepare(waveform, streaming)?);
        }
        let horizon = prepared
            .iter()
            .map(|u| u.features.num_frames())
            .max()
            .unwrap_or(0);

        if prepared.len() == 1 {
            let utterance = prepared.pop().ok_or_else(|| {
                VadError::Other("empty micro-batch".to_string())
            })?;
            return Ok(vec![self.run_utterance(utterance, horizon, streaming, options)?]);
        }

        // Independent utterances fan out to scoped threads; each owns its
        // cache and decision machine, the scorer is shared read-only.
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::scope(|scope| {
            for (index, utterance) in prepared.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = self.run_utterance(utterance, horizon, streaming, options);
                    if tx.send((index, result)).is_err() {
                        // Receiver lives until every sender is done; this
                        // only fires if the batch already failed.
                        warn!("result channel closed before utterance completed");
                    }
                });
            }
        });
        drop(tx);

        let mut collected: Vec<Option<SegmentEntity>> = (0..batch.len()).map(|_| None).collect();
        for (index, result) in rx {
            collected[index] = Some(result?);
        }
        collected
            .into_iter()
            .map(|entry| entry.ok_or_else(|| VadError::Other("utterance thread lost".to_string())))
            .collect()
    }

    fn prepare(&self, waveform: &[f32], streaming: bool) -> Result<PreparedUtterance> {
        let true_len = waveform.len();
        let samples = if streaming {
            let mut padded = Vec::with_capacity(true_len + self.config.tail_padding_samples());
            padded.extend_from_slice(waveform);
            padded.resize(true_len + self.config.tail_padding_samples(), 0.0);
            padded
        } else {
            waveform.to_vec()
        };
        let features = self.frontend.extract(&samples)?;
        Ok(PreparedUtterance {
            samples,
            true_len,
            features,
        })
    }

    fn run_utterance(
        &self,
        utterance: PreparedUtterance,
        horizon: usize,
        streaming: bool,
        options: &DetectOptions,
    ) -> Result<SegmentEntity> {
        let PreparedUtterance {
            samples,
            true_len,
            features,
        } = utterance;

        // Whole-utterance mode is the degenerate schedule: one terminal chunk.
        let mut schedule_config = self.config.clone();
        if !streaming {
            schedule_config.runtime.max_chunk_frames = horizon.max(1);
        }

        let mut decision_config = DecisionConfig::from_config(&self.config, options.latency);
        if let Some(ms) = options.max_end_silence_ms {
            let frames = (ms / self.config.frontend.lfr_frame_ms()) as usize;
            decision_config = decision_config.with_max_end_silence_frames(frames);
        }

        let mut cache = CacheSet::new(&self.config.encoder);
        let mut machine = DecisionMachine::new(decision_config);

        for chunk in ChunkScheduler::new(&features, samples.len(), horizon, &schedule_config) {
            let output = match self.scorer.score(&chunk.features, chunk.num_frames, &cache) {
                Ok(output) => output,
                Err(e) => {
                    // Recovered at utterance granularity: stop scheduling
                    // further chunks, prior confirmed segments stand.
                    warn!(error = %e, "scorer failed, abandoning remaining chunks");
                    break;
                }
            };
            if output.scores.len() != chunk.num_frames {
                warn!(
                    expected = chunk.num_frames,
                    actual = output.scores.len(),
                    "scorer returned unusable score count, abandoning remaining chunks"
                );
                break;
            }
            cache.replace(output.out_cache)?;
            machine.advance(&output.scores, &samples[chunk.sample_range.clone()], chunk.is_final);
        }

        let mapper = FrameSampleMapper::new(self.config.samples_per_frame());
        let mut entity = SegmentEntity::default();
        for segment in machine.into_confirmed() {
            // Slices collapsing inside the synthetic tail are dropped with
            // their segments; the mapper logs the degenerate case.
            if let Some(slice) = mapper.slice(&samples, &segment, true_len) {
                entity.segments.push(segment);
                entity.waveforms.push(slice);
            }
        }
        Ok(entity)
    }
}

struct PreparedUtterance {
    samples: Vec<f32>,
    true_len: usize,
    features: FeatureSequence,
}
