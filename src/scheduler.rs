//! Chunk scheduler.
//!
//! Splits one utterance's feature sequence into bounded chunks for
//! successive scorer calls. The horizon is the micro-batch maximum frame
//! count: members that run out of features early emit fixed-width
//! all-silence placeholder chunks so chunk counts stay aligned across the
//! batch. Each chunk carries the matching waveform slice bounds via the
//! frame↔sample stride.

use crate::config::Config;
use crate::defaults;
use crate::frontend::FeatureSequence;
use crate::segment::FrameSampleMapper;
use std::ops::Range;

/// One scorer invocation's worth of features.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Frame offset of this chunk within the utterance.
    pub offset: usize,
    /// Frames in this chunk.
    pub num_frames: usize,
    /// `num_frames * dim` floats; zeros for a placeholder.
    pub features: Vec<f32>,
    /// Terminal chunk of the utterance.
    pub is_final: bool,
    /// All-silence stand-in emitted past this utterance's feature end.
    pub is_placeholder: bool,
    /// Waveform slice covered by this chunk, clipped to available samples.
    pub sample_range: Range<usize>,
}

/// Ordered chunk iterator for one utterance.
pub struct ChunkScheduler<'a> {
    features: &'a FeatureSequence,
    waveform_len: usize,
    horizon: usize,
    step: usize,
    mapper: FrameSampleMapper,
    /// Samples one frame extends past its shift (window tail).
    frame_tail: usize,
    offset: usize,
    stopped: bool,
}

impl<'a> ChunkScheduler<'a> {
    /// Create a scheduler.
    ///
    /// `horizon` is the frame count the chunk stream must cover — the
    /// maximum feature length across the micro-batch. A zero horizon still
    /// yields exactly one terminal (placeholder) chunk.
    pub fn new(
        features: &'a FeatureSequence,
        waveform_len: usize,
        horizon: usize,
        config: &Config,
    ) -> Self {
        let horizon = horizon.max(1);
        let frontend = &config.frontend;
        Self {
            features,
            waveform_len,
            horizon,
            step: config.runtime.max_chunk_frames.min(horizon),
            mapper: FrameSampleMapper::new(config.samples_per_frame()),
            frame_tail: frontend
                .frame_length_samples()
                .saturating_sub(frontend.frame_shift_samples()),
            offset: 0,
            stopped: false,
        }
    }
}

impl Iterator for ChunkScheduler<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.stopped || self.offset >= self.horizon {
            return None;
        }

        let offset = self.offset;
        let mut step = self.step;
        let mut is_final = false;
        if offset + step >= self.horizon - 1 {
            step = self.horizon - offset;
            is_final = true;
        }

        let available = self.features.num_frames().saturating_sub(offset);
        let chunk = if available == 0 {
            // Feature sequence exhausted but the batch horizon is not:
            // stand in with silence so chunk counts stay aligned.
            let num_frames = defaults::PLACEHOLDER_FRAMES;
            Chunk {
                offset,
                num_frames,
                features: vec![0.0; num_frames * self.features.dim()],
                is_final,
                is_placeholder: true,
                sample_range: 0..0,
            }
        } else {
            let num_frames = available.min(step);
            let start = self.mapper.sample_offset(offset);
            let end = (self.mapper.sample_offset(offset + num_frames) + self.frame_tail)
                .min(self.waveform_len);
            if end <= start {
                // No waveform left to cover this chunk; stop scheduling,
                // prior confirmed segments stand.
                self.stopped = true;
                return None;
            }
            Chunk {
                offset,
                num_frames,
                features: self.features.frames(offset, num_frames).to_vec(),
                is_final,
                is_placeholder: false,
                sample_range: start..end,
            }
        };

        debug_assert!(step > 0);
        self.offset = offset + step;
        if is_final {
            self.stopped = true;
        }
        Some(chunk)
    }
}
