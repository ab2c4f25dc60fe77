//! Segment types and frame↔sample coordinate mapping.

use tracing::warn;

/// A confirmed speech region in LFR frame coordinates, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSegment {
    pub start_frame: usize,
    pub end_frame: usize,
}

impl SpeechSegment {
    /// Width in frames.
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    /// Returns true if the segment covers no frames.
    pub fn is_empty(&self) -> bool {
        self.end_frame <= self.start_frame
    }
}

/// Per-utterance detection result: ordered frame-index segments plus the
/// matching sample-accurate waveform slices.
#[derive(Debug, Clone, Default)]
pub struct SegmentEntity {
    pub segments: Vec<SpeechSegment>,
    pub waveforms: Vec<Vec<f32>>,
}

impl SegmentEntity {
    /// Returns true if no segments were detected.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Frame-index to sample-offset conversion.
///
/// The stride is derived once from configuration
/// ([`crate::Config::samples_per_frame`]); every frame↔sample conversion in
/// the crate goes through this type.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampleMapper {
    samples_per_frame: usize,
}

impl FrameSampleMapper {
    /// Create a mapper with the given stride.
    pub fn new(samples_per_frame: usize) -> Self {
        assert!(samples_per_frame > 0, "frame stride must be positive");
        Self { samples_per_frame }
    }

    /// Sample offset of a frame index. Strictly increasing.
    pub fn sample_offset(&self, frame: usize) -> usize {
        frame * self.samples_per_frame
    }

    /// The derived stride in samples.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Slice the waveform samples covered by a segment.
    ///
    /// The end offset is clipped to `true_len` (the waveform length before
    /// any synthetic streaming tail padding), discarding ranges that fall
    /// inside the padding. A clipped non-positive width yields `None`
    /// rather than an empty slice.
    pub fn slice(
        &self,
        waveform: &[f32],
        segment: &SpeechSegment,
        true_len: usize,
    ) -> Option<Vec<f32>> {
        let start = self.sample_offset(segment.start_frame);
        let end = self
            .sample_offset(segment.end_frame)
            .min(true_len)
            .min(waveform.len());
        if end <= start {
            warn!(
                start_frame = segment.start_frame,
                end_frame = segment.end_frame,
                "segment collapsed to a non-positive sample range, dropping slice"
            );
            return None;
        }
        Some(waveform[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_offset_is_strictly_increasing() {
        let mapper = FrameSampleMapper::new(160);
        let mut prev = None;
        for frame in 0..100 {
            let offset = mapper.sample_offset(frame);
            if let Some(p) = prev {
                assert!(offset > p);
            }
            prev = Some(offset);
        }
    }

    #[test]
    fn test_sample_offset_uses_stride() {
        let mapper = FrameSampleMapper::new(160);
        assert_eq!(mapper.sample_offset(0), 0);
        assert_eq!(mapper.sample_offset(10), 1600);
    }

    #[test]
    fn test_slice_maps_segment_to_samples() {
        let mapper = FrameSampleMapper::new(10);
        let waveform: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let segment = SpeechSegment {
            start_frame: 2,
            end_frame: 4,
        };
        let slice = mapper.slice(&waveform, &segment, waveform.len()).unwrap();
        assert_eq!(slice.len(), 20);
        assert_eq!(slice[0], 20.0);
        assert_eq!(slice[19], 39.0);
    }

    #[test]
    fn test_slice_clips_to_true_length() {
        let mapper = FrameSampleMapper::new(10);
        // 50 true samples plus 50 of synthetic padding.
        let waveform = vec![0.0; 100];
        let segment = SpeechSegment {
            start_frame: 3,
            end_frame: 9,
        };
        let slice = mapper.slice(&waveform, &segment, 50).unwrap();
        assert_eq!(slice.len(), 20); // 30..50, padding discarded
    }

    #[test]
    fn test_slice_entirely_inside_padding_is_dropped() {
        let mapper = FrameSampleMapper::new(10);
        let waveform = vec![0.0; 100];
        let segment = SpeechSegment {
            start_frame: 6,
            end_frame: 8,
        };
        assert!(mapper.slice(&waveform, &segment, 50).is_none());
    }

    #[test]
    fn test_slice_clips_to_waveform_length() {
        let mapper = FrameSampleMapper::new(10);
        let waveform = vec![0.0; 35];
        let segment = SpeechSegment {
            start_frame: 0,
            end_frame: 10,
        };
        let slice = mapper.slice(&waveform, &segment, 100).unwrap();
        assert_eq!(slice.len(), 35);
    }

    #[test]
    fn test_segment_len() {
        let segment = SpeechSegment {
            start_frame: 5,
            end_frame: 12,
        };
        assert_eq!(segment.len(), 7);
        assert!(!segment.is_empty());
    }

    #[test]
    fn test_entity_default_is_empty() {
        let entity = SegmentEntity::default();
        assert!(entity.is_empty());
    }
}
