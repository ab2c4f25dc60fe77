//! Segmentation decision state machine.
//!
//! Converts a chunk-delivered stream of per-frame speech scores into
//! committed `[start, end)` segments. Hysteresis on both edges: a voiced
//! run must outlast a debounce window before a segment opens, and an open
//! segment only closes once the silence run reaches the hangover window,
//! with the end boundary back-dated to the last voiced frame. The machine
//! is independent of scheduler and scorer so it can be unit-tested in
//! isolation; chunks must arrive strictly in feature-time order.

use crate::config::Config;
use crate::segment::SpeechSegment;

/// When confirmed segments are surfaced from [`DecisionMachine::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Surface each segment in the call that confirms it.
    Online,
    /// Hold all segments back until the terminal flush.
    Offline,
}

/// Decision phase: no open segment, or one accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InSpeech,
}

/// Thresholds for the decision machine, in frame units.
#[derive(Debug, Clone, Copy)]
pub struct DecisionConfig {
    /// Score at or above which a frame can count as voiced.
    pub speech_threshold: f32,
    /// Voiced run length required before a segment opens.
    pub sil_to_speech_frames: usize,
    /// Silence run length after which an open segment closes.
    pub max_end_silence_frames: usize,
    /// Minimum RMS of a frame's sample span for it to count as voiced.
    pub energy_floor: f32,
    /// Samples covered by one frame, for the energy window.
    pub samples_per_frame: usize,
    pub latency: Latency,
}

impl DecisionConfig {
    /// Derive frame-unit thresholds from the pipeline configuration.
    pub fn from_config(config: &Config, latency: Latency) -> Self {
        Self {
            speech_threshold: config.post.speech_threshold,
            sil_to_speech_frames: config.sil_to_speech_frames(),
            max_end_silence_frames: config.max_end_silence_frames(),
            energy_floor: config.post.energy_floor,
            samples_per_frame: config.samples_per_frame(),
            latency,
        }
    }

    /// Override the hangover window, e.g. for a speech-speed adjustment.
    pub fn with_max_end_silence_frames(mut self, frames: usize) -> Self {
        self.max_end_silence_frames = frames.max(1);
        self
    }
}

/// Per-utterance decision state. Created at utterance start, fed every
/// chunk in order, discarded after the terminal flush.
pub struct DecisionMachine {
    config: DecisionConfig,
    phase: Phase,
    /// Absolute frame index of the next frame to consume.
    cursor: usize,
    speech_run: usize,
    silence_run: usize,
    open_start: usize,
    last_voiced: usize,
    confirmed: Vec<SpeechSegment>,
    /// First confirmed segment not yet surfaced to the caller.
    surfaced: usize,
    finished: bool,
}

impl DecisionMachine {
    /// Create a machine in the Idle phase.
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            cursor: 0,
            speech_run: 0,
            silence_run: 0,
            open_start: 0,
            last_voiced: 0,
            confirmed: Vec::new(),
            surfaced: 0,
            finished: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frames consumed so far.
    pub fn frames_consumed(&self) -> usize {
        self.cursor
    }

    /// True once the terminal flush has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// All segments confirmed so far, regardless of latency mode.
    ///
    /// Remains valid after a scorer failure cut the chunk stream short, so
    /// callers can preserve prior confirmations.
    pub fn confirmed(&self) -> &[SpeechSegment] {
        &self.confirmed
    }

    /// Consume the machine, returning every confirmed segment.
    pub fn into_confirmed(self) -> Vec<SpeechSegment> {
        self.confirmed
    }

    /// Feed one chunk of scores, a forward-time extension of the utterance.
    ///
    /// `waveform_span` holds the samples matching this chunk's frames; when
    /// it does not cover a frame (placeholder chunks), the energy veto is
    /// skipped for that frame. Returns the segments newly surfaced by this
    /// call per the latency mode.
    ///
    /// # Panics
    /// Panics if called after the terminal flush.
    pub fn advance(
        &mut self,
        scores: &[f32],
        waveform_span: &[f32],
        is_final: bool,
    ) -> Vec<SpeechSegment> {
        assert!(
            !self.finished,
            "advance called after the terminal flush committed"
        );

        for (i, &score) in scores.iter().enumerate() {
            let frame = self.cursor + i;
            let voiced = score >= self.config.speech_threshold
                && self.frame_has_energy(waveform_span, i);

            match self.phase {
                Phase::Idle => {
                    if voiced {
                        self.speech_run += 1;
                        if self.speech_run >= self.config.sil_to_speech_frames {
                            self.phase = Phase::InSpeech;
                            self.open_start = frame + 1 - self.speech_run;
                            self.last_voiced = frame;
                            self.silence_run = 0;
                        }
                    } else {
                        self.speech_run = 0;
                    }
                }
                Phase::InSpeech => {
                    if voiced {
                        self.last_voiced = frame;
                        self.silence_run = 0;
                    } else {
                        self.silence_run += 1;
                        if self.silence_run >= self.config.max_end_silence_frames {
                            // Back-date the end past the hangover.
                            let end = self.last_voiced + 1;
                            self.commit(self.open_start, end);
                            self.phase = Phase::Idle;
                            self.speech_run = 0;
                            self.silence_run = 0;
                        }
                    }
                }
            }
        }
        self.cursor += scores.len();

        if is_final {
            if self.phase == Phase::InSpeech && self.cursor > self.open_start {
                // Forced flush: close at the last available frame.
                self.commit(self.open_start, self.cursor);
                self.phase = Phase::Idle;
            }
            self.finished = true;
        }

        match self.config.latency {
            Latency::Online => self.drain_surfaced(),
            Latency::Offline if is_final => self.drain_surfaced(),
            Latency::Offline => Vec::new(),
        }
    }

    fn frame_has_energy(&self, waveform_span: &[f32], chunk_frame: usize) -> bool {
        let spf = self.config.samples_per_frame;
        let start = chunk_frame * spf;
        if start >= waveform_span.len() {
            // No samples cover this frame; scores decide alone.
            return true;
        }
        let end = (start + spf).min(waveform_span.len());
        let window = &waveform_span[start..end];
        let mean_square =
            window.iter().map(|&s| s as f64 * s as f64).sum::<f64>() / window.len() as f64;
        (mean_square.sqrt() as f32) >= self.config.energy_floor
    }

    fn commit(&mut self, start: usize, end: usize) {
        debug_assert!(end > start, "empty segment committed");
        if let Some(last) = self.confirmed.last() {
            debug_assert!(
                start >= last.end_frame,
                "segment boundaries must be strictly increasing and non-overlapping"
            );
        }
        self.confirmed.push(SpeechSegment {
            start_frame: start,
            end_frame: end,
        });
    }

    fn drain_surfaced(&mut self) -> Vec<SpeechSegment> {
        let newly = self.confirmed[self.surfaced..].to_vec();
        self.surfaced = self.confirmed.len();
        newly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DecisionConfig {
        DecisionConfig {
            speech_threshold: 0.5,
            sil_to_speech_frames: 3,
            max_end_silence_frames: 5,
            energy_floor: 0.0, // veto disabled unless a test enables it
            samples_per_frame: 4,
            latency: Latency::Online,
        }
    }

    fn loud_span(frames: usize) -> Vec<f32> {
        vec![0.5; frames * 4]
    }

    #[test]
    fn test_starts_idle() {
        let machine = DecisionMachine::new(test_config());
        assert_eq!(machine.phase(), Phase::Idle);
        assert!(!machine.is_finished());
    }

    #[test]
    fn test_short_spike_is_debounced() {
        let mut machine = DecisionMachine::new(test_config());
        // Two voiced frames, below the 3-frame debounce.
        let scores = [0.0, 0.9, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let emitted = machine.advance(&scores, &loud_span(scores.len()), true);
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_segment_start_is_backdated_to_run_start() {
        let mut machine = DecisionMachine::new(test_config());
        let mut scores = vec![0.0; 2];
        scores.extend(vec![0.9; 6]);
        machine.advance(&scores, &loud_span(scores.len()), false);
        assert_eq!(machine.phase(), Phase::InSpeech);
        // The run began at frame 2 even though confirmation came at frame 4.
        let emitted = machine.advance(&[], &[], true);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].start_frame, 2);
    }

    #[test]
    fn test_hangover_backdates_end_to_last_voiced() {
        let mut machine = DecisionMachine::new(test_config());
        let mut scores = vec![0.9; 4]; // frames 0..4 voiced
        scores.extend(vec![0.0; 6]); // silence run reaches 5 at frame 8
        let emitted = machine.advance(&scores, &loud_span(scores.len()), false);
        assert_eq!(emitted.len(), 1);
        assert_eq!(
            emitted[0],
            SpeechSegment {
                start_frame: 0,
                end_frame: 4
            }
        );
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_brief_silence_does_not_close_segment() {
        let mut machine = DecisionMachine::new(test_config());
        let mut scores = vec![0.9; 4];
        scores.extend(vec![0.0; 3]); // below the 5-frame hangover
        scores.extend(vec![0.9; 2]);
        let emitted = machine.advance(&scores, &loud_span(scores.len()), false);
        assert!(emitted.is_empty());
        assert_eq!(machine.phase(), Phase::InSpeech);
    }

    #[test]
    fn test_forced_flush_closes_open_segment_at_last_frame() {
        let mut machine = DecisionMachine::new(test_config());
        let scores = vec![0.9; 6];
        let emitted = machine.advance(&scores, &loud_span(6), true);
        assert_eq!(emitted.len(), 1);
        assert_eq!(
            emitted[0],
            SpeechSegment {
                start_frame: 0,
                end_frame: 6
            }
        );
        assert!(machine.is_finished());
    }

    #[test]
    fn test_state_persists_across_chunks() {
        let mut machine = DecisionMachine::new(test_config());
        // Voiced run split across two calls: 2 frames then 2 frames.
        machine.advance(&[0.9, 0.9], &loud_span(2), false);
        assert_eq!(machine.phase(), Phase::Idle);
        machine.advance(&[0.9, 0.9], &loud_span(2), false);
        assert_eq!(machine.phase(), Phase::InSpeech);
        let emitted = machine.advance(&[], &[], true);
        assert_eq!(emitted[0].start_frame, 0);
        assert_eq!(emitted[0].end_frame, 4);
    }

    #[test]
    fn test_multiple_segments_strictly_increasing() {
        let mut machine = DecisionMachine::new(test_config());
        let mut scores = vec![0.9; 4];
        scores.extend(vec![0.0; 6]);
        scores.extend(vec![0.9; 4]);
        let emitted = machine.advance(&scores, &loud_span(scores.len()), true);
        assert_eq!(emitted.len(), 2);
        assert!(emitted[0].end_frame <= emitted[1].start_frame);
        assert!(emitted[0].start_frame < emitted[0].end_frame);
        assert!(emitted[1].start_frame < emitted[1].end_frame);
    }

    #[test]
    fn test_offline_holds_segments_until_final() {
        let config = DecisionConfig {
            latency: Latency::Offline,
            ..test_config()
        };
        let mut machine = DecisionMachine::new(config);
        let mut scores = vec![0.9; 4];
        scores.extend(vec![0.0; 6]);
        let emitted = machine.advance(&scores, &loud_span(scores.len()), false);
        assert!(emitted.is_empty());
        assert_eq!(machine.confirmed().len(), 1);

        let emitted = machine.advance(&[0.0; 2], &loud_span(2), true);
        assert_eq!(emitted.len(), 1);
    }

    #[test]
    fn test_online_and_offline_confirm_identical_sets() {
        let mut scores = vec![0.0; 2];
        scores.extend(vec![0.9; 5]);
        scores.extend(vec![0.0; 7]);
        scores.extend(vec![0.9; 4]);

        let run = |latency| {
            let config = DecisionConfig {
                latency,
                ..test_config()
            };
            let mut machine = DecisionMachine::new(config);
            machine.advance(&scores, &loud_span(scores.len()), true);
            machine.into_confirmed()
        };
        assert_eq!(run(Latency::Online), run(Latency::Offline));
    }

    #[test]
    fn test_energy_veto_blocks_silent_waveform() {
        let config = DecisionConfig {
            energy_floor: 1.0e-4,
            ..test_config()
        };
        let mut machine = DecisionMachine::new(config);
        // High scores over an all-zero waveform span must not open a segment.
        let scores = vec![0.9; 10];
        let emitted = machine.advance(&scores, &vec![0.0; 40], true);
        assert!(emitted.is_empty());
    }

    #[test]
    fn test_energy_veto_skipped_without_samples() {
        let config = DecisionConfig {
            energy_floor: 1.0e-4,
            ..test_config()
        };
        let mut machine = DecisionMachine::new(config);
        // Placeholder chunks carry no samples; scores decide alone.
        let emitted = machine.advance(&[0.9; 6], &[], true);
        assert_eq!(emitted.len(), 1);
    }

    #[test]
    #[should_panic(expected = "terminal flush")]
    fn test_advance_after_terminal_flush_panics() {
        let mut machine = DecisionMachine::new(test_config());
        machine.advance(&[0.0; 2], &loud_span(2), true);
        machine.advance(&[0.0; 2], &loud_span(2), false);
    }

    #[test]
    fn test_confirmed_survive_abandoned_stream() {
        let mut machine = DecisionMachine::new(test_config());
        let mut scores = vec![0.9; 4];
        scores.extend(vec![0.0; 6]);
        machine.advance(&scores, &loud_span(scores.len()), false);
        // Stream cut short (scorer failure): confirmed segments stand.
        assert_eq!(machine.confirmed().len(), 1);
    }
}
