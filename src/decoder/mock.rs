//! Mock decoder for running the bridge without a radio decode routine.

use std::time::Duration;

use super::{AudioOut, DecodeCounters, Decoder, FRAME_SAMPLES};
use crate::format::f32_to_i16;
use crate::DecoderConfig;

/// What a [`MockDecoder`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockOutput {
    /// Never emits audio, like a decoder still hunting for sync.
    Silent,
    /// Emits this many samples on every decode step.
    Fixed(usize),
    /// Emits one voice frame per this many consumed input samples.
    VoiceFrames(usize),
    /// Converts every consumed input sample straight to i16.
    Echo,
}

/// A synthetic decoder for tests and demos.
///
/// It consumes input the way a real decoder would (all of it, or at most a
/// configured step per call) and emits predictable audio.
///
/// # Example
///
/// ```
/// use dsd_bridge::decoder::MockDecoder;
/// use std::time::Duration;
///
/// // One 160-sample voice frame per 960 input samples (48kHz in, 8kHz out)
/// let decoder = MockDecoder::voice_frames(960)
///     .with_step_limit(480)
///     .with_delay(Duration::from_millis(1));
/// ```
#[derive(Debug, Clone)]
pub struct MockDecoder {
    output: MockOutput,
    step_limit: Option<usize>,
    delay: Option<Duration>,
    /// Consumed input not yet turned into a voice frame.
    pending_input: usize,
    /// Input samples not yet counted as a whole symbol.
    partial_symbol: u64,
    /// Phase of the synthetic tone, in samples.
    phase: usize,
    counters: DecodeCounters,
}

impl MockDecoder {
    fn with_output(output: MockOutput) -> Self {
        Self {
            output,
            step_limit: None,
            delay: None,
            pending_input: 0,
            partial_symbol: 0,
            phase: 0,
            counters: DecodeCounters::default(),
        }
    }

    /// A decoder that consumes input but never produces audio.
    #[must_use]
    pub fn silent() -> Self {
        Self::with_output(MockOutput::Silent)
    }

    /// A decoder that emits `samples` samples on every decode step.
    #[must_use]
    pub fn fixed(samples: usize) -> Self {
        Self::with_output(MockOutput::Fixed(samples))
    }

    /// A decoder that emits a 160-sample voice frame per `input_per_frame`
    /// consumed input samples.
    ///
    /// # Panics
    ///
    /// Panics if `input_per_frame` is zero.
    #[must_use]
    pub fn voice_frames(input_per_frame: usize) -> Self {
        assert!(input_per_frame > 0, "input_per_frame must be non-zero");
        Self::with_output(MockOutput::VoiceFrames(input_per_frame))
    }

    /// A decoder that echoes its input as i16 audio, one sample per sample.
    #[must_use]
    pub fn echo() -> Self {
        Self::with_output(MockOutput::Echo)
    }

    /// Consume at most `samples` input samples per decode step.
    ///
    /// # Panics
    ///
    /// Panics if `samples` is zero.
    #[must_use]
    pub fn with_step_limit(mut self, samples: usize) -> Self {
        assert!(samples > 0, "step limit must be non-zero");
        self.step_limit = Some(samples);
        self
    }

    /// Sleep for `delay` on every decode step.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn tone_sample(&mut self) -> i16 {
        // 8 samples per period: a 1kHz tone at 8kHz
        const TABLE: [i16; 8] = [0, 7071, 10000, 7071, 0, -7071, -10000, -7071];
        let sample = TABLE[self.phase % TABLE.len()];
        self.phase = self.phase.wrapping_add(1);
        sample
    }

    fn count_symbols(&mut self, config: &DecoderConfig, consumed: usize) {
        let per_symbol = u64::from(config.timing.samples_per_symbol.max(1));
        let total = self.partial_symbol + consumed as u64;
        self.counters.symbols += total / per_symbol;
        self.partial_symbol = total % per_symbol;
    }
}

impl Decoder for MockDecoder {
    fn name(&self) -> &'static str {
        match self.output {
            MockOutput::Silent => "mock-silent",
            MockOutput::Fixed(_) => "mock-fixed",
            MockOutput::VoiceFrames(_) => "mock-voice",
            MockOutput::Echo => "mock-echo",
        }
    }

    fn decode(&mut self, config: &DecoderConfig, input: &[f32], audio: &mut AudioOut<'_>) -> usize {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let consumed = self.step_limit.map_or(input.len(), |limit| input.len().min(limit));
        let input = &input[..consumed];

        match self.output {
            MockOutput::Silent => {}
            MockOutput::Fixed(samples) => {
                for _ in 0..samples {
                    let sample = self.tone_sample();
                    audio.push(sample);
                }
            }
            MockOutput::VoiceFrames(input_per_frame) => {
                self.pending_input += consumed;
                while self.pending_input >= input_per_frame {
                    self.pending_input -= input_per_frame;
                    for _ in 0..FRAME_SAMPLES {
                        let sample = self.tone_sample();
                        audio.push(sample);
                    }
                }
            }
            MockOutput::Echo => {
                for &sample in input {
                    audio.push(f32_to_i16(sample));
                }
            }
        }

        self.count_symbols(config, consumed);
        consumed
    }

    fn reset(&mut self) {
        self.pending_input = 0;
        self.partial_symbol = 0;
        self.phase = 0;
        self.counters = DecodeCounters::default();
    }

    fn counters(&self) -> DecodeCounters {
        self.counters
    }
}
