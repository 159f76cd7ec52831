//! Decoder abstraction.
//!
//! A [`Decoder`] is the free-running decode routine the bridge drives. It
//! runs on the bridge's dedicated decoder thread, reads whatever input the
//! current call posted, and writes decoded 16-bit audio through an
//! [`AudioOut`] at its own pace. The bridge never calls it from the host
//! thread.

mod mock;

pub use mock::MockDecoder;

use ringbuf::traits::Producer;
use ringbuf::HeapProd;

use crate::DecoderConfig;

/// Samples in one decoded voice frame (20ms at 8kHz).
pub const FRAME_SAMPLES: usize = 160;

/// Diagnostic counters a decoder keeps about the signal it sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeCounters {
    /// Voice frames with uncorrectable errors.
    pub audio_errors: u64,
    /// Frame headers that needed correction.
    pub header_errors: u64,
    /// Frame headers that could not be corrected.
    pub header_critical_errors: u64,
    /// Symbols demodulated since the last reset.
    pub symbols: u64,
}

/// Write side of the decoded audio accumulator.
///
/// Samples that do not fit are dropped and counted; the bridge reports them
/// as [`BridgeEvent::AudioOverflow`](crate::BridgeEvent::AudioOverflow).
pub struct AudioOut<'a> {
    producer: &'a mut HeapProd<i16>,
    dropped: &'a mut u64,
    written: usize,
}

impl<'a> AudioOut<'a> {
    pub(crate) fn new(producer: &'a mut HeapProd<i16>, dropped: &'a mut u64) -> Self {
        Self {
            producer,
            dropped,
            written: 0,
        }
    }

    /// Appends one decoded sample.
    pub fn push(&mut self, sample: i16) {
        if self.producer.try_push(sample).is_ok() {
            self.written += 1;
        } else {
            *self.dropped += 1;
        }
    }

    /// Appends decoded samples, returning how many were accepted.
    pub fn push_samples(&mut self, samples: &[i16]) -> usize {
        let accepted = self.producer.push_slice(samples);
        self.written += accepted;
        *self.dropped += (samples.len() - accepted) as u64;
        accepted
    }

    /// Samples accepted through this writer so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }
}

/// A decode routine driven by the bridge's decoder thread.
///
/// # Implementation Notes
///
/// - `decode` is called repeatedly within one host call until the posted
///   input is used up; keep partial-symbol state inside the decoder
/// - Returning 0 while input remains ends the pass and discards the rest
///   of that chunk
/// - Producing no audio is normal (e.g. while still synchronizing)
/// - `decode` must return; a step that never returns stalls the stream
///
/// # Example
///
/// ```
/// use dsd_bridge::decoder::{AudioOut, Decoder};
/// use dsd_bridge::DecoderConfig;
///
/// struct Silence;
///
/// impl Decoder for Silence {
///     fn name(&self) -> &'static str {
///         "silence"
///     }
///
///     fn decode(
///         &mut self,
///         _config: &DecoderConfig,
///         input: &[f32],
///         _audio: &mut AudioOut<'_>,
///     ) -> usize {
///         input.len()
///     }
/// }
/// ```
pub trait Decoder: Send + 'static {
    /// Human-readable name for logging and events.
    fn name(&self) -> &str;

    /// Called once on the decoder thread before the first pass.
    fn on_start(&mut self, _config: &DecoderConfig) {}

    /// Decodes from `input`, returning how many input samples were consumed.
    fn decode(&mut self, config: &DecoderConfig, input: &[f32], audio: &mut AudioOut<'_>) -> usize;

    /// Clears filter history, heuristics and counters.
    fn reset(&mut self) {}

    /// Current diagnostic counters.
    fn counters(&self) -> DecodeCounters {
        DecodeCounters::default()
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_start(&mut self, config: &DecoderConfig) {
        (**self).on_start(config);
    }

    fn decode(&mut self, config: &DecoderConfig, input: &[f32], audio: &mut AudioOut<'_>) -> usize {
        (**self).decode(config, input, audio)
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn counters(&self) -> DecodeCounters {
        (**self).counters()
    }
}
