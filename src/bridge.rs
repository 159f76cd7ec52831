//! The host-facing bridge and its statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::builder::DecodeBridgeBuilder;
use crate::decoder::{DecodeCounters, Decoder, FRAME_SAMPLES};
use crate::format::write_i16_as_f32;
use crate::pipeline::{InputRequest, SharedChannel};
use crate::{BridgeError, BridgeOptions, BridgeParams, DecoderConfig};

/// Statistics about a bridge instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Completed `process` calls.
    pub calls: u64,
    /// Input samples reported as consumed.
    pub samples_consumed: u64,
    /// Output samples reported as produced.
    pub samples_produced: u64,
    /// Decoded samples dropped because the audio buffer was full.
    pub overflowed_samples: u64,
    /// Decode passes that ended before their input was used up.
    pub stalled_passes: u64,
    /// Decoder resets performed.
    pub resets: u64,
}

/// Counters shared between the bridge and its decoder thread.
pub(crate) struct BridgeState {
    pub calls: AtomicU64,
    pub samples_consumed: AtomicU64,
    pub samples_produced: AtomicU64,
    pub overflowed_samples: AtomicU64,
    pub stalled_passes: AtomicU64,
    pub resets: AtomicU64,
}

impl BridgeState {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            samples_consumed: AtomicU64::new(0),
            samples_produced: AtomicU64::new(0),
            overflowed_samples: AtomicU64::new(0),
            stalled_passes: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }
}

/// Outcome of one [`DecodeBridge::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkResult {
    /// Input samples consumed. Always the full input length.
    pub consumed: usize,
    /// Output samples produced, written to the front of the output buffer.
    pub produced: usize,
}

/// Bridge between a pull-based host stream and a free-running decoder thread.
///
/// Each [`process`](DecodeBridge::process) call hands one input chunk to the
/// decoder thread, blocks until that thread has decoded it, and copies back
/// whatever audio is ready, up to the size of the output buffer.
///
/// # Lifecycle
///
/// 1. Built by [`DecodeBridgeBuilder::start()`], which spawns the decoder thread
/// 2. The host calls `process` once per scheduling cycle
/// 3. [`close()`](DecodeBridge::close) stops the decoder thread and waits for
///    it to acknowledge; dropping the bridge does the same
///
/// # Example
///
/// ```
/// use dsd_bridge::decoder::MockDecoder;
/// use dsd_bridge::{DecodeBridge, FrameMode};
///
/// let mut bridge = DecodeBridge::builder()
///     .frame_mode(FrameMode::P25Phase1)
///     .decoder(MockDecoder::fixed(40))
///     .start()?;
///
/// let input = vec![0.0f32; 256];
/// let mut output = vec![0.0f32; 160];
/// let result = bridge.process(&input, &mut output)?;
/// assert_eq!(result.consumed, 256);
/// assert_eq!(result.produced, 40);
///
/// bridge.close()?;
/// # Ok::<(), dsd_bridge::BridgeError>(())
/// ```
pub struct DecodeBridge {
    config: Arc<DecoderConfig>,
    options: BridgeOptions,
    channel: Arc<SharedChannel>,
    state: Arc<BridgeState>,
    decoder_handle: Option<JoinHandle<()>>,
    /// Input buffer returned by the decoder thread, reused for the next call.
    input_spare: Vec<f32>,
    counters: DecodeCounters,
    closed: bool,
}

impl DecodeBridge {
    /// Creates a builder with default parameters.
    #[must_use = "the builder does nothing until start() is called"]
    pub fn builder() -> DecodeBridgeBuilder {
        DecodeBridgeBuilder::new()
    }

    /// Builds and starts a bridge from host parameters and a decoder.
    ///
    /// # Errors
    ///
    /// Returns a construction error if the audio buffer cannot be allocated
    /// or the decoder thread cannot be spawned.
    pub fn new(params: BridgeParams, decoder: impl Decoder) -> Result<Self, BridgeError> {
        DecodeBridgeBuilder::new()
            .params(params)
            .decoder(decoder)
            .start()
    }

    pub(crate) fn from_parts(
        config: Arc<DecoderConfig>,
        options: BridgeOptions,
        channel: Arc<SharedChannel>,
        state: Arc<BridgeState>,
        decoder_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            config,
            options,
            channel,
            state,
            decoder_handle: Some(decoder_handle),
            input_spare: Vec::new(),
            counters: DecodeCounters::default(),
            closed: false,
        }
    }

    /// Decodes one input chunk into `output`.
    ///
    /// Blocks until the decoder thread has finished with `input`. Decoded
    /// samples are written to the front of `output`; `produced` may be
    /// anywhere from 0 to `output.len()`. In pass-through mode the rest of
    /// `output` is zero-filled and `produced` is always `output.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DecoderStopped`] if the decoder thread has
    /// exited and [`BridgeError::Closed`] after [`close`](Self::close).
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<WorkResult, BridgeError> {
        let instance = self.config.instance;
        let requested = output.len();

        let mut samples = std::mem::take(&mut self.input_spare);
        samples.clear();
        samples.extend_from_slice(input);

        let request = InputRequest {
            samples,
            output_capacity: requested,
            reset: false,
        };
        let decoded = self
            .run_cycle(request, |audio| {
                write_i16_as_f32(audio, output);
            })?
            .min(requested);

        let produced = if self.config.empty_frames {
            output[decoded..].fill(0.0);
            requested
        } else {
            decoded
        };

        if decoded > 0 {
            tracing::debug!(
                instance,
                inputs = input.len(),
                requested,
                decoded,
                "decoded audio"
            );
        }

        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .samples_consumed
            .fetch_add(input.len() as u64, Ordering::SeqCst);
        self.state
            .samples_produced
            .fetch_add(produced as u64, Ordering::SeqCst);

        Ok(WorkResult {
            consumed: input.len(),
            produced,
        })
    }

    /// Clears the decoder's state and any decoded audio not yet delivered.
    ///
    /// The reset runs on the decoder thread as one empty handoff cycle, so it
    /// never races with decoding.
    ///
    /// # Errors
    ///
    /// Same as [`process`](Self::process).
    pub fn reset_decoder(&mut self) -> Result<(), BridgeError> {
        let mut samples = std::mem::take(&mut self.input_spare);
        samples.clear();
        let request = InputRequest {
            samples,
            output_capacity: 0,
            reset: true,
        };
        self.run_cycle(request, |_| {})?;
        Ok(())
    }

    /// One full handoff: reset output, post input, wait for the decoder.
    fn run_cycle<F>(&mut self, request: InputRequest, copy_out: F) -> Result<usize, BridgeError>
    where
        F: FnOnce(&[i16]),
    {
        if self.closed {
            return Err(BridgeError::Closed {
                instance: self.config.instance,
            });
        }

        self.channel.reset_output()?;
        self.channel.post_input(request)?;
        let receipt = self.channel.await_output_done(copy_out)?;

        self.input_spare = receipt.recycled;
        self.counters = receipt.counters;
        Ok(receipt.produced)
    }

    /// Required multiple for output requests, or `None` in pass-through mode.
    ///
    /// The host's stream negotiation should only request output in multiples
    /// of this value, matching the decoder's voice-frame boundary.
    #[must_use]
    pub fn output_multiple(&self) -> Option<usize> {
        if self.config.empty_frames {
            None
        } else {
            Some(FRAME_SAMPLES)
        }
    }

    /// Returns the resolved decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the instance identifier.
    #[must_use]
    pub fn instance(&self) -> u32 {
        self.config.instance
    }

    /// Decoder counters as of the most recent completed call.
    #[must_use]
    pub fn counters(&self) -> DecodeCounters {
        self.counters
    }

    /// Returns `true` while the decoder thread is running and the bridge is open.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.closed && !self.channel.is_stopped()
    }

    /// Returns current bridge statistics.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            calls: self.state.calls.load(Ordering::SeqCst),
            samples_consumed: self.state.samples_consumed.load(Ordering::SeqCst),
            samples_produced: self.state.samples_produced.load(Ordering::SeqCst),
            overflowed_samples: self.state.overflowed_samples.load(Ordering::SeqCst),
            stalled_passes: self.state.stalled_passes.load(Ordering::SeqCst),
            resets: self.state.resets.load(Ordering::SeqCst),
        }
    }

    /// Stops the decoder thread and releases the bridge.
    ///
    /// This will:
    /// 1. Cancel the decoder thread at its next wait for input
    /// 2. Wait for the thread's stop acknowledgment (bounded by
    ///    [`BridgeOptions::shutdown_timeout`])
    /// 3. Join the thread
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ShutdownTimeout`] if the acknowledgment does
    /// not arrive in time. The thread is then detached and keeps the shared
    /// state alive.
    pub fn close(mut self) -> Result<(), BridgeError> {
        self.close_internal()
    }

    fn close_internal(&mut self) -> Result<(), BridgeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let instance = self.config.instance;

        self.channel.cancel();

        if !self.channel.wait_stopped(self.options.shutdown_timeout) {
            let waited = self.options.shutdown_timeout.unwrap_or_default();
            tracing::error!(
                instance,
                ?waited,
                "decoder thread did not acknowledge stop, detaching it"
            );
            self.decoder_handle = None;
            return Err(BridgeError::ShutdownTimeout { instance, waited });
        }

        if let Some(handle) = self.decoder_handle.take() {
            if handle.join().is_err() {
                tracing::warn!(instance, "decoder thread exited by panic");
            }
        }

        tracing::info!(instance, stats = ?self.stats(), "bridge closed");
        Ok(())
    }
}

impl Drop for DecodeBridge {
    fn drop(&mut self) {
        if let Err(e) = self.close_internal() {
            tracing::error!(
                instance = self.config.instance,
                error = %e,
                "bridge teardown failed"
            );
        }
    }
}

impl std::fmt::Debug for DecodeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeBridge")
            .field("config", &self.config)
            .field("closed", &self.closed)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
