//! Decoder session - the dedicated thread that runs the decode routine.
//!
//! The session loops on the shared channel:
//! 1. Wait for posted input (the only suspension and cancellation point)
//! 2. Hand the input to the decoder until it is used up
//! 3. Publish at most the requested number of decoded samples
//!
//! Decoder-private state (the decoder itself and the decoded audio ring) is
//! owned by this thread and never touched by the host thread.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::bridge::BridgeState;
use crate::decoder::Decoder;
use crate::event::{BridgeEvent, EventCallback, StopReason};
use crate::pipeline::{AudioBuffer, InputRequest, SharedChannel};
use crate::{BridgeError, DecoderConfig};

/// Cleanup action for the decoder thread.
///
/// Runs when the thread leaves its loop, including by unwinding out of a
/// panicking decoder: releases any waiting host call, then acknowledges the
/// stop so teardown can proceed.
struct StopGuard {
    channel: Arc<SharedChannel>,
    instance: u32,
    event_callback: Option<EventCallback>,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        let reason = if std::thread::panicking() {
            tracing::warn!(instance = self.instance, "decoder panicked, halting bridge");
            StopReason::Panicked
        } else {
            StopReason::Cancelled
        };

        self.channel.mark_halted();

        if let Some(ref callback) = self.event_callback {
            callback(BridgeEvent::DecoderStopped {
                instance: self.instance,
                reason,
            });
        }

        tracing::info!(instance = self.instance, ?reason, "decoder thread stopped");
        self.channel.acknowledge_stop();
    }
}

/// Runs the decode routine against the shared channel.
pub(crate) struct DecoderSession {
    decoder: Box<dyn Decoder>,
    config: Arc<DecoderConfig>,
    channel: Arc<SharedChannel>,
    audio: AudioBuffer,
    state: Arc<BridgeState>,
    event_callback: Option<EventCallback>,
}

impl DecoderSession {
    pub fn new(
        decoder: Box<dyn Decoder>,
        config: Arc<DecoderConfig>,
        channel: Arc<SharedChannel>,
        audio: AudioBuffer,
        state: Arc<BridgeState>,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            decoder,
            config,
            channel,
            audio,
            state,
            event_callback,
        }
    }

    /// Runs until cancelled.
    pub fn run(mut self) {
        let _guard = StopGuard {
            channel: Arc::clone(&self.channel),
            instance: self.config.instance,
            event_callback: self.event_callback.clone(),
        };

        self.decoder.on_start(&self.config);
        tracing::debug!(
            instance = self.config.instance,
            decoder = self.decoder.name(),
            "decoder thread waiting for input"
        );
        self.emit_event(BridgeEvent::DecoderStarted {
            instance: self.config.instance,
            decoder: self.decoder.name().to_string(),
        });

        while let Some(request) = self.channel.await_input() {
            self.handle_request(request);
        }
    }

    fn handle_request(&mut self, request: InputRequest) {
        let InputRequest {
            samples,
            output_capacity,
            reset,
        } = request;

        if reset {
            self.reset();
        }

        self.decode_pass(&samples);
        self.report_overflow();

        let counters = self.decoder.counters();
        let audio = &mut self.audio;
        self.channel.publish_output(
            |out| {
                audio.read_into(out, output_capacity);
            },
            samples,
            counters,
        );
    }

    /// Feeds the posted input to the decoder until it is all consumed.
    fn decode_pass(&mut self, input: &[f32]) {
        let mut offset = 0;
        while offset < input.len() {
            let remaining = &input[offset..];
            let consumed = {
                let mut writer = self.audio.writer();
                self.decoder.decode(&self.config, remaining, &mut writer)
            };

            if consumed == 0 {
                self.report_stall(remaining.len());
                return;
            }
            offset += consumed.min(remaining.len());
        }
    }

    fn reset(&mut self) {
        let discarded = self.audio.clear();
        self.audio.take_dropped();
        self.decoder.reset();
        self.state.resets.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            instance = self.config.instance,
            discarded,
            "decoder state reset"
        );
        self.emit_event(BridgeEvent::DecoderReset {
            instance: self.config.instance,
        });
    }

    fn report_stall(&self, discarded_samples: usize) {
        self.state.stalled_passes.fetch_add(1, Ordering::SeqCst);
        tracing::warn!(
            instance = self.config.instance,
            discarded_samples,
            "decoder made no progress, discarding rest of input chunk"
        );
        self.emit_event(BridgeEvent::InputStalled {
            instance: self.config.instance,
            discarded_samples,
        });
    }

    fn report_overflow(&mut self) {
        let dropped_samples = self.audio.take_dropped();
        if dropped_samples == 0 {
            return;
        }
        self.state
            .overflowed_samples
            .fetch_add(dropped_samples, Ordering::SeqCst);
        tracing::warn!(
            instance = self.config.instance,
            dropped_samples,
            "decoded audio buffer full, dropping samples"
        );
        self.emit_event(BridgeEvent::AudioOverflow {
            instance: self.config.instance,
            dropped_samples,
        });
    }

    fn emit_event(&self, event: BridgeEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

/// Spawns the decoder session on its own named thread.
pub(crate) fn spawn_decoder_thread(
    session: DecoderSession,
    thread_name: String,
) -> Result<JoinHandle<()>, BridgeError> {
    let instance = session.config.instance;
    std::thread::Builder::new()
        .name(thread_name)
        .spawn(move || session.run())
        .map_err(|source| BridgeError::ThreadSpawn { instance, source })
}
