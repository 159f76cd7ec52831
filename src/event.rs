//! Runtime events for monitoring the decoder thread.
//!
//! Events are non-fatal notifications. The bridge keeps running after any
//! event except [`BridgeEvent::DecoderStopped`], which is the last one an
//! instance emits.

use std::sync::Arc;

/// Why the decoder thread exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Teardown requested the stop.
    Cancelled,
    /// The decoder panicked.
    Panicked,
}

/// Runtime events emitted by a bridge instance.
///
/// # Example
///
/// ```
/// use dsd_bridge::BridgeEvent;
///
/// fn handle_event(event: BridgeEvent) {
///     match event {
///         BridgeEvent::DecoderStarted { instance, decoder } => {
///             eprintln!("[{instance}] decoder {decoder} started");
///         }
///         BridgeEvent::DecoderStopped { instance, reason } => {
///             eprintln!("[{instance}] decoder stopped: {reason:?}");
///         }
///         BridgeEvent::AudioOverflow { instance, dropped_samples } => {
///             eprintln!("[{instance}] dropped {dropped_samples} decoded samples");
///         }
///         BridgeEvent::InputStalled { instance, discarded_samples } => {
///             eprintln!("[{instance}] decoder stalled, {discarded_samples} samples discarded");
///         }
///         BridgeEvent::DecoderReset { instance } => {
///             eprintln!("[{instance}] decoder state reset");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The decoder thread is up and waiting for input.
    DecoderStarted {
        /// Bridge instance identifier.
        instance: u32,
        /// Name reported by the decoder.
        decoder: String,
    },

    /// The decoder thread ran its cleanup and is about to exit.
    DecoderStopped {
        /// Bridge instance identifier.
        instance: u32,
        /// Why it exited.
        reason: StopReason,
    },

    /// The decoded audio accumulator was full and decoded samples were dropped.
    ///
    /// The host is requesting output more slowly than the decoder produces
    /// it. Consider a larger `audio_capacity`.
    AudioOverflow {
        /// Bridge instance identifier.
        instance: u32,
        /// Samples dropped during the last pass.
        dropped_samples: u64,
    },

    /// The decoder stopped consuming input before the posted chunk was drained.
    ///
    /// The rest of the chunk is discarded so the call can complete.
    InputStalled {
        /// Bridge instance identifier.
        instance: u32,
        /// Input samples that were never handed to the decoder.
        discarded_samples: usize,
    },

    /// Decoder state and buffered audio were cleared.
    DecoderReset {
        /// Bridge instance identifier.
        instance: u32,
    },
}

/// Callback type for receiving runtime events.
///
/// Called from the decoder thread; keep it short and non-blocking.
pub type EventCallback = Arc<dyn Fn(BridgeEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use dsd_bridge::{event_callback, BridgeEvent};
///
/// let callback = event_callback(|event: BridgeEvent| {
///     println!("Got event: {:?}", event);
/// });
/// ```
#[must_use]
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(BridgeEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
