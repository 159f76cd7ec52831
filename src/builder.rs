//! Builder pattern for `DecodeBridge`.

use std::sync::Arc;

use crate::bridge::{BridgeState, DecodeBridge};
use crate::decoder::Decoder;
use crate::pipeline::{spawn_decoder_thread, AudioBuffer, DecoderSession, SharedChannel};
use crate::{
    event_callback, BridgeError, BridgeEvent, BridgeOptions, BridgeParams, EventCallback,
    FrameMode, ModulationMode,
};

/// Builder for configuring and starting a decode bridge.
///
/// Use [`DecodeBridge::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use dsd_bridge::decoder::MockDecoder;
/// use dsd_bridge::{DecodeBridge, FrameMode, ModulationMode};
///
/// let bridge = DecodeBridge::builder()
///     .frame_mode(FrameMode::DmrMototrbo)
///     .modulation(ModulationMode::C4fm)
///     .instance(3)
///     .decoder(MockDecoder::voice_frames(960))
///     .on_event(|e| tracing::info!(?e, "bridge event"))
///     .start()?;
///
/// assert_eq!(bridge.output_multiple(), Some(160));
/// # Ok::<(), dsd_bridge::BridgeError>(())
/// ```
#[must_use]
pub struct DecodeBridgeBuilder {
    /// Host construction parameters.
    params: BridgeParams,
    /// Bridge machinery options.
    options: BridgeOptions,
    /// The decode routine to run on the decoder thread.
    decoder: Option<Box<dyn Decoder>>,
    /// Event callback.
    event_callback: Option<EventCallback>,
}

impl Default for DecodeBridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeBridgeBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            params: BridgeParams::default(),
            options: BridgeOptions::default(),
            decoder: None,
            event_callback: None,
        }
    }

    /// Set the protocol selector.
    ///
    /// Default: [`FrameMode::AutoDetect`]
    pub fn frame_mode(mut self, frame: FrameMode) -> Self {
        self.params.frame = frame;
        self
    }

    /// Set the modulation selector.
    ///
    /// Default: [`ModulationMode::AutoSelect`]
    pub fn modulation(mut self, modulation: ModulationMode) -> Self {
        self.params.modulation = modulation;
        self
    }

    /// Set the unvoiced speech synthesis quality. Default: 3
    pub fn uv_quality(mut self, uv_quality: i32) -> Self {
        self.params.uv_quality = uv_quality;
        self
    }

    /// Enable diagnostic error bars.
    pub fn error_bars(mut self, enabled: bool) -> Self {
        self.params.error_bars = enabled;
        self
    }

    /// Set the decoder verbosity level. Default: 2
    pub fn verbosity(mut self, verbosity: i32) -> Self {
        self.params.verbosity = verbosity;
        self
    }

    /// Enable pass-through mode.
    ///
    /// Every call then reports a full output buffer, zero-filled past the
    /// decoded audio, and output requests need not be frame multiples.
    pub fn empty_frames(mut self, enabled: bool) -> Self {
        self.params.empty_frames = enabled;
        self
    }

    /// Set the instance identifier used in logs and events.
    pub fn instance(mut self, instance: u32) -> Self {
        self.params.instance = instance;
        self
    }

    /// Replace all host parameters at once.
    pub fn params(mut self, params: BridgeParams) -> Self {
        self.params = params;
        self
    }

    /// Set bridge machinery options.
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the decoder that runs on the decoder thread.
    pub fn decoder<D: Decoder>(mut self, decoder: D) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// The callback runs on the decoder thread.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(BridgeEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), BridgeError> {
        if self.decoder.is_none() {
            return Err(BridgeError::NoDecoderConfigured);
        }
        if self.options.audio_capacity == 0 {
            return Err(BridgeError::invalid_options(
                "audio_capacity must be non-zero",
            ));
        }
        if self.options.shutdown_timeout.is_some_and(|t| t.is_zero()) {
            return Err(BridgeError::invalid_options(
                "shutdown_timeout must be non-zero; use None to wait indefinitely",
            ));
        }
        Ok(())
    }

    /// Resolve the configuration and start the decoder thread.
    ///
    /// The shared channel exists before the thread starts, so the first
    /// `process` call can never race the thread's startup.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No decoder is configured
    /// - The options are invalid
    /// - The audio buffer cannot be allocated
    /// - The decoder thread cannot be spawned
    pub fn start(self) -> Result<DecodeBridge, BridgeError> {
        self.validate()?;
        let decoder = self.decoder.ok_or(BridgeError::NoDecoderConfigured)?;

        let config = Arc::new(self.params.resolve());
        let instance = config.instance;

        for notice in self.params.frame.notices() {
            tracing::info!(instance, "{notice}");
        }
        if let Some(forced) = self.params.frame.forced_modulation() {
            if let Some(requested) = self.params.overridden_modulation() {
                tracing::debug!(
                    instance,
                    ?requested,
                    ?forced,
                    "modulation selector overridden by frame mode"
                );
            }
        } else if let Some(notice) = self.params.modulation.notice() {
            tracing::info!(instance, "{notice}");
        }
        tracing::debug!(instance, ?config, "resolved decoder configuration");

        let audio = AudioBuffer::try_new(self.options.audio_capacity)?;
        let channel = Arc::new(SharedChannel::new(instance));
        let state = Arc::new(BridgeState::new());

        let session = DecoderSession::new(
            decoder,
            Arc::clone(&config),
            Arc::clone(&channel),
            audio,
            Arc::clone(&state),
            self.event_callback,
        );
        let thread_name = self
            .options
            .thread_name
            .clone()
            .unwrap_or_else(|| format!("dsd-decoder-{instance}"));
        let handle = spawn_decoder_thread(session, thread_name)?;

        tracing::info!(instance, "decode bridge started");
        Ok(DecodeBridge::from_parts(
            config,
            self.options,
            channel,
            state,
            handle,
        ))
    }
}
