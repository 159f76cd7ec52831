//! Host-side stream driver.
//!
//! Plays the part of the host scheduler: it slices an input stream into
//! chunks, sizes each output request the way stream negotiation would, and
//! advances both streams by the counts each call reports.

use crate::bridge::DecodeBridge;
use crate::decoder::FRAME_SAMPLES;
use crate::BridgeError;

/// Rounds an output request to what the bridge accepts.
///
/// With a required multiple the request is rounded down to it, but never
/// below one multiple. Without one (pass-through) the request is unchanged.
///
/// # Example
///
/// ```
/// use dsd_bridge::negotiate_output_len;
///
/// assert_eq!(negotiate_output_len(500, Some(160)), 480);
/// assert_eq!(negotiate_output_len(100, Some(160)), 160);
/// assert_eq!(negotiate_output_len(500, None), 500);
/// ```
#[must_use]
pub fn negotiate_output_len(requested: usize, multiple: Option<usize>) -> usize {
    match multiple {
        Some(multiple) if multiple > 0 => (requested / multiple * multiple).max(multiple),
        _ => requested,
    }
}

/// Feeds an input stream through a bridge in fixed-size chunks.
///
/// # Example
///
/// ```
/// use dsd_bridge::decoder::MockDecoder;
/// use dsd_bridge::{DecodeBridge, StreamDriver};
///
/// let mut bridge = DecodeBridge::builder()
///     .decoder(MockDecoder::voice_frames(960))
///     .start()?;
///
/// let input = vec![0.0f32; 48_000];
/// let audio = StreamDriver::new(4096, 960).run(&mut bridge, &input)?;
/// assert_eq!(audio.len(), 50 * 160);
/// # Ok::<(), dsd_bridge::BridgeError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDriver {
    chunk_len: usize,
    output_request: usize,
}

impl Default for StreamDriver {
    fn default() -> Self {
        Self::new(4096, 4 * FRAME_SAMPLES)
    }
}

impl StreamDriver {
    /// Creates a driver posting `chunk_len` input samples per call and
    /// requesting `output_request` output samples before negotiation.
    ///
    /// A zero `chunk_len` is treated as one sample.
    #[must_use]
    pub fn new(chunk_len: usize, output_request: usize) -> Self {
        Self {
            chunk_len: chunk_len.max(1),
            output_request,
        }
    }

    /// Returns the output request the bridge will actually see.
    #[must_use]
    pub fn negotiated_output_len(&self, bridge: &DecodeBridge) -> usize {
        negotiate_output_len(self.output_request, bridge.output_multiple())
    }

    /// Runs the whole of `input` through `bridge`, one call per chunk.
    ///
    /// Returns the produced output stream, i.e. the first `produced`
    /// samples of every call, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error any call reports.
    pub fn run(&self, bridge: &mut DecodeBridge, input: &[f32]) -> Result<Vec<f32>, BridgeError> {
        let mut output = vec![0.0f32; self.negotiated_output_len(bridge)];
        let mut stream = Vec::new();
        let mut position = 0;

        for chunk in input.chunks(self.chunk_len) {
            let result = bridge.process(chunk, &mut output)?;
            position += result.consumed;
            stream.extend_from_slice(&output[..result.produced]);
        }

        tracing::debug!(
            instance = bridge.instance(),
            chunk_len = self.chunk_len,
            consumed = position,
            produced = stream.len(),
            "stream driver finished"
        );
        Ok(stream)
    }

    /// Issues calls with empty input to collect audio still buffered in the
    /// bridge. Stops at the first call that decodes nothing, after one call
    /// in pass-through mode, or after `max_calls`.
    ///
    /// # Errors
    ///
    /// Returns the first error any call reports.
    pub fn flush(
        &self,
        bridge: &mut DecodeBridge,
        max_calls: usize,
    ) -> Result<Vec<f32>, BridgeError> {
        let mut output = vec![0.0f32; self.negotiated_output_len(bridge)];
        let mut stream = Vec::new();

        for _ in 0..max_calls {
            let result = bridge.process(&[], &mut output)?;
            stream.extend_from_slice(&output[..result.produced]);
            if result.produced == 0 || bridge.output_multiple().is_none() {
                break;
            }
        }
        Ok(stream)
    }
}
