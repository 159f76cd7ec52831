//! Error types for dsd-bridge.
//!
//! Errors fall into two groups:
//! - **Construction errors**: the bridge could not be built and must not be used
//! - **Call errors**: a `process` or teardown call could not complete
//!
//! A decode pass that produces fewer samples than requested is not an error.

use std::collections::TryReserveError;
use std::time::Duration;

/// Errors returned by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No decoder was supplied to the builder.
    #[error("no decoder configured - call decoder() before start()")]
    NoDecoderConfigured,

    /// The bridge options are unusable.
    #[error("invalid bridge options: {reason}")]
    InvalidOptions {
        /// What was wrong with the options.
        reason: String,
    },

    /// The decoded audio accumulator could not be allocated.
    #[error("failed to allocate audio buffer of {samples} samples: {source}")]
    BufferAllocation {
        /// Requested capacity in samples.
        samples: usize,
        /// The underlying allocation error.
        #[source]
        source: TryReserveError,
    },

    /// The decoder thread could not be spawned.
    #[error("failed to spawn decoder thread for instance {instance}: {source}")]
    ThreadSpawn {
        /// Bridge instance identifier.
        instance: u32,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The decoder thread has exited, so the request can never complete.
    #[error("decoder thread for instance {instance} has stopped")]
    DecoderStopped {
        /// Bridge instance identifier.
        instance: u32,
    },

    /// The bridge was already closed.
    #[error("bridge instance {instance} is closed")]
    Closed {
        /// Bridge instance identifier.
        instance: u32,
    },

    /// The decoder thread did not acknowledge its stop in time.
    ///
    /// Shared buffers are left alive for the thread rather than released.
    #[error("decoder thread for instance {instance} did not stop within {waited:?}")]
    ShutdownTimeout {
        /// Bridge instance identifier.
        instance: u32,
        /// How long teardown waited.
        waited: Duration,
    },

    /// An internal handoff invariant was violated.
    #[error("internal error: {context}")]
    Internal {
        /// Which invariant failed.
        context: &'static str,
    },
}

impl BridgeError {
    /// Creates an internal invariant error.
    pub(crate) fn internal(context: &'static str) -> Self {
        Self::Internal { context }
    }

    /// Creates an invalid options error with the given reason.
    pub(crate) fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised while building the bridge.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::NoDecoderConfigured
                | Self::InvalidOptions { .. }
                | Self::BufferAllocation { .. }
                | Self::ThreadSpawn { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_stopped_display() {
        let err = BridgeError::DecoderStopped { instance: 3 };
        assert_eq!(err.to_string(), "decoder thread for instance 3 has stopped");
    }

    #[test]
    fn test_internal_display() {
        let err = BridgeError::internal("request already outstanding");
        assert_eq!(
            err.to_string(),
            "internal error: request already outstanding"
        );
    }

    #[test]
    fn test_invalid_options() {
        let err = BridgeError::invalid_options("audio_capacity must be non-zero");
        assert!(err.to_string().contains("audio_capacity"));
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_thread_spawn_keeps_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left");
        let err = BridgeError::ThreadSpawn {
            instance: 1,
            source: io_err,
        };
        assert!(err.is_construction_error());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_call_errors_are_not_construction_errors() {
        assert!(!BridgeError::Closed { instance: 0 }.is_construction_error());
        assert!(!BridgeError::ShutdownTimeout {
            instance: 0,
            waited: Duration::from_millis(10),
        }
        .is_construction_error());
    }
}
