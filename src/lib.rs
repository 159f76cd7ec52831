//! # dsd-bridge
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Blocking bridge between a pull-based sample stream and a free-running
//! digital voice decoder thread.
//!
//! A host scheduler calls [`DecodeBridge::process`] with a chunk of
//! demodulated input and an output buffer. The bridge hands the chunk to a
//! dedicated decoder thread, blocks until that thread has decoded it, and
//! copies back whatever 8 kHz audio is ready, anywhere from none to a full
//! buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use dsd_bridge::decoder::MockDecoder;
//! use dsd_bridge::{DecodeBridge, FrameMode, ModulationMode};
//!
//! let mut bridge = DecodeBridge::builder()
//!     .frame_mode(FrameMode::P25Phase1)
//!     .modulation(ModulationMode::C4fm)
//!     .decoder(MockDecoder::voice_frames(960))
//!     .on_event(|e| tracing::warn!(?e, "bridge event"))
//!     .start()?;
//!
//! let input = vec![0.0f32; 4096];
//! let mut output = vec![0.0f32; 640];
//! let result = bridge.process(&input, &mut output)?;
//! // all input is consumed; the first `produced` samples of `output` are valid
//! assert_eq!(result.consumed, 4096);
//!
//! bridge.close()?;
//! # Ok::<(), dsd_bridge::BridgeError>(())
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict two-thread boundary:
//!
//! - **Host thread**: calls `process`, posts input, waits for output
//! - **Shared channel**: input and output slots, each with its own mutex and
//!   condition variable; neither lock is ever held while taking the other
//! - **Decoder thread**: owns the [`Decoder`](decoder::Decoder) and the decoded
//!   audio ring, and runs until teardown cancels it
//!
//! Each call is one strict handoff, so the decoder only ever sees input from
//! the call currently in flight and every call sees output from its own input.

#![warn(missing_docs)]
// Sample counts move between usize and u64, and samples between i16 and f32
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod bridge;
mod builder;
mod config;
pub mod decoder;
mod driver;
mod error;
mod event;
pub mod format;
mod pipeline;

pub use bridge::{BridgeStats, DecodeBridge, WorkResult};
pub use builder::DecodeBridgeBuilder;
pub use config::{
    resolve, BridgeOptions, BridgeParams, DecoderConfig, FrameMode, ModulationMode, ModulationSet,
    ProtocolSet, RfModulation, SymbolTiming, DEFAULT_SAMPLES_PER_SYMBOL, DEFAULT_SYMBOL_CENTER,
};
pub use decoder::{DecodeCounters, Decoder, FRAME_SAMPLES};
pub use driver::{negotiate_output_len, StreamDriver};
pub use error::BridgeError;
pub use event::{event_callback, BridgeEvent, EventCallback, StopReason};
