//! Handoff machinery between the host thread and the decoder thread.
//!
//! ```text
//! host call → SharedChannel (input slot) → Decoder Session → AudioBuffer
//!     ▲                                                          │
//!     └──────────────── SharedChannel (output slot) ◀────────────┘
//! ```
//!
//! - **Shared Channel**: two independently locked descriptors plus the stop acknowledgment
//! - **Decoder Session**: the dedicated thread running the decode routine
//! - **Audio Buffer**: decoded samples waiting for a host call to request them

mod audio_buffer;
mod channel;
mod decoder_thread;

pub(crate) use audio_buffer::AudioBuffer;
pub(crate) use channel::{InputRequest, SharedChannel};
pub(crate) use decoder_thread::{spawn_decoder_thread, DecoderSession};
