//! Sample format conversion utilities.
//!
//! The decoder produces 16-bit integer audio; the host stream carries f32.
//! Conversion happens once, when decoded audio crosses into the host buffer.

mod convert;

pub use convert::{f32_to_i16, i16_to_f32, write_i16_as_f32};
