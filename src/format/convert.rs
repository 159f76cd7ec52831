//! Sample format conversion between the decoder and the host stream.

/// Converts an f32 sample to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling. This means -1.0 maps
/// to -32767 rather than -32768, losing 1 LSB at the negative extreme.
#[inline]
#[must_use]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts an i16 sample to f32.
///
/// Output will be in the range [-1.0, 1.0). Every i16 value maps to a
/// distinct, exactly representable f32, so the conversion is lossless and
/// `(i16_to_f32(s) * 32768.0) as i16 == s` for all `s`.
#[inline]
#[must_use]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts decoded samples into the front of a host buffer.
///
/// Returns the number of samples written, which is the shorter of the two
/// lengths. The rest of `dst` is left untouched.
pub fn write_i16_as_f32(src: &[i16], dst: &mut [f32]) -> usize {
    let n = src.len().min(dst.len());
    for (out, &sample) in dst[..n].iter_mut().zip(src) {
        *out = i16_to_f32(sample);
    }
    n
}
