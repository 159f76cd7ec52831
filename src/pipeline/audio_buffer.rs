//! Decoded audio accumulator owned by the decoder thread.

use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::decoder::AudioOut;
use crate::BridgeError;

/// Ring of decoded samples waiting for a host call to request them.
///
/// Both halves live on the decoder thread: the decoder writes through
/// [`AudioBuffer::writer`] and each publish drains at most the requested
/// output capacity. Samples left over stay for the next call.
pub struct AudioBuffer {
    producer: HeapProd<i16>,
    consumer: HeapCons<i16>,
    dropped: u64,
}

impl AudioBuffer {
    /// Allocates an accumulator holding up to `capacity` samples.
    ///
    /// Allocation failure is reported, not panicked on.
    pub fn try_new(capacity: usize) -> Result<Self, BridgeError> {
        if capacity == 0 {
            return Err(BridgeError::invalid_options(
                "audio_capacity must be non-zero",
            ));
        }
        let ring = HeapRb::<i16>::try_new(capacity).map_err(|source| {
            BridgeError::BufferAllocation {
                samples: capacity,
                source,
            }
        })?;
        let (producer, consumer) = ring.split();

        Ok(Self {
            producer,
            consumer,
            dropped: 0,
        })
    }

    /// Returns a writer for the decoder.
    pub fn writer(&mut self) -> AudioOut<'_> {
        AudioOut::new(&mut self.producer, &mut self.dropped)
    }

    /// Returns the number of decoded samples waiting.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Moves up to `max` samples into `out`, replacing its contents.
    ///
    /// Returns the number of samples moved.
    pub fn read_into(&mut self, out: &mut Vec<i16>, max: usize) -> usize {
        let n = self.available().min(max);
        out.clear();
        out.resize(n, 0);
        let read = self.consumer.pop_slice(out);
        out.truncate(read);
        read
    }

    /// Returns and clears the count of samples dropped because the ring was full.
    pub fn take_dropped(&mut self) -> u64 {
        std::mem::take(&mut self.dropped)
    }

    /// Discards all waiting samples.
    pub fn clear(&mut self) -> usize {
        self.consumer.clear()
    }
}
