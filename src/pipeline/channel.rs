//! Shared channel between the host-facing bridge and the decoder thread.
//!
//! One cycle per host call:
//!
//! ```text
//! Idle ──post_input──▶ Posted ──await_input──▶ Decoding ──publish_output──▶ finished
//!   ▲                                                                         │
//!   └──────────────────────────── await_output_done ◀─────────────────────────┘
//! ```
//!
//! The input slot and the output slot each have their own mutex and
//! condition variable. No code path holds both locks at once.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::decoder::DecodeCounters;
use crate::BridgeError;

/// Input descriptor for one host call. Owned by the decoder thread while decoding.
#[derive(Debug, Default)]
pub(crate) struct InputRequest {
    /// Samples copied from the host's input chunk.
    pub samples: Vec<f32>,
    /// Capacity of the host's output buffer.
    pub output_capacity: usize,
    /// Clear decoder state and buffered audio before decoding.
    pub reset: bool,
}

/// Where the channel is in its per-call cycle. Guarded by the input mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Posted,
    Decoding,
}

struct InputSlot {
    phase: Phase,
    pending: Option<InputRequest>,
    cancelled: bool,
}

struct OutputSlot {
    /// Decoded samples for the current call; `len()` is the produced count.
    audio: Vec<i16>,
    finished: bool,
    /// Set by the decoder thread's cleanup; no further output will come.
    halted: bool,
    /// Input buffer handed back for reuse.
    recycled: Vec<f32>,
    counters: DecodeCounters,
}

/// What the host side gets back from a finished call.
#[derive(Debug)]
pub(crate) struct OutputReceipt {
    pub produced: usize,
    pub recycled: Vec<f32>,
    pub counters: DecodeCounters,
}

/// The synchronization state shared by exactly two threads.
pub(crate) struct SharedChannel {
    instance: u32,
    input: Mutex<InputSlot>,
    input_ready: Condvar,
    output: Mutex<OutputSlot>,
    output_ready: Condvar,
    stopped: Mutex<bool>,
    stopped_cond: Condvar,
}

impl SharedChannel {
    pub fn new(instance: u32) -> Self {
        Self {
            instance,
            input: Mutex::new(InputSlot {
                phase: Phase::Idle,
                pending: None,
                cancelled: false,
            }),
            input_ready: Condvar::new(),
            output: Mutex::new(OutputSlot {
                audio: Vec::new(),
                finished: false,
                halted: false,
                recycled: Vec::new(),
                counters: DecodeCounters::default(),
            }),
            output_ready: Condvar::new(),
            stopped: Mutex::new(false),
            stopped_cond: Condvar::new(),
        }
    }

    // ---- host side -------------------------------------------------------

    /// Clears the output descriptor ahead of a new request.
    pub fn reset_output(&self) -> Result<(), BridgeError> {
        let mut output = self.output.lock();
        if output.halted {
            return Err(BridgeError::DecoderStopped {
                instance: self.instance,
            });
        }
        output.audio.clear();
        output.finished = false;
        Ok(())
    }

    /// Posts the input for one call and wakes the decoder thread.
    ///
    /// Only valid while the channel is idle.
    pub fn post_input(&self, request: InputRequest) -> Result<(), BridgeError> {
        let mut input = self.input.lock();
        if input.cancelled {
            return Err(BridgeError::Closed {
                instance: self.instance,
            });
        }
        if input.phase != Phase::Idle {
            return Err(BridgeError::internal(
                "input posted while a request is outstanding",
            ));
        }
        input.pending = Some(request);
        input.phase = Phase::Posted;
        self.input_ready.notify_one();
        Ok(())
    }

    /// Blocks until the decoder thread publishes output for the posted call.
    ///
    /// `copy_out` sees the decoded samples while the output lock is held.
    /// Returns [`BridgeError::DecoderStopped`] if the decoder thread halts
    /// before finishing.
    pub fn await_output_done<F>(&self, copy_out: F) -> Result<OutputReceipt, BridgeError>
    where
        F: FnOnce(&[i16]),
    {
        let receipt = {
            let mut output = self.output.lock();
            while !output.finished {
                if output.halted {
                    return Err(BridgeError::DecoderStopped {
                        instance: self.instance,
                    });
                }
                self.output_ready.wait(&mut output);
            }
            copy_out(&output.audio);
            OutputReceipt {
                produced: output.audio.len(),
                recycled: std::mem::take(&mut output.recycled),
                counters: output.counters,
            }
        };

        self.input.lock().phase = Phase::Idle;
        Ok(receipt)
    }

    /// Asks the decoder thread to exit at its next wait for input.
    pub fn cancel(&self) {
        let mut input = self.input.lock();
        input.cancelled = true;
        self.input_ready.notify_all();
    }

    /// Waits for the decoder thread's stop acknowledgment.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_stopped(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut stopped = self.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    let result = self.stopped_cond.wait_until(&mut stopped, deadline);
                    if result.timed_out() {
                        return *stopped;
                    }
                }
                None => self.stopped_cond.wait(&mut stopped),
            }
        }
        true
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    // ---- decoder side ----------------------------------------------------

    /// Blocks until input is posted. Returns `None` once cancelled.
    ///
    /// This is the decoder thread's only suspension point and its only
    /// cancellation point.
    pub fn await_input(&self) -> Option<InputRequest> {
        let mut input = self.input.lock();
        loop {
            if input.cancelled {
                return None;
            }
            if let Some(request) = input.pending.take() {
                input.phase = Phase::Decoding;
                return Some(request);
            }
            self.input_ready.wait(&mut input);
        }
    }

    /// Publishes the result of a decode pass and wakes the host side.
    ///
    /// `fill` writes the decoded samples into the output descriptor while
    /// the output lock is held.
    pub fn publish_output<F>(&self, fill: F, recycled: Vec<f32>, counters: DecodeCounters)
    where
        F: FnOnce(&mut Vec<i16>),
    {
        let mut output = self.output.lock();
        fill(&mut output.audio);
        output.recycled = recycled;
        output.counters = counters;
        output.finished = true;
        self.output_ready.notify_one();
    }

    /// Marks that no further output will be published.
    pub fn mark_halted(&self) {
        let mut output = self.output.lock();
        output.halted = true;
        self.output_ready.notify_all();
    }

    /// Acknowledges that the decoder thread has finished its cleanup.
    pub fn acknowledge_stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.stopped_cond.notify_all();
    }
}
