use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::event::ParamChange;

/// Lock-free queue for parameter writes.
///
/// Single producer (control context)
/// Single consumer (render context)
pub fn param_channel(capacity: usize) -> (ParamSender, ParamInput) {
    let (tx, rx) = RingBuffer::new(capacity);
    (ParamSender { tx }, ParamInput { rx })
}

pub struct ParamSender {
    tx: Producer<ParamChange>,
}

impl ParamSender {
    /// Queue a change. Returns it back if the queue is full.
    #[inline]
    pub fn push(&mut self, change: ParamChange) -> Result<(), ParamChange> {
        match self.tx.push(change) {
            Ok(()) => Ok(()),
            Err(PushError::Full(rejected)) => Err(rejected),
        }
    }
}

pub struct ParamInput {
    rx: Consumer<ParamChange>,
}

impl ParamInput {
    /// Hand every queued change to `apply`, in arrival order.
    ///
    /// Render-thread-safe, lock-free.
    #[inline]
    pub fn drain<F>(&mut self, mut apply: F) -> usize
    where
        F: FnMut(&ParamChange),
    {
        let mut count = 0;
        while let Ok(change) = self.rx.pop() {
            apply(&change);
            count += 1;
        }
        count
    }
}

/// Shared stop request flag.
///
/// Any context may request a stop; the render loop observes it at the
/// start of its next block.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
