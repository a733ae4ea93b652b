// src/notes.rs
//
// Note event hand-off from the control context to the render context.
//
// A single-producer/single-consumer ring buffer carries every note event.
// The render side drains it into preallocated storage, so reading never
// allocates.
//
// Capacity bounds every event not yet delivered, whether it still sits in
// the ring or waits in `pending` for a later block. The ring is therefore
// always drained completely and a due event can never be stuck behind
// future ones.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::event::{NoteEvent, SampleTime, ScheduledNote, TimedNote};

/// Create a linked sender/input pair holding up to `capacity` events.
pub fn note_channel(capacity: usize) -> (NoteSender, NotesInput) {
    let (tx, rx) = RingBuffer::new(capacity);
    let outstanding = Arc::new(AtomicUsize::new(0));
    (
        NoteSender {
            tx,
            next_seq: 0,
            capacity,
            outstanding: Arc::clone(&outstanding),
        },
        NotesInput {
            rx,
            cursor: 0,
            outstanding,
            pending: Vec::with_capacity(capacity),
            ready: Vec::with_capacity(capacity),
        },
    )
}

/// Control-side end of the notes queue.
pub struct NoteSender {
    tx: Producer<TimedNote>,
    next_seq: u64,
    capacity: usize,
    /// Events pushed but not yet returned by `on_read`
    outstanding: Arc<AtomicUsize>,
}

impl NoteSender {
    /// Queue an event for `time`.
    ///
    /// Returns the event back if `capacity` events are already waiting for
    /// delivery, including events scheduled for later blocks.
    pub fn push(&mut self, time: SampleTime, event: NoteEvent) -> Result<(), NoteEvent> {
        // Only this side increments, so the count cannot grow under us
        if self.outstanding.load(Ordering::Acquire) >= self.capacity {
            return Err(event);
        }

        let note = TimedNote {
            time,
            seq: self.next_seq,
            event,
        };
        // Counted before the push so delivery can never underflow
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        match self.tx.push(note) {
            Ok(()) => {
                self.next_seq += 1;
                Ok(())
            }
            Err(PushError::Full(rejected)) => {
                self.outstanding.fetch_sub(1, Ordering::AcqRel);
                Err(rejected.event)
            }
        }
    }

    /// Events queued but not yet delivered to the render context.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// True once the render side has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_abandoned()
    }
}

/// Render-side aggregator of pending note events.
///
/// `on_read` is the only synchronization point between event arrival and
/// audio advancement: each event is returned by exactly one call.
pub struct NotesInput {
    rx: Consumer<TimedNote>,
    /// Position of the previous read; start of the current block
    cursor: SampleTime,
    outstanding: Arc<AtomicUsize>,
    /// Drained but not yet due
    pending: Vec<TimedNote>,
    /// Due in the current block, sorted
    ready: Vec<ScheduledNote>,
}

impl NotesInput {
    /// Restart block numbering at `position` (called on prepare).
    pub fn rewind(&mut self, position: SampleTime) {
        self.cursor = position;
    }

    pub fn cursor(&self) -> SampleTime {
        self.cursor
    }

    /// Events that are not yet due, including those still in the queue.
    pub fn pending_len(&self) -> usize {
        self.pending.len() + self.rx.slots()
    }

    /// Retrieve and clear every event due before `position`.
    ///
    /// Offsets are relative to the previous read position. Events stamped
    /// before it are clamped to offset 0. The result is ordered by offset,
    /// then by arrival.
    pub fn on_read(&mut self, position: SampleTime) -> &[ScheduledNote] {
        let block_start = self.cursor;
        self.ready.clear();

        // Never exceeds the preallocated capacity: the sender bounds ring
        // plus pending together
        while let Ok(note) = self.rx.pop() {
            self.pending.push(note);
        }

        let ready = &mut self.ready;
        self.pending.retain(|note| {
            if note.time < position {
                ready.push(ScheduledNote {
                    offset: note.time.saturating_sub(block_start) as usize,
                    seq: note.seq,
                    event: note.event,
                });
                false
            } else {
                true
            }
        });

        if !self.ready.is_empty() {
            self.outstanding.fetch_sub(self.ready.len(), Ordering::AcqRel);
        }

        self.ready.sort_unstable_by_key(|note| (note.offset, note.seq));
        self.cursor = position;
        &self.ready
    }
}
