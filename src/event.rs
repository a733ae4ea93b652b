// src/event.rs

use std::sync::Arc;

use crate::port::ParamValue;

/// Absolute position in samples since the last `prepare()`.
pub type SampleTime = u64;

/// Apply as early as possible: clamps to the start of the next block.
pub const NOW: SampleTime = 0;

/// ===============================
/// Note events
/// ===============================

/// A discrete note event produced by a command port.
///
/// These events:
/// - are plain data (Copy), safe to move across the hand-off
/// - never touch synthesis state on the control side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },

    NoteOff { channel: u8, note: u8, id: i32 },
}

/// A note event as queued by the control context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedNote {
    /// Requested absolute sample time
    pub time: SampleTime,

    /// Arrival order, used to break ties between equal offsets
    pub seq: u64,

    pub event: NoteEvent,
}

/// A note event resolved against a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledNote {
    /// Frame offset inside the block
    pub offset: usize,

    pub seq: u64,

    pub event: NoteEvent,
}

/// ===============================
/// Parameter changes
/// ===============================

/// A validated parameter write, applied at the start of the next block.
///
/// The path is shared with the tree, so dropping it on the render side
/// never frees memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub path: Arc<str>,
    pub value: ParamValue,
}
