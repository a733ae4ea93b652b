use std::ops::Range;

use crate::event::SampleTime;

//
// ===============================
// MARK: Block plan (scheduler -> render loop)
// ===============================
//

/// A precompiled plan for rendering one audio block.
///
/// Produced by the scheduler, consumed by the render loop.
///
/// Invariants:
/// - slices are contiguous and cover `0..block_frames`
/// - no allocation once constructed with enough capacity
#[derive(Debug, Clone)]
pub struct BlockPlan {
    /// Absolute sample position where this block starts
    pub block_start_sample: SampleTime,

    /// Total number of frames in this block
    pub block_frames: usize,

    /// Event-free slices
    pub slices: Vec<SlicePlan>,
}

impl BlockPlan {
    /// Plan storage able to hold `max_events` distinct offsets.
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            block_start_sample: 0,
            block_frames: 0,
            slices: Vec::with_capacity(max_events + 1),
        }
    }
}

//
// ===============================
// MARK: Slice plan
// ===============================
//

/// A contiguous region of frames within a block.
///
/// Invariants:
/// - no event occurs inside a slice
/// - the backend renders the entire slice in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Frame offset of the slice inside the block
    pub frame_offset: usize,

    /// Number of frames to render
    pub frame_count: usize,

    /// Indices of the block's events to apply *before* this slice runs
    pub events: Range<usize>,
}

impl SlicePlan {
    #[inline]
    pub fn frames(&self) -> Range<usize> {
        self.frame_offset..self.frame_offset + self.frame_count
    }
}
