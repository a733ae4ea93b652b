// src/scheduler.rs

use crate::event::{SampleTime, ScheduledNote};
use crate::execution_plan::{BlockPlan, SlicePlan};

/// Split a block at the offsets of its events.
///
/// `notes` must already be ordered by offset (as returned by
/// `NotesInput::on_read`). Events sharing an offset land in the same slice,
/// keeping their arrival order.
///
/// Real-time safe as long as `plan` was created with enough capacity.
pub fn compile_block(
    plan: &mut BlockPlan,
    block_start_sample: SampleTime,
    block_frames: usize,
    notes: &[ScheduledNote],
) {
    plan.block_start_sample = block_start_sample;
    plan.block_frames = block_frames;
    plan.slices.clear();

    // If no events, emit single slice for whole block
    if notes.is_empty() {
        plan.slices.push(SlicePlan {
            frame_offset: 0,
            frame_count: block_frames,
            events: 0..0,
        });
        return;
    }

    let mut event_index = 0;
    let mut cursor_frame = 0usize;

    while cursor_frame < block_frames {
        // Collect events at current position
        let first_event = event_index;
        while event_index < notes.len() && notes[event_index].offset <= cursor_frame {
            event_index += 1;
        }

        // Find next event boundary (or end of block)
        let next_boundary_frame = notes
            .get(event_index)
            .map(|note| note.offset)
            .unwrap_or(block_frames)
            .min(block_frames);

        plan.slices.push(SlicePlan {
            frame_offset: cursor_frame,
            frame_count: next_boundary_frame - cursor_frame,
            events: first_event..event_index,
        });
        cursor_frame = next_boundary_frame;
    }

    // Offsets at or past the end attach to the last slice
    if event_index < notes.len() {
        if let Some(last) = plan.slices.last_mut() {
            last.events.end = notes.len();
        }
    }

    debug_assert!(
        plan.slices.iter().map(|s| s.frame_count).sum::<usize>() == plan.block_frames,
        "Slice frames don't sum to block frames: {} != {}",
        plan.slices.iter().map(|s| s.frame_count).sum::<usize>(),
        plan.block_frames
    );
}
