// src/synth.rs

use thiserror::Error;

use crate::event::NoteEvent;
use crate::port::ParamValue;

/// A failure inside the synthesis backend while rendering.
///
/// The render loop answers it with a silent block; it is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SynthFault {
    #[error("synthesis backend underrun")]
    Underrun,

    #[error("synthesis backend failed")]
    Failed,
}

/// The synthesis capability driven by the render loop.
///
/// Backends:
/// - do NOT know about the node tree or its queues
/// - do NOT allocate or block in `apply`, `set_param` or `render`
/// - ONLY produce audio for the frames they are given
pub trait SynthBackend: Send {
    /// Called from `prepare()`, before the first block.
    fn prepare(&mut self, sample_rate: u32, max_block: usize);

    /// Apply a parameter write addressed by its port path.
    fn set_param(&mut self, path: &str, value: ParamValue);

    /// Apply a note event at the current position.
    ///
    /// The render loop guarantees all frames before the event's offset
    /// have already been rendered.
    fn apply(&mut self, event: &NoteEvent);

    /// Render the next `left.len()` frames (`left` and `right` have equal
    /// length).
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault>;

    /// End of stream: the render loop stops once this returns true.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Backend that renders silence and ignores all input.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl SynthBackend for Silence {
    fn prepare(&mut self, _sample_rate: u32, _max_block: usize) {}

    fn set_param(&mut self, _path: &str, _value: ParamValue) {}

    fn apply(&mut self, _event: &NoteEvent) {}

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault> {
        left.fill(0.0);
        right.fill(0.0);
        Ok(())
    }
}

impl<S: SynthBackend + ?Sized> SynthBackend for Box<S> {
    fn prepare(&mut self, sample_rate: u32, max_block: usize) {
        (**self).prepare(sample_rate, max_block);
    }

    fn set_param(&mut self, path: &str, value: ParamValue) {
        (**self).set_param(path, value);
    }

    fn apply(&mut self, event: &NoteEvent) {
        (**self).apply(event);
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault> {
        (**self).render(left, right)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}
