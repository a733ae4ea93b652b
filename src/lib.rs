// src/lib.rs
//
// Library entry point for Rust and FFI (iOS/Swift) consumers.

mod audio_buffer;
mod bridge;
mod config;
mod engine;
mod error;
mod event;
mod execution_plan;
mod handoff;
mod instrument;
mod notes;
mod port;
mod scheduler;
mod synth;

pub mod tree;

#[cfg(feature = "ios")]
pub mod ffi;

#[cfg(test)]
mod test;

// Re-export key types for Rust consumers
pub use audio_buffer::StereoBuffer;
pub use bridge::{EngineInputs, create_bridge};
pub use config::EngineConfig;
pub use engine::{RenderLoop, RenderState};
pub use error::{ConfigError, PortError, RenderError, TreeError};
pub use event::{NOW, NoteEvent, ParamChange, SampleTime, ScheduledNote};
pub use execution_plan::{BlockPlan, SlicePlan};
pub use handoff::{ParamInput, ParamSender, StopHandle, param_channel};
pub use instrument::InstrumentTree;
pub use notes::{NoteSender, NotesInput, note_channel};
pub use port::{
    CommandKind, CommandRef, ParamDomain, ParamValue, PortRef, PortSpec, PortValue, ValueType,
};
pub use scheduler::compile_block;
pub use synth::{Silence, SynthBackend, SynthFault};
pub use tree::{DiagnosticSink, LogSink, NodeId, NodeKind, NullSink, SharedSink};
