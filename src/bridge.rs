//! Links the control side and the render side of one instrument.
//!
//! # Architecture
//!
//! - **Control context** owns the [`InstrumentTree`]: path resolution,
//!   parameter writes, command invocation, diagnostics
//! - **Render context** owns the [`RenderLoop`](crate::RenderLoop), built
//!   from the [`EngineInputs`] returned here
//! - Note events and parameter writes travel through lock-free SPSC ring
//!   buffers; stop requests through a shared atomic flag
//!
//! # Usage
//!
//! ```ignore
//! let config = EngineConfig::default();
//! let (mut tree, inputs) = create_bridge("Synth", &config, LogSink)?;
//! let mut render = RenderLoop::new(backend, inputs, &config);
//!
//! // Control context
//! tree.note_on(0, 60, 100)?;
//!
//! // Render context
//! render.start(48_000)?;
//! while render.advance()? { /* hand render.output() to the device */ }
//! ```

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::handoff::{ParamInput, StopHandle, param_channel};
use crate::instrument::InstrumentTree;
use crate::notes::{NotesInput, note_channel};
use crate::tree::DiagnosticSink;

/// Render-side ends of the hand-off, consumed by `RenderLoop::new`.
pub struct EngineInputs {
    pub notes: NotesInput,
    pub params: ParamInput,
    pub stop: StopHandle,
}

/// Create an instrument tree rooted at `name` and the matching render inputs.
pub fn create_bridge(
    name: &str,
    config: &EngineConfig,
    sink: impl DiagnosticSink + 'static,
) -> Result<(InstrumentTree, EngineInputs), ConfigError> {
    config.validate()?;

    let (note_tx, notes) = note_channel(config.note_queue_capacity);
    let (param_tx, params) = param_channel(config.param_queue_capacity);
    let stop = StopHandle::new();

    let tree = InstrumentTree::new(name, note_tx, param_tx, stop.clone(), Box::new(sink))
        .map_err(|_| ConfigError::InvalidName(name.to_owned()))?;

    Ok((tree, EngineInputs { notes, params, stop }))
}
