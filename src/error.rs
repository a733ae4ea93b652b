// src/error.rs
//
// Error types shared across the tree, ports and render loop.

use thiserror::Error;

use crate::engine::RenderState;
use crate::port::{ParamValue, ValueType};
use crate::tree::{NodeId, NodeKind};

/// Structural errors: programming or configuration mistakes surfaced while
/// building the tree or resolving a path. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("no such path: {0}")]
    NoSuchPath(String),

    #[error("no ancestor of `{path}` provides an instrument")]
    NoInstrument { path: String },

    #[error("invalid node name `{0}`")]
    InvalidName(String),

    #[error("`{path}` already exists as {existing:?}")]
    KindMismatch { path: String, existing: NodeKind },

    #[error("`{0}` cannot have children")]
    Leaf(String),

    #[error("`{parent}` has no child slot `{name}`")]
    UnknownSlot { parent: String, name: String },

    #[error("node {0:?} does not belong to this tree")]
    InvalidNode(NodeId),
}

/// Errors raised synchronously to the caller of a port.
///
/// Render state is never touched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("value {value:?} is outside the domain of `{path}`")]
    OutOfDomain { path: String, value: ParamValue },

    #[error("`{path}` expects {expected:?}, got {found:?}")]
    TypeMismatch {
        path: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("`{path}` takes {expected} argument(s), got {found}")]
    Arity {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("`{0}` is a command and cannot be queried")]
    WriteOnly(String),

    #[error("`{0}` is not a port")]
    NotAPort(String),

    #[error("event queue for `{0}` is full")]
    QueueFull(String),
}

/// Precondition failures of the render loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render loop is not running (state: {0:?})")]
    NotRunning(RenderState),

    #[error("sample rate has not been set")]
    SampleRateUnknown,

    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),

    #[error("`{op}` is not allowed in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: RenderState,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("block length must be non-zero")]
    ZeroBlockLength,

    #[error("{name} capacity must be non-zero")]
    ZeroCapacity { name: &'static str },

    #[error("max_consecutive_faults must be non-zero")]
    ZeroFaultLimit,

    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),

    #[error("invalid instrument name `{0}`")]
    InvalidName(String),
}
