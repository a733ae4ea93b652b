// src/tree/node.rs

use std::fmt;

use crate::port::{CommandKind, PortState, ValueType};

use super::Lazy;

/// Index of a node in its tree's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node represents in the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of one instrument instance
    Instrument,
    /// Plain container without instrument access
    Group,
    Part,
    Kit,
    AddSynth,
    PadSynth,
    Voice,
    Global,
    AmpEnvelope,
    Effect,
    /// Parameter port leaf
    Param(ValueType),
    /// Write-only command port leaf
    Command(CommandKind),
}

/// Behavior flags derived from a node's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub has_children: bool,
    pub is_port: bool,
    pub is_command: bool,
    pub provides_instrument: bool,
}

impl NodeKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            NodeKind::Instrument => Capabilities {
                has_children: true,
                provides_instrument: true,
                ..Default::default()
            },
            NodeKind::Param(_) => Capabilities {
                is_port: true,
                ..Default::default()
            },
            NodeKind::Command(_) => Capabilities {
                is_port: true,
                is_command: true,
                ..Default::default()
            },
            _ => Capabilities {
                has_children: true,
                ..Default::default()
            },
        }
    }
}

/// One slot in the arena.
#[derive(Debug)]
pub struct NodeData {
    pub(crate) name: String,
    /// Set once at construction
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    /// Builder slots declared by the kind's schema
    pub(crate) lazy: Vec<Lazy>,
    /// Present on parameter ports only
    pub(crate) port: Option<PortState>,
    /// Instrument root a port was bound to when spawned
    pub(crate) bound: Option<NodeId>,
}

impl NodeData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn port(&self) -> Option<&PortState> {
        self.port.as_ref()
    }

    pub fn bound_instrument(&self) -> Option<NodeId> {
        self.bound
    }
}
