// src/tree/lazy.rs

use std::cell::OnceCell;

use super::{NodeId, SlotSpec};

/// A child slot that is built on first access and cached afterwards.
///
/// The name and spec are fixed when the owning node is created. Only the
/// arena can fill the slot, and `OnceCell` makes a second fill impossible,
/// so every access after the first returns the identical node.
///
/// Not thread-safe: the tree must be built from a single context.
#[derive(Debug)]
pub struct Lazy {
    name: &'static str,
    spec: SlotSpec,
    instance: OnceCell<NodeId>,
}

impl Lazy {
    pub(crate) fn new(name: &'static str, spec: SlotSpec) -> Self {
        Self {
            name,
            spec,
            instance: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn spec(&self) -> &SlotSpec {
        &self.spec
    }

    /// The cached instance, if it has been built.
    pub fn get(&self) -> Option<NodeId> {
        self.instance.get().copied()
    }

    /// Store the freshly built instance and return whatever the slot holds.
    pub(crate) fn fill(&self, id: NodeId) -> NodeId {
        *self.instance.get_or_init(|| id)
    }
}
