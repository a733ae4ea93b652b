// src/tree/arena.rs
//
// Arena storage for the node tree, path derivation and lookup.

use std::sync::Arc;

use crate::error::TreeError;
use crate::port::{CommandKind, PortSpec, PortState};

use super::{slots_for, DiagnosticSink, NodeData, NodeId, NodeKind, SlotSpec};

/// A port that can be spawned under a node.
#[derive(Debug, Clone)]
pub enum PortKind {
    Param(PortSpec),
    Command(CommandKind),
}

impl From<PortKind> for SlotSpec {
    fn from(port: PortKind) -> Self {
        match port {
            PortKind::Param(spec) => SlotSpec::Param(spec),
            PortKind::Command(kind) => SlotSpec::Command(kind),
        }
    }
}

/// Owning storage for every node of one or more trees.
///
/// Nodes are never removed, so a `NodeId` handed out by this arena stays
/// valid for the arena's lifetime. The shape only grows: a node's parent is
/// fixed at insertion.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<NodeData>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a parentless node.
    pub fn add_root(&mut self, name: &str, kind: NodeKind) -> Result<NodeId, TreeError> {
        validate_name(name)?;
        Ok(self.insert(None, name.to_owned(), kind, None, None))
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        name: String,
        kind: NodeKind,
        port: Option<PortState>,
        bound: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            name,
            parent,
            kind,
            children: Vec::new(),
            lazy: slots_for(kind),
            port,
            bound,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        self.nodes.get(id.index()).ok_or(TreeError::InvalidNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, TreeError> {
        self.get(id).map(NodeData::kind)
    }

    pub(crate) fn port_mut(&mut self, id: NodeId) -> Option<&mut PortState> {
        self.nodes.get_mut(id.index()).and_then(|n| n.port.as_mut())
    }

    /// Existing child with the given name (does not build lazy slots).
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(parent.index())?;
        node.children
            .iter()
            .copied()
            .find(|child| self.nodes[child.index()].name == name)
    }

    fn root_named(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.parent.is_none() && n.name == name)
            .map(|i| NodeId(i as u32))
    }

    fn has_slot(&self, parent: NodeId, name: &str) -> bool {
        self.nodes
            .get(parent.index())
            .is_some_and(|n| n.lazy.iter().any(|slot| slot.name() == name))
    }

    // ───────────────────────────────────────────────────────────────
    // Addressing
    // ───────────────────────────────────────────────────────────────

    /// Slash-separated path from the root to `id`.
    ///
    /// The root's path is its bare name, without a leading separator.
    pub fn full_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = self.nodes.get(id.index());
        while let Some(node) = cursor {
            segments.push(node.name.as_str());
            cursor = node.parent.and_then(|p| self.nodes.get(p.index()));
        }
        segments.reverse();
        segments.join("/")
    }

    /// Nearest node, starting at `id` itself, that provides an instrument.
    pub fn instrument_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current)?;
            if node.kind.capabilities().provides_instrument {
                return Ok(current);
            }
            cursor = node.parent;
        }
        Err(TreeError::NoInstrument {
            path: self.full_path(id),
        })
    }

    /// Look up an existing node by path without building anything.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('/');
        let mut cursor = self.root_named(segments.next()?)?;
        for segment in segments {
            cursor = self.child_named(cursor, segment)?;
        }
        Some(cursor)
    }

    /// Resolve a path, building builder slots along the way.
    pub fn resolve(&mut self, path: &str) -> Result<NodeId, TreeError> {
        let no_such_path = || TreeError::NoSuchPath(path.to_owned());

        let mut segments = path.split('/');
        let first = segments.next().unwrap_or_default();
        let mut cursor = self.root_named(first).ok_or_else(no_such_path)?;

        for segment in segments {
            cursor = match self.child_named(cursor, segment) {
                Some(child) => child,
                None if self.has_slot(cursor, segment) => self.lazy_child(cursor, segment)?,
                None => return Err(no_such_path()),
            };
        }
        Ok(cursor)
    }

    // ───────────────────────────────────────────────────────────────
    // Construction
    // ───────────────────────────────────────────────────────────────

    /// Child of the builder slot `name`, built on first access.
    pub fn lazy_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        let node = self.get(parent)?;
        let Some(slot_index) = node.lazy.iter().position(|slot| slot.name() == name) else {
            return Err(TreeError::UnknownSlot {
                parent: self.full_path(parent),
                name: name.to_owned(),
            });
        };

        let slot = &node.lazy[slot_index];
        if let Some(built) = slot.get() {
            return Ok(built);
        }

        let (slot_name, spec) = (slot.name(), slot.spec().clone());
        let built = self.construct(parent, slot_name, spec)?;
        Ok(self.nodes[parent.index()].lazy[slot_index].fill(built))
    }

    /// Construct (or return the cached) port `suffix` under `parent`.
    ///
    /// The port is bound to the instrument reachable from `parent`.
    pub fn spawn(
        &mut self,
        parent: NodeId,
        suffix: &str,
        port: PortKind,
    ) -> Result<NodeId, TreeError> {
        validate_name(suffix)?;

        let node = self.get(parent)?;
        if !node.kind.capabilities().has_children {
            return Err(TreeError::Leaf(self.full_path(parent)));
        }
        self.instrument_of(parent)?;

        let wanted = SlotSpec::from(port);
        let existing = if self.has_slot(parent, suffix) {
            Some(self.lazy_child(parent, suffix)?)
        } else {
            self.child_named(parent, suffix)
        };

        match existing {
            Some(id) => {
                let kind = self.nodes[id.index()].kind;
                if kind == wanted.kind() {
                    Ok(id)
                } else {
                    Err(TreeError::KindMismatch {
                        path: self.full_path(id),
                        existing: kind,
                    })
                }
            }
            None => self.construct(parent, suffix, wanted),
        }
    }

    fn construct(
        &mut self,
        parent: NodeId,
        name: &str,
        spec: SlotSpec,
    ) -> Result<NodeId, TreeError> {
        let id = match spec {
            SlotSpec::Node(kind) => self.insert(Some(parent), name.to_owned(), kind, None, None),
            SlotSpec::Param(spec) => {
                let instrument = self.instrument_of(parent)?;
                let path: Arc<str> = format!("{}/{}", self.full_path(parent), name).into();
                let kind = NodeKind::Param(spec.value_type());
                let port = PortState::new(path, spec);
                self.insert(Some(parent), name.to_owned(), kind, Some(port), Some(instrument))
            }
            SlotSpec::Command(kind) => {
                let instrument = self.instrument_of(parent)?;
                self.insert(
                    Some(parent),
                    name.to_owned(),
                    NodeKind::Command(kind),
                    None,
                    Some(instrument),
                )
            }
        };
        log::debug!("built {}", self.full_path(id));
        Ok(id)
    }

    // ───────────────────────────────────────────────────────────────
    // Introspection
    // ───────────────────────────────────────────────────────────────

    /// Depth-first walk over the built subtree at `id`.
    pub fn walk<F>(&self, id: NodeId, depth: usize, visit: &mut F)
    where
        F: FnMut(NodeId, &NodeData, usize),
    {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        visit(id, node, depth);
        for &child in &node.children {
            self.walk(child, depth + 1, visit);
        }
    }

    /// Indented dump of the built subtree at `id`.
    pub fn print_tree(&self, id: NodeId, initial_depth: usize, sink: &mut dyn DiagnosticSink) {
        self.walk(id, initial_depth, &mut |_, node, depth| {
            let mut line = "  ".repeat(depth);
            line.push_str("- ");
            line.push_str(&node.name);
            sink.line(&line);
        });
    }

    /// One line per node from `id` up to its root.
    pub fn print_parent_chain(&self, id: NodeId, sink: &mut dyn DiagnosticSink) {
        let mut cursor = self.nodes.get(id.index());
        while let Some(node) = cursor {
            sink.line(&format!("{} -> ", node.name));
            cursor = node.parent.and_then(|p| self.nodes.get(p.index()));
        }
        sink.line("(root)");
    }
}

fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() || name.contains('/') {
        return Err(TreeError::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{ParamValue, ValueType};
    use crate::tree::names;

    fn instrument() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new();
        let root = tree.add_root("Synth", NodeKind::Instrument).unwrap();
        (tree, root)
    }

    #[test]
    fn test_root_path_has_no_separator() {
        let (tree, root) = instrument();
        assert_eq!(tree.full_path(root), "Synth");
    }

    #[test]
    fn test_nested_paths() {
        let (mut tree, root) = instrument();
        let part = tree.lazy_child(root, names::PART0).unwrap();
        let kit = tree.lazy_child(part, names::KIT0).unwrap();
        let adpars = tree.lazy_child(kit, names::ADPARS).unwrap();
        let global = tree.lazy_child(adpars, names::GLOBAL).unwrap();
        let env = tree.lazy_child(global, names::AMP_ENVELOPE).unwrap();
        assert_eq!(
            tree.full_path(env),
            "Synth/part0/kit0/adpars/global/AmpEnvelope"
        );
        assert_eq!(tree.get(env).unwrap().parent(), Some(global));
    }

    #[test]
    fn test_lazy_child_is_cached() {
        let (mut tree, root) = instrument();
        let first = tree.lazy_child(root, names::PART0).unwrap();
        let second = tree.lazy_child(root, names::PART0).unwrap();
        let third = tree.lazy_child(root, names::PART0).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(tree.get(root).unwrap().children().len(), 1);
    }

    #[test]
    fn test_unknown_slot() {
        let (mut tree, root) = instrument();
        let err = tree.lazy_child(root, "part9").unwrap_err();
        assert!(matches!(err, TreeError::UnknownSlot { .. }));
    }

    #[test]
    fn test_spawn_returns_cached_port() {
        let (mut tree, root) = instrument();
        let part = tree.lazy_child(root, names::PART0).unwrap();
        let spec = PortKind::Param(PortSpec::new(ParamValue::Float(0.5)));
        let a = tree.spawn(part, "Pdetune", spec.clone()).unwrap();
        let b = tree.spawn(part, "Pdetune", spec).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.full_path(a), "Synth/part0/Pdetune");
        assert_eq!(tree.get(a).unwrap().bound_instrument(), Some(root));
        assert_eq!(tree.get(a).unwrap().port().unwrap().path(), "Synth/part0/Pdetune");
    }

    #[test]
    fn test_spawn_onto_schema_slot_checks_kind() {
        let (mut tree, root) = instrument();
        let part = tree.lazy_child(root, names::PART0).unwrap();

        let int_port = PortKind::Param(PortSpec::new(ParamValue::Int(0)));
        let slot = tree.spawn(part, names::PANNING, int_port).unwrap();
        assert_eq!(slot, tree.lazy_child(part, names::PANNING).unwrap());

        let float_port = PortKind::Param(PortSpec::new(ParamValue::Float(0.0)));
        let err = tree.spawn(part, names::PANNING, float_port).unwrap_err();
        assert_eq!(
            err,
            TreeError::KindMismatch {
                path: "Synth/part0/Ppanning".into(),
                existing: NodeKind::Param(ValueType::Int),
            }
        );
    }

    #[test]
    fn test_spawn_without_instrument_fails() {
        let mut tree = NodeTree::new();
        let group = tree.add_root("scratch", NodeKind::Group).unwrap();
        let err = tree
            .spawn(group, "noteOn", PortKind::Command(CommandKind::NoteOn))
            .unwrap_err();
        assert_eq!(
            err,
            TreeError::NoInstrument {
                path: "scratch".into()
            }
        );
    }

    #[test]
    fn test_spawn_rejects_bad_names_and_leaves() {
        let (mut tree, root) = instrument();
        let cmd = PortKind::Command(CommandKind::NoteOn);
        assert!(matches!(
            tree.spawn(root, "a/b", cmd.clone()),
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            tree.spawn(root, "", cmd.clone()),
            Err(TreeError::InvalidName(_))
        ));

        let volume = tree.lazy_child(root, names::VOLUME).unwrap();
        assert_eq!(
            tree.spawn(volume, "x", cmd),
            Err(TreeError::Leaf("Synth/volume".into()))
        );
    }

    #[test]
    fn test_resolve_builds_slots() {
        let (mut tree, _) = instrument();
        assert_eq!(tree.find("Synth/part0/kit0"), None);

        let kit = tree.resolve("Synth/part0/kit0").unwrap();
        assert_eq!(tree.full_path(kit), "Synth/part0/kit0");
        assert_eq!(tree.find("Synth/part0/kit0"), Some(kit));
        assert_eq!(tree.resolve("Synth/part0/kit0").unwrap(), kit);
    }

    #[test]
    fn test_resolve_unknown_segment() {
        let (mut tree, _) = instrument();
        for path in ["Synth/part1", "Other/part0", "/Synth/part0", "", "Synth/part0/"] {
            assert_eq!(
                tree.resolve(path),
                Err(TreeError::NoSuchPath(path.to_owned())),
                "{path}"
            );
        }
    }

    #[test]
    fn test_resolve_root() {
        let (mut tree, root) = instrument();
        assert_eq!(tree.resolve("Synth").unwrap(), root);
    }

    #[test]
    fn test_print_tree() {
        let (mut tree, root) = instrument();
        tree.resolve("Synth/part0/kit0").unwrap();
        tree.resolve("Synth/insefx0").unwrap();

        let mut lines: Vec<String> = Vec::new();
        tree.print_tree(root, 0, &mut lines);
        assert_eq!(lines, vec!["- Synth", "  - part0", "    - kit0", "  - insefx0"]);
    }

    #[test]
    fn test_print_parent_chain() {
        let (mut tree, _) = instrument();
        let kit = tree.resolve("Synth/part0/kit0").unwrap();

        let mut lines: Vec<String> = Vec::new();
        tree.print_parent_chain(kit, &mut lines);
        assert_eq!(lines, vec!["kit0 -> ", "part0 -> ", "Synth -> ", "(root)"]);
    }
}
