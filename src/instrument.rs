// src/instrument.rs
//
// Root of one instrument instance: the node tree plus the control-side
// ends of the render hand-off.

use std::sync::Arc;

use crate::error::{PortError, TreeError};
use crate::event::{NOW, NoteEvent, ParamChange, SampleTime};
use crate::handoff::{ParamSender, StopHandle};
use crate::notes::NoteSender;
use crate::port::{
    CommandKind, CommandRef, ParamDomain, ParamValue, PortRef, PortSpec, PortValue, ValueType,
};
use crate::tree::{DiagnosticSink, NodeId, NodeKind, NodeTree, PortKind, names};

/// The addressable tree of one instrument.
///
/// Every port in the tree is bound to this root, which owns the queues
/// that carry their effects to the render loop. All methods run on the
/// control context; none of them touch synthesis state directly.
///
/// The tree is `Send` but not `Sync`: build it from one context before
/// handing it to another.
pub struct InstrumentTree {
    nodes: NodeTree,
    root: NodeId,

    /// Note events to the render loop
    notes: NoteSender,

    /// Parameter writes to the render loop
    params: ParamSender,

    stop: StopHandle,

    /// Destination of `print_tree` / `print_parent_chain`
    sink: Box<dyn DiagnosticSink>,
}

impl InstrumentTree {
    pub(crate) fn new(
        name: &str,
        notes: NoteSender,
        params: ParamSender,
        stop: StopHandle,
        sink: Box<dyn DiagnosticSink>,
    ) -> Result<Self, TreeError> {
        let mut nodes = NodeTree::new();
        let root = nodes.add_root(name, NodeKind::Instrument)?;
        Ok(Self {
            nodes,
            root,
            notes,
            params,
            stop,
            sink,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn full_path(&self, id: NodeId) -> String {
        self.nodes.full_path(id)
    }

    /// Instrument root a node reaches through its ancestors.
    pub fn instrument_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        self.nodes.instrument_of(id)
    }

    pub fn resolve(&mut self, path: &str) -> Result<NodeId, TreeError> {
        self.nodes.resolve(path)
    }

    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.nodes.find(path)
    }

    /// Ask the render loop to stop at its next block.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    // ───────────────────────────────────────────────────────────────
    // Diagnostics
    // ───────────────────────────────────────────────────────────────

    /// Dump the whole built tree to the diagnostic sink.
    pub fn print_tree(&mut self) {
        self.nodes.print_tree(self.root, 0, self.sink.as_mut());
    }

    pub fn print_subtree(&mut self, id: NodeId, initial_depth: usize) {
        self.nodes.print_tree(id, initial_depth, self.sink.as_mut());
    }

    pub fn print_parent_chain(&mut self, id: NodeId) {
        self.nodes.print_parent_chain(id, self.sink.as_mut());
    }

    // ───────────────────────────────────────────────────────────────
    // Structure
    // ───────────────────────────────────────────────────────────────

    /// Child of a builder slot, built on first access.
    pub fn child(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.nodes.lazy_child(parent, name)
    }

    pub fn part0(&mut self) -> Result<NodeId, TreeError> {
        self.child(self.root, names::PART0)
    }

    pub fn insefx0(&mut self) -> Result<NodeId, TreeError> {
        self.child(self.root, names::INSEFX0)
    }

    pub fn partefx0(&mut self, part: NodeId) -> Result<NodeId, TreeError> {
        self.child(part, names::PARTEFX0)
    }

    pub fn kit0(&mut self, part: NodeId) -> Result<NodeId, TreeError> {
        self.child(part, names::KIT0)
    }

    pub fn adpars(&mut self, kit: NodeId) -> Result<NodeId, TreeError> {
        self.child(kit, names::ADPARS)
    }

    pub fn padpars(&mut self, kit: NodeId) -> Result<NodeId, TreeError> {
        self.child(kit, names::PADPARS)
    }

    pub fn voice0(&mut self, pars: NodeId) -> Result<NodeId, TreeError> {
        self.child(pars, names::VOICE0)
    }

    pub fn global(&mut self, pars: NodeId) -> Result<NodeId, TreeError> {
        self.child(pars, names::GLOBAL)
    }

    pub fn amp_envelope(&mut self, global: NodeId) -> Result<NodeId, TreeError> {
        self.child(global, names::AMP_ENVELOPE)
    }

    // ───────────────────────────────────────────────────────────────
    // Ports
    // ───────────────────────────────────────────────────────────────

    /// Typed handle to the parameter port of a builder slot.
    pub fn param<T: PortValue>(
        &mut self,
        parent: NodeId,
        name: &str,
    ) -> Result<PortRef<T>, PortError> {
        let id = self.child(parent, name)?;
        self.typed(id)
    }

    pub fn volume(&mut self) -> Result<PortRef<i32>, PortError> {
        self.param(self.root, names::VOLUME)
    }

    pub fn panning(&mut self, part: NodeId) -> Result<PortRef<i32>, PortError> {
        self.param(part, names::PANNING)
    }

    pub fn env_sustain(&mut self, amp_envelope: NodeId) -> Result<PortRef<i32>, PortError> {
        self.param(amp_envelope, names::ENV_SUSTAIN)
    }

    pub fn efftype(&mut self, effect: NodeId) -> Result<PortRef<i32>, PortError> {
        self.param(effect, names::EFFTYPE)
    }

    pub fn insert_part(&mut self, effect: NodeId) -> Result<PortRef<i32>, PortError> {
        self.param(effect, names::INSERT_PART)
    }

    /// Construct (or return the cached) parameter port `suffix` under `parent`.
    pub fn spawn_param<T: PortValue>(
        &mut self,
        parent: NodeId,
        suffix: &str,
        default: T,
        domain: ParamDomain,
    ) -> Result<PortRef<T>, PortError> {
        let spec = PortSpec::new(default.into_value()).domain(domain);
        let id = self.nodes.spawn(parent, suffix, PortKind::Param(spec))?;
        self.typed(id)
    }

    /// Construct (or return the cached) command port `suffix` under `parent`.
    pub fn spawn_command(
        &mut self,
        parent: NodeId,
        suffix: &str,
        kind: CommandKind,
    ) -> Result<CommandRef, TreeError> {
        let id = self.nodes.spawn(parent, suffix, PortKind::Command(kind))?;
        Ok(CommandRef::new(id, kind))
    }

    pub fn note_on_port(&mut self) -> Result<CommandRef, TreeError> {
        self.spawn_command(self.root, names::NOTE_ON, CommandKind::NoteOn)
    }

    pub fn note_off_port(&mut self) -> Result<CommandRef, TreeError> {
        self.spawn_command(self.root, names::NOTE_OFF, CommandKind::NoteOff)
    }

    fn typed<T: PortValue>(&self, id: NodeId) -> Result<PortRef<T>, PortError> {
        match self.nodes.kind(id)? {
            NodeKind::Param(found) if found == T::TYPE => Ok(PortRef::new(id)),
            NodeKind::Param(found) => Err(PortError::TypeMismatch {
                path: self.full_path(id),
                expected: T::TYPE,
                found,
            }),
            _ => Err(PortError::NotAPort(self.full_path(id))),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Reading and writing
    // ───────────────────────────────────────────────────────────────

    /// Current value of a parameter port.
    pub fn read<T: PortValue>(&self, port: PortRef<T>) -> Result<T, PortError> {
        let value = self.read_value(port.id())?;
        T::from_value(&value).ok_or_else(|| PortError::TypeMismatch {
            path: self.full_path(port.id()),
            expected: T::TYPE,
            found: value.value_type(),
        })
    }

    /// Validate and apply a new value.
    ///
    /// On success the value is stored and queued for the render loop. On
    /// failure nothing changes.
    pub fn write<T: PortValue>(&mut self, port: PortRef<T>, value: T) -> Result<(), PortError> {
        self.write_value(port.id(), value.into_value())
    }

    fn read_value(&self, id: NodeId) -> Result<ParamValue, PortError> {
        let node = self.nodes.get(id)?;
        match (node.kind(), node.port()) {
            (NodeKind::Param(_), Some(port)) => Ok(port.value()),
            (NodeKind::Command(_), _) => Err(PortError::WriteOnly(self.full_path(id))),
            _ => Err(PortError::NotAPort(self.full_path(id))),
        }
    }

    fn write_value(&mut self, id: NodeId, value: ParamValue) -> Result<(), PortError> {
        let Some(port) = self.nodes.port_mut(id) else {
            return Err(PortError::NotAPort(self.nodes.full_path(id)));
        };

        let expected = port.value.value_type();
        if value.value_type() != expected {
            return Err(PortError::TypeMismatch {
                path: port.path.to_string(),
                expected,
                found: value.value_type(),
            });
        }
        if !port.domain.contains(&value) {
            return Err(PortError::OutOfDomain {
                path: port.path.to_string(),
                value,
            });
        }

        let change = ParamChange {
            path: Arc::clone(&port.path),
            value,
        };
        if self.params.push(change).is_err() {
            return Err(PortError::QueueFull(port.path.to_string()));
        }
        port.value = value;
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Commands
    // ───────────────────────────────────────────────────────────────

    /// Fire a command port as soon as possible.
    ///
    /// Arguments are `(channel, note, velocity)` for note-on and
    /// `(channel, note, id)` for note-off.
    pub fn invoke(&mut self, cmd: CommandRef, a: i32, b: i32, c: i32) -> Result<(), PortError> {
        self.invoke_at(cmd, NOW, a, b, c)
    }

    /// Fire a command port at an absolute sample time.
    ///
    /// Times already in the past are applied at the start of the next block.
    pub fn invoke_at(
        &mut self,
        cmd: CommandRef,
        time: SampleTime,
        a: i32,
        b: i32,
        c: i32,
    ) -> Result<(), PortError> {
        if self.nodes.kind(cmd.id())? != NodeKind::Command(cmd.kind()) {
            return Err(PortError::NotAPort(self.full_path(cmd.id())));
        }

        let event = self.note_event(cmd, a, b, c)?;
        self.notes
            .push(time, event)
            .map_err(|_| PortError::QueueFull(self.nodes.full_path(cmd.id())))
    }

    fn note_event(&self, cmd: CommandRef, a: i32, b: i32, c: i32) -> Result<NoteEvent, PortError> {
        let in_range = |value: i32, max: u8| {
            u8::try_from(value)
                .ok()
                .filter(|v| *v <= max)
                .ok_or_else(|| PortError::OutOfDomain {
                    path: self.full_path(cmd.id()),
                    value: ParamValue::Int(value),
                })
        };

        let channel = in_range(a, 15)?;
        let note = in_range(b, 127)?;
        Ok(match cmd.kind() {
            CommandKind::NoteOn => NoteEvent::NoteOn {
                channel,
                note,
                velocity: in_range(c, 127)?,
            },
            CommandKind::NoteOff => NoteEvent::NoteOff { channel, note, id: c },
        })
    }

    pub fn note_on(&mut self, channel: i32, note: i32, velocity: i32) -> Result<(), PortError> {
        self.note_on_at(NOW, channel, note, velocity)
    }

    pub fn note_on_at(
        &mut self,
        time: SampleTime,
        channel: i32,
        note: i32,
        velocity: i32,
    ) -> Result<(), PortError> {
        let cmd = self.note_on_port()?;
        self.invoke_at(cmd, time, channel, note, velocity)
    }

    pub fn note_off(&mut self, channel: i32, note: i32, id: i32) -> Result<(), PortError> {
        self.note_off_at(NOW, channel, note, id)
    }

    pub fn note_off_at(
        &mut self,
        time: SampleTime,
        channel: i32,
        note: i32,
        id: i32,
    ) -> Result<(), PortError> {
        let cmd = self.note_off_port()?;
        self.invoke_at(cmd, time, channel, note, id)
    }

    // ───────────────────────────────────────────────────────────────
    // Path messaging
    // ───────────────────────────────────────────────────────────────

    /// Write a parameter or fire a command by path.
    ///
    /// Parameters take exactly one argument of their type; commands take
    /// three integers.
    pub fn dispatch(&mut self, path: &str, args: &[ParamValue]) -> Result<(), PortError> {
        let id = self.nodes.resolve(path)?;
        match self.nodes.kind(id)? {
            NodeKind::Param(_) => match args {
                [value] => self.write_value(id, *value),
                _ => Err(PortError::Arity {
                    path: path.to_owned(),
                    expected: 1,
                    found: args.len(),
                }),
            },
            NodeKind::Command(kind) => {
                let [a, b, c] = args else {
                    return Err(PortError::Arity {
                        path: path.to_owned(),
                        expected: CommandKind::ARITY,
                        found: args.len(),
                    });
                };
                let (a, b, c) = (int_arg(path, a)?, int_arg(path, b)?, int_arg(path, c)?);
                self.invoke(CommandRef::new(id, kind), a, b, c)
            }
            _ => Err(PortError::NotAPort(path.to_owned())),
        }
    }

    /// Current value of the parameter at `path`.
    pub fn query(&mut self, path: &str) -> Result<ParamValue, PortError> {
        let id = self.nodes.resolve(path)?;
        self.read_value(id)
    }
}

fn int_arg(path: &str, value: &ParamValue) -> Result<i32, PortError> {
    match *value {
        ParamValue::Int(v) => Ok(v),
        other => Err(PortError::TypeMismatch {
            path: path.to_owned(),
            expected: ValueType::Int,
            found: other.value_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EngineInputs, create_bridge};
    use crate::config::EngineConfig;
    use crate::tree::SharedSink;

    fn tree() -> (InstrumentTree, EngineInputs) {
        create_bridge("Synth", &EngineConfig::default(), SharedSink::new()).unwrap()
    }

    #[test]
    fn test_structure_accessors() {
        let (mut tree, _) = tree();
        let part = tree.part0().unwrap();
        let kit = tree.kit0(part).unwrap();
        let pad = tree.padpars(kit).unwrap();
        let voice = tree.voice0(pad).unwrap();
        assert_eq!(tree.full_path(voice), "Synth/part0/kit0/padpars/voice0");
        assert_eq!(tree.instrument_of(voice).unwrap(), tree.root());
        assert_eq!(tree.part0().unwrap(), part);
    }

    #[test]
    fn test_write_then_read() {
        let (mut tree, mut inputs) = tree();
        let part = tree.part0().unwrap();
        let pan = tree.panning(part).unwrap();
        assert_eq!(tree.read(pan).unwrap(), 64);

        tree.write(pan, 10).unwrap();
        assert_eq!(tree.read(pan).unwrap(), 10);

        let mut changes = Vec::new();
        inputs.params.drain(|c| changes.push(c.clone()));
        assert_eq!(changes.len(), 1);
        assert_eq!(&*changes[0].path, "Synth/part0/Ppanning");
        assert_eq!(changes[0].value, ParamValue::Int(10));
    }

    #[test]
    fn test_out_of_domain_write_is_rejected() {
        let (mut tree, mut inputs) = tree();
        let fx = tree.insefx0().unwrap();
        let efftype = tree.efftype(fx).unwrap();

        let err = tree.write(efftype, 9).unwrap_err();
        assert_eq!(
            err,
            PortError::OutOfDomain {
                path: "Synth/insefx0/efftype".into(),
                value: ParamValue::Int(9),
            }
        );
        assert_eq!(tree.read(efftype).unwrap(), 0);
        assert_eq!(inputs.params.drain(|_| {}), 0);

        let target = tree.insert_part(fx).unwrap();
        tree.write(target, -2).unwrap();
    }

    #[test]
    fn test_custom_domain_port() {
        let (mut tree, _) = tree();
        let part = tree.part0().unwrap();
        let even =
            ParamDomain::any().with_check(|v| matches!(v, ParamValue::Int(i) if i % 2 == 0));
        let port = tree.spawn_param(part, "Pkeyshift", 0, even).unwrap();
        assert!(tree.write(port, 4).is_ok());
        assert!(matches!(
            tree.write(port, 5),
            Err(PortError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_typed_access_checks_type() {
        let (mut tree, _) = tree();
        let err = tree.param::<f32>(tree.root(), names::VOLUME).unwrap_err();
        assert_eq!(
            err,
            PortError::TypeMismatch {
                path: "Synth/volume".into(),
                expected: ValueType::Float,
                found: ValueType::Int,
            }
        );
        assert!(matches!(
            tree.param::<i32>(tree.root(), names::PART0),
            Err(PortError::NotAPort(_))
        ));
    }

    #[test]
    fn test_invoke_validates_ranges() {
        let (mut tree, _) = tree();
        assert!(matches!(
            tree.note_on(16, 60, 100),
            Err(PortError::OutOfDomain { .. })
        ));
        assert!(matches!(
            tree.note_on(0, 128, 100),
            Err(PortError::OutOfDomain { .. })
        ));
        assert!(matches!(
            tree.note_on(0, 60, -1),
            Err(PortError::OutOfDomain { .. })
        ));
        assert!(tree.note_off(0, 60, -7).is_ok());
    }

    #[test]
    fn test_full_note_queue() {
        let config = EngineConfig::default().note_queue_capacity(1);
        let (mut tree, _inputs) = create_bridge("Synth", &config, SharedSink::new()).unwrap();
        tree.note_on(0, 60, 100).unwrap();
        assert_eq!(
            tree.note_on(0, 61, 100),
            Err(PortError::QueueFull("Synth/noteOn".into()))
        );
    }

    #[test]
    fn test_dispatch_and_query() {
        let (mut tree, mut inputs) = tree();
        tree.dispatch(
            "Synth/part0/kit0/adpars/global/AmpEnvelope/Penvsustain",
            &[ParamValue::Int(90)],
        )
        .unwrap();
        assert_eq!(
            tree.query("Synth/part0/kit0/adpars/global/AmpEnvelope/Penvsustain"),
            Ok(ParamValue::Int(90))
        );

        tree.dispatch(
            "Synth/noteOn",
            &[ParamValue::Int(1), ParamValue::Int(64), ParamValue::Int(90)],
        )
        .unwrap();
        let notes = inputs.notes.on_read(512);
        assert_eq!(
            notes[0].event,
            NoteEvent::NoteOn {
                channel: 1,
                note: 64,
                velocity: 90
            }
        );
    }

    #[test]
    fn test_dispatch_errors() {
        let (mut tree, _) = tree();
        assert_eq!(
            tree.dispatch("Synth/nothing", &[]),
            Err(PortError::Tree(TreeError::NoSuchPath("Synth/nothing".into())))
        );
        assert_eq!(
            tree.dispatch("Synth/volume", &[]),
            Err(PortError::Arity {
                path: "Synth/volume".into(),
                expected: 1,
                found: 0
            })
        );
        assert_eq!(
            tree.dispatch("Synth/volume", &[ParamValue::Float(1.0)]),
            Err(PortError::TypeMismatch {
                path: "Synth/volume".into(),
                expected: ValueType::Int,
                found: ValueType::Float
            })
        );
        let args = [ParamValue::Int(0), ParamValue::Bool(true), ParamValue::Int(0)];
        assert!(matches!(
            tree.dispatch("Synth/noteOff", &args),
            Err(PortError::TypeMismatch { .. })
        ));
        assert_eq!(
            tree.dispatch("Synth/part0", &[ParamValue::Int(1)]),
            Err(PortError::NotAPort("Synth/part0".into()))
        );
        assert_eq!(
            tree.query("Synth/noteOn"),
            Err(PortError::WriteOnly("Synth/noteOn".into()))
        );
    }

    #[test]
    fn test_print_tree_goes_to_injected_sink() {
        let sink = SharedSink::new();
        let (mut tree, _) = create_bridge("Synth", &EngineConfig::default(), sink.clone()).unwrap();
        let part = tree.part0().unwrap();
        tree.volume().unwrap();
        tree.print_tree();
        assert_eq!(sink.take(), vec!["- Synth", "  - part0", "  - volume"]);

        tree.print_parent_chain(part);
        assert_eq!(sink.take(), vec!["part0 -> ", "Synth -> ", "(root)"]);
    }
}
