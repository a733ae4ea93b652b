// src/tree/schema.rs
//
// Which builder slots each node kind declares.

use crate::port::{CommandKind, ParamDomain, ParamValue, PortSpec};

use super::{Lazy, NodeKind};

/// What a builder slot constructs on first access.
#[derive(Debug, Clone)]
pub enum SlotSpec {
    /// A structural node
    Node(NodeKind),
    /// A parameter port
    Param(PortSpec),
    /// A command port
    Command(CommandKind),
}

impl SlotSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            SlotSpec::Node(kind) => *kind,
            SlotSpec::Param(spec) => NodeKind::Param(spec.value_type()),
            SlotSpec::Command(kind) => NodeKind::Command(*kind),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Slot names
// ═══════════════════════════════════════════════════════════════════

pub mod names {
    pub const PART0: &str = "part0";
    pub const INSEFX0: &str = "insefx0";
    pub const VOLUME: &str = "volume";
    pub const NOTE_ON: &str = "noteOn";
    pub const NOTE_OFF: &str = "noteOff";

    pub const PARTEFX0: &str = "partefx0";
    pub const KIT0: &str = "kit0";
    pub const PANNING: &str = "Ppanning";

    pub const ADPARS: &str = "adpars";
    pub const PADPARS: &str = "padpars";

    pub const VOICE0: &str = "voice0";
    pub const GLOBAL: &str = "global";

    pub const AMP_ENVELOPE: &str = "AmpEnvelope";
    pub const ENV_SUSTAIN: &str = "Penvsustain";

    pub const EFFTYPE: &str = "efftype";
    pub const INSERT_PART: &str = "Pinsparts0";
}

// ═══════════════════════════════════════════════════════════════════
// Default domains
// ═══════════════════════════════════════════════════════════════════

/// 7-bit controller range shared by most parameters.
fn midi_range(default: i32) -> SlotSpec {
    SlotSpec::Param(PortSpec::new(ParamValue::Int(default)).domain(ParamDomain::range(0.0, 127.0)))
}

fn int_range(default: i32, min: i32, max: i32) -> SlotSpec {
    SlotSpec::Param(
        PortSpec::new(ParamValue::Int(default)).domain(ParamDomain::range(min as f64, max as f64)),
    )
}

/// Builder slots for a freshly created node of `kind`.
pub fn slots_for(kind: NodeKind) -> Vec<Lazy> {
    use names::*;

    match kind {
        NodeKind::Instrument => vec![
            Lazy::new(PART0, SlotSpec::Node(NodeKind::Part)),
            Lazy::new(INSEFX0, SlotSpec::Node(NodeKind::Effect)),
            Lazy::new(VOLUME, midi_range(100)),
            Lazy::new(NOTE_ON, SlotSpec::Command(CommandKind::NoteOn)),
            Lazy::new(NOTE_OFF, SlotSpec::Command(CommandKind::NoteOff)),
        ],
        NodeKind::Part => vec![
            Lazy::new(PARTEFX0, SlotSpec::Node(NodeKind::Effect)),
            Lazy::new(KIT0, SlotSpec::Node(NodeKind::Kit)),
            Lazy::new(PANNING, midi_range(64)),
        ],
        NodeKind::Kit => vec![
            Lazy::new(ADPARS, SlotSpec::Node(NodeKind::AddSynth)),
            Lazy::new(PADPARS, SlotSpec::Node(NodeKind::PadSynth)),
        ],
        NodeKind::AddSynth | NodeKind::PadSynth => vec![
            Lazy::new(VOICE0, SlotSpec::Node(NodeKind::Voice)),
            Lazy::new(GLOBAL, SlotSpec::Node(NodeKind::Global)),
        ],
        NodeKind::Global => vec![Lazy::new(AMP_ENVELOPE, SlotSpec::Node(NodeKind::AmpEnvelope))],
        NodeKind::AmpEnvelope => vec![Lazy::new(ENV_SUSTAIN, midi_range(127))],
        // 9 effect types; insertion target -2 = master, -1 = off
        NodeKind::Effect => vec![
            Lazy::new(EFFTYPE, int_range(0, 0, 8)),
            Lazy::new(INSERT_PART, int_range(-1, -2, 15)),
        ],
        NodeKind::Group | NodeKind::Voice | NodeKind::Param(_) | NodeKind::Command(_) => Vec::new(),
    }
}
