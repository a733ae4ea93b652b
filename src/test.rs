// src/test.rs
//
// End-to-end scenarios: a tree and a render loop linked by the bridge,
// driven through a backend that records everything it is given.

use std::thread;

use crate::bridge::{EngineInputs, create_bridge};
use crate::config::EngineConfig;
use crate::engine::{RenderLoop, RenderState};
use crate::error::{PortError, RenderError};
use crate::event::{NoteEvent, SampleTime};
use crate::instrument::InstrumentTree;
use crate::port::{CommandKind, ParamValue};
use crate::synth::{SynthBackend, SynthFault};
use crate::tree::{NullSink, SharedSink};

/// ===============================
/// Recording backend
/// ===============================

#[derive(Default)]
struct Recorder {
    /// Frames rendered so far; the position at which an event lands
    position: SampleTime,
    applied: Vec<(SampleTime, NoteEvent)>,
    params: Vec<(String, ParamValue)>,
}

impl SynthBackend for Recorder {
    fn prepare(&mut self, _sample_rate: u32, _max_block: usize) {
        self.position = 0;
    }

    fn set_param(&mut self, path: &str, value: ParamValue) {
        self.params.push((path.to_owned(), value));
    }

    fn apply(&mut self, event: &NoteEvent) {
        self.applied.push((self.position, *event));
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault> {
        left.fill(0.0);
        right.fill(0.0);
        self.position += left.len() as SampleTime;
        Ok(())
    }
}

fn setup(block_len: usize) -> (InstrumentTree, RenderLoop<Recorder>) {
    let config = EngineConfig::default().block_len(block_len);
    let (tree, inputs) = create_bridge("Synth", &config, NullSink).unwrap();
    (tree, RenderLoop::new(Recorder::default(), inputs, &config))
}

fn on(note: u8) -> NoteEvent {
    NoteEvent::NoteOn {
        channel: 0,
        note,
        velocity: 100,
    }
}

/// ===============================
/// Scenarios
/// ===============================

#[test]
fn test_resolve_spawned_command() {
    let (mut tree, _) = setup(256);
    let part = tree.part0().unwrap();
    let cmd = tree.spawn_command(part, "noteOn", CommandKind::NoteOn).unwrap();

    assert_eq!(tree.resolve("Synth/part0/noteOn").unwrap(), cmd.id());
    assert_eq!(tree.full_path(cmd.id()), "Synth/part0/noteOn");
    assert_eq!(tree.instrument_of(cmd.id()).unwrap(), tree.root());
}

#[test]
fn test_same_offset_events_apply_in_arrival_order() {
    let (mut tree, mut render) = setup(256);
    render.start(48_000).unwrap();

    tree.note_on_at(128, 0, 60, 100).unwrap();
    tree.note_off_at(128, 0, 60, 1).unwrap();

    assert_eq!(render.advance(), Ok(true));
    assert_eq!(render.samples_played(), 256);
    assert_eq!(
        render.synth().applied,
        vec![
            (128, on(60)),
            (
                128,
                NoteEvent::NoteOff {
                    channel: 0,
                    note: 60,
                    id: 1
                }
            ),
        ]
    );
}

#[test]
fn test_ten_blocks_at_44100() {
    let (_tree, mut render) = setup(512);
    render.set_sample_rate(44_100).unwrap();
    render.prepare().unwrap();

    for _ in 0..10 {
        assert_eq!(render.advance(), Ok(true));
    }
    assert_eq!(render.samples_played(), 5120);
    assert_eq!(render.state(), RenderState::Running);
}

#[test]
fn test_advance_before_prepare_fails() {
    let (_tree, mut render) = setup(512);
    assert_eq!(
        render.advance(),
        Err(RenderError::NotRunning(RenderState::Uninitialized))
    );
    assert_eq!(render.samples_played(), 0);

    render.set_sample_rate(44_100).unwrap();
    assert_eq!(
        render.advance(),
        Err(RenderError::NotRunning(RenderState::Prepared))
    );
    assert_eq!(render.samples_played(), 0);
}

/// ===============================
/// Properties
/// ===============================

#[test]
fn test_full_path_is_stable() {
    let (mut tree, _) = setup(256);
    let env = tree.resolve("Synth/part0/kit0/padpars/global/AmpEnvelope").unwrap();
    let sustain = tree.env_sustain(env).unwrap();

    let first = tree.full_path(sustain.id());
    tree.insefx0().unwrap();
    assert_eq!(tree.full_path(sustain.id()), first);
    assert_eq!(first, "Synth/part0/kit0/padpars/global/AmpEnvelope/Penvsustain");
}

#[test]
fn test_builder_returns_same_instance() {
    let (mut tree, _) = setup(256);
    let part = tree.part0().unwrap();
    let a = tree.kit0(part).unwrap();
    let b = tree.kit0(part).unwrap();
    let c = tree.resolve("Synth/part0/kit0").unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn test_events_delivered_exactly_once_in_order() {
    let (mut tree, mut render) = setup(128);
    render.start(48_000).unwrap();

    // Arrival order deliberately differs from time order
    let times: [SampleTime; 8] = [300, 10, 127, 10, 128, 500, 0, 300];
    for (i, &time) in times.iter().enumerate() {
        tree.note_on_at(time, 0, i as i32, 100).unwrap();
    }

    for _ in 0..5 {
        assert_eq!(render.advance(), Ok(true));
    }

    let applied = &render.synth().applied;
    assert_eq!(applied.len(), times.len());

    let positions: Vec<_> = applied.iter().map(|(pos, _)| *pos).collect();
    assert_eq!(positions, vec![0, 10, 10, 127, 128, 300, 300, 500]);

    let notes: Vec<_> = applied
        .iter()
        .map(|(_, event)| match event {
            NoteEvent::NoteOn { note, .. } => *note,
            NoteEvent::NoteOff { note, .. } => *note,
        })
        .collect();
    assert_eq!(notes, vec![6, 1, 3, 2, 4, 0, 7, 5]);
}

#[test]
fn test_late_event_lands_at_block_start() {
    let (mut tree, mut render) = setup(256);
    render.start(48_000).unwrap();
    render.advance().unwrap();
    render.advance().unwrap();

    tree.note_on_at(100, 0, 60, 100).unwrap();
    render.advance().unwrap();
    assert_eq!(render.synth().applied, vec![(512, on(60))]);
}

#[test]
fn test_sample_counter_is_monotonic() {
    for block_len in [1, 64, 333] {
        let (mut tree, mut render) = setup(block_len);
        render.start(48_000).unwrap();
        for k in 1..=12u64 {
            if k % 3 == 0 {
                tree.note_on(0, 60, 100).unwrap();
            }
            assert_eq!(render.advance(), Ok(true));
            assert_eq!(render.samples_played(), k * block_len as u64);
        }
    }
}

#[test]
fn test_printing_does_not_disturb_render() {
    let config = EngineConfig::default().block_len(64);
    let sink = SharedSink::new();
    let (mut tree, inputs): (InstrumentTree, EngineInputs) =
        create_bridge("Synth", &config, sink.clone()).unwrap();
    let mut render = RenderLoop::new(Recorder::default(), inputs, &config);
    render.start(48_000).unwrap();

    tree.resolve("Synth/part0/kit0/adpars/voice0").unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                tree.print_tree();
            }
        });

        for k in 1..=200u64 {
            assert_eq!(render.advance(), Ok(true));
            assert_eq!(render.samples_played(), k * 64);
        }
    });

    assert_eq!(sink.take().len(), 50 * 5);
}

#[test]
fn test_due_note_not_delayed_by_future_notes() {
    let config = EngineConfig::default().block_len(64).note_queue_capacity(4);
    let (mut tree, inputs) = create_bridge("Synth", &config, NullSink).unwrap();
    let mut render = RenderLoop::new(Recorder::default(), inputs, &config);
    render.start(48_000).unwrap();

    for note in 0..3 {
        tree.note_on_at(10_000, 0, note, 100).unwrap();
    }
    assert_eq!(render.advance(), Ok(true));

    tree.note_on_at(100, 0, 60, 100).unwrap();
    // Capacity counts notes still waiting for a later block
    assert_eq!(
        tree.note_on_at(100, 0, 61, 100),
        Err(PortError::QueueFull("Synth/noteOn".into()))
    );

    for _ in 0..3 {
        assert_eq!(render.advance(), Ok(true));
    }
    assert_eq!(render.samples_played(), 256);
    assert_eq!(render.synth().applied, vec![(100, on(60))]);
}

#[test]
fn test_notes_from_control_thread_while_rendering() {
    const COUNT: usize = 100;

    let config = EngineConfig::default().block_len(32);
    let (mut tree, inputs) = create_bridge("Synth", &config, NullSink).unwrap();
    let mut render = RenderLoop::new(Recorder::default(), inputs, &config);
    render.start(48_000).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..COUNT {
                // Mixed times: some ahead of the render position, many behind
                let time = (i as SampleTime * 37) % 1000;
                tree.note_on_at(time, 0, i as i32, 100).unwrap();
            }
        });

        let mut blocks = 0;
        while render.synth().applied.len() < COUNT {
            assert_eq!(render.advance(), Ok(true));
            blocks += 1;
            assert!(blocks < 10_000_000, "notes never arrived");
            thread::yield_now();
        }
    });

    // Drain anything that arrived after the last check
    assert_eq!(render.advance(), Ok(true));

    let applied = &render.synth().applied;
    assert_eq!(applied.len(), COUNT);

    let mut notes: Vec<u8> = applied
        .iter()
        .map(|(_, event)| match event {
            NoteEvent::NoteOn { note, .. } => *note,
            NoteEvent::NoteOff { note, .. } => *note,
        })
        .collect();

    // Positions never go backwards; equal positions keep push order
    for pair in applied.iter().zip(&notes).collect::<Vec<_>>().windows(2) {
        let ((pos_a, _), note_a) = pair[0];
        let ((pos_b, _), note_b) = pair[1];
        assert!(pos_a <= pos_b);
        if pos_a == pos_b {
            assert!(note_a < note_b);
        }
    }

    notes.sort_unstable();
    let expected: Vec<u8> = (0..COUNT as u8).collect();
    assert_eq!(notes, expected);
}

/// ===============================
/// Parameters and stop
/// ===============================

#[test]
fn test_param_writes_reach_backend_at_block_boundary() {
    let (mut tree, mut render) = setup(64);
    render.start(48_000).unwrap();

    let volume = tree.volume().unwrap();
    tree.write(volume, 80).unwrap();
    tree.dispatch("Synth/part0/Ppanning", &[ParamValue::Int(0)]).unwrap();
    assert!(render.synth().params.is_empty());

    render.advance().unwrap();
    assert_eq!(
        render.synth().params,
        vec![
            ("Synth/volume".to_owned(), ParamValue::Int(80)),
            ("Synth/part0/Ppanning".to_owned(), ParamValue::Int(0)),
        ]
    );
}

#[test]
fn test_stop_from_control_side() {
    let (tree, mut render) = setup(64);
    render.start(48_000).unwrap();
    assert_eq!(render.advance(), Ok(true));

    tree.request_stop();
    assert_eq!(render.advance(), Ok(false));
    assert_eq!(render.state(), RenderState::Stopped);
    assert_eq!(render.samples_played(), 64);
}
