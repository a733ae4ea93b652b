// src/main.rs
//
// Sanity run: build an instrument tree, drive it by path and render a few
// blocks through a test backend.

use synthtree::{
    EngineConfig, LogSink, NoteEvent, ParamValue, RenderLoop, SynthBackend, SynthFault,
    create_bridge,
};

/// ===============================
/// Test Backend
/// ===============================

/// Outputs a constant level per held note, scaled by the volume port.
struct ConstantSynth {
    held: usize,
    gain: f32,
}

impl SynthBackend for ConstantSynth {
    fn prepare(&mut self, _sample_rate: u32, _max_block: usize) {}

    fn set_param(&mut self, path: &str, value: ParamValue) {
        if path.ends_with("/volume") {
            self.gain = value.as_f64() as f32 / 127.0;
        }
    }

    fn apply(&mut self, event: &NoteEvent) {
        match event {
            NoteEvent::NoteOn { .. } => self.held += 1,
            NoteEvent::NoteOff { .. } => self.held = self.held.saturating_sub(1),
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault> {
        let level = 0.1 * self.held as f32 * self.gain;
        left.fill(level);
        right.fill(level);
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::default().block_len(256);

    // --------------------------------
    // Tree
    // --------------------------------

    let (mut tree, inputs) = match create_bridge("Synth", &config, LogSink) {
        Ok(pair) => pair,
        Err(err) => {
            log::error!("invalid configuration: {err}");
            return;
        }
    };

    let setup = [
        ("Synth/volume", ParamValue::Int(127)),
        ("Synth/part0/Ppanning", ParamValue::Int(32)),
        (
            "Synth/part0/kit0/adpars/global/AmpEnvelope/Penvsustain",
            ParamValue::Int(100),
        ),
        ("Synth/insefx0/efftype", ParamValue::Int(3)),
    ];
    for (path, value) in setup {
        if let Err(err) = tree.dispatch(path, &[value]) {
            log::warn!("{path}: {err}");
        }
    }

    tree.print_tree();

    // --------------------------------
    // Render loop
    // --------------------------------

    let synth = ConstantSynth { held: 0, gain: 1.0 };
    let mut render = RenderLoop::new(synth, inputs, &config);
    if let Err(err) = render.start(config.sample_rate) {
        log::error!("could not start render loop: {err}");
        return;
    }

    let schedule = [(100, 60), (300, 64), (700, 67)];
    for (time, note) in schedule {
        if let Err(err) = tree.note_on_at(time, 0, note, 100) {
            log::warn!("note {note}: {err}");
        }
    }
    if let Err(err) = tree.note_off_at(900, 0, 60, 0) {
        log::warn!("note off: {err}");
    }

    log::info!("Starting render sanity test…");

    for block in 0..4 {
        match render.advance() {
            Ok(true) => {
                let (left, _) = render.output();
                log::info!(
                    "block {block}: first={:.3} last={:.3}",
                    left[0],
                    left[left.len() - 1]
                );
            }
            Ok(false) => break,
            Err(err) => {
                log::error!("advance failed: {err}");
                break;
            }
        }
    }

    tree.request_stop();
    match render.advance() {
        Ok(running) => log::info!("stop requested, still running: {running}"),
        Err(err) => log::error!("advance failed: {err}"),
    }
    log::info!("done after {} samples", render.samples_played());
}
