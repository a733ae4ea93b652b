// src/engine.rs

use std::time::Duration;

use crate::audio_buffer::StereoBuffer;
use crate::bridge::EngineInputs;
use crate::config::EngineConfig;
use crate::error::RenderError;
use crate::event::SampleTime;
use crate::execution_plan::BlockPlan;
use crate::handoff::{ParamInput, StopHandle};
use crate::notes::NotesInput;
use crate::scheduler::compile_block;
use crate::synth::SynthBackend;

/// Lifecycle of a render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
    Uninitialized,
    /// Sample rate known, buffers not yet allocated
    Prepared,
    Running,
    /// Terminal
    Stopped,
}

/// Real-time render loop.
///
/// `advance()` runs on the caller's audio context. On its normal path it
/// must be deterministic, allocation-free, and lock-free. Threading and
/// device timing belong to the caller.
pub struct RenderLoop<S: SynthBackend> {
    synth: S,

    notes: NotesInput,
    params: ParamInput,
    stop: StopHandle,

    state: RenderState,
    sample_rate: Option<u32>,
    block_len: usize,

    /// Real-time duration of one block, derived from the sample rate
    block_duration: Option<Duration>,

    /// Frames rendered since the last `prepare()`
    samples_played: SampleTime,

    output: StereoBuffer,
    plan: BlockPlan,

    consecutive_faults: u32,
    max_consecutive_faults: u32,
}

impl<S: SynthBackend> RenderLoop<S> {
    pub fn new(synth: S, inputs: EngineInputs, config: &EngineConfig) -> Self {
        let EngineInputs {
            notes,
            params,
            stop,
        } = inputs;

        Self {
            synth,
            notes,
            params,
            stop,
            state: RenderState::Uninitialized,
            sample_rate: None,
            block_len: config.block_len,
            block_duration: None,
            samples_played: 0,
            output: StereoBuffer::default(),
            plan: BlockPlan::with_capacity(config.note_queue_capacity),
            consecutive_faults: 0,
            max_consecutive_faults: config.max_consecutive_faults,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Lifecycle
    // ───────────────────────────────────────────────────────────────

    /// Set the sample rate. Only allowed before the loop runs.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<(), RenderError> {
        match self.state {
            RenderState::Uninitialized | RenderState::Prepared => {}
            state => {
                return Err(RenderError::InvalidState {
                    op: "set_sample_rate",
                    state,
                });
            }
        }
        if rate == 0 {
            return Err(RenderError::InvalidSampleRate(rate));
        }

        self.sample_rate = Some(rate);
        self.block_duration = None;
        self.state = RenderState::Prepared;
        log::debug!("sample rate set to {rate} Hz");
        Ok(())
    }

    /// Allocate buffers, prepare the backend and start running.
    ///
    /// Not real-time safe.
    pub fn prepare(&mut self) -> Result<(), RenderError> {
        let rate = match (self.state, self.sample_rate) {
            (RenderState::Prepared, Some(rate)) => rate,
            (RenderState::Uninitialized, _) | (RenderState::Prepared, None) => {
                return Err(RenderError::SampleRateUnknown);
            }
            (state, _) => return Err(RenderError::InvalidState { op: "prepare", state }),
        };

        self.output.resize(self.block_len);
        self.output.clear();
        self.synth.prepare(rate, self.block_len);
        self.samples_played = 0;
        self.notes.rewind(0);
        self.consecutive_faults = 0;
        self.block_duration = Some(Duration::from_secs_f64(
            self.block_len as f64 / rate as f64,
        ));
        self.state = RenderState::Running;

        log::info!(
            "render loop running: {} Hz, {} frames per block",
            rate,
            self.block_len
        );
        Ok(())
    }

    /// `set_sample_rate` followed by `prepare`.
    pub fn start(&mut self, rate: u32) -> Result<(), RenderError> {
        self.set_sample_rate(rate)?;
        self.prepare()
    }

    /// Tear the loop down. Further `advance()` calls return `false`.
    pub fn stop(&mut self) {
        if self.state != RenderState::Stopped {
            log::info!("render loop stopped after {} samples", self.samples_played);
            self.state = RenderState::Stopped;
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Per-block step
    // ───────────────────────────────────────────────────────────────

    /// Render one block.
    ///
    /// Returns `Ok(true)` to keep going and `Ok(false)` once the loop has
    /// stopped (stop request, end of stream, or repeated backend faults).
    /// Calling it before `prepare()` is a precondition failure and leaves
    /// the sample counter untouched.
    pub fn advance(&mut self) -> Result<bool, RenderError> {
        match self.state {
            RenderState::Running => {}
            RenderState::Stopped => return Ok(false),
            state => return Err(RenderError::NotRunning(state)),
        }

        if self.stop.is_requested() || self.synth.is_finished() {
            self.stop();
            return Ok(false);
        }

        let block_start = self.samples_played;
        let block_frames = self.block_len;

        // Parameter writes take effect at the block boundary
        let synth = &mut self.synth;
        self.params
            .drain(|change| synth.set_param(&change.path, change.value));

        // Note events take effect at their offset
        let notes = self.notes.on_read(block_start + block_frames as SampleTime);
        compile_block(&mut self.plan, block_start, block_frames, notes);

        let mut faulted = false;
        for slice in &self.plan.slices {
            for note in &notes[slice.events.clone()] {
                self.synth.apply(&note.event);
            }
            if faulted || slice.frame_count == 0 {
                continue;
            }
            let (left, right) = self.output.planes_mut(slice.frames());
            if self.synth.render(left, right).is_err() {
                faulted = true;
            }
        }

        self.samples_played += block_frames as SampleTime;

        if !faulted {
            self.consecutive_faults = 0;
            return Ok(true);
        }

        self.output.clear();
        self.consecutive_faults += 1;
        if self.consecutive_faults >= self.max_consecutive_faults {
            log::error!(
                "synthesis failed {} blocks in a row, stopping",
                self.consecutive_faults
            );
            self.stop();
            return Ok(false);
        }
        Ok(true)
    }

    // ───────────────────────────────────────────────────────────────
    // State access
    // ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RenderState::Running
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Real-time budget for one `advance()`; known once prepared.
    pub fn block_duration(&self) -> Option<Duration> {
        self.block_duration
    }

    pub fn samples_played(&self) -> SampleTime {
        self.samples_played
    }

    /// Blocks in a row that were replaced by silence.
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    /// Output of the last block.
    pub fn output(&self) -> (&[f32], &[f32]) {
        (self.output.left(), self.output.right())
    }

    /// Copy the last block into `out` as interleaved L/R frames.
    pub fn write_interleaved(&self, out: &mut [f32]) -> usize {
        self.output.write_interleaved(out)
    }

    /// Handle that can stop this loop from another context.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn synth_mut(&mut self) -> &mut S {
        &mut self.synth
    }
}
