// C-compatible FFI bindings for Swift/iOS integration.
//
// Safety requirements:
// - All pointers must be non-null unless documented otherwise
// - All handles must be created by this module and not fabricated
// - String parameters must be valid UTF-8 (Swift strings are always valid)
// - Caller must call the corresponding _destroy function for each _create

use std::ffi::{CStr, c_char, c_void};

use crate::bridge::create_bridge;
use crate::config::{
    DEFAULT_BLOCK_LEN, DEFAULT_MAX_CONSECUTIVE_FAULTS, DEFAULT_NOTE_QUEUE_CAPACITY,
    DEFAULT_PARAM_QUEUE_CAPACITY, DEFAULT_SAMPLE_RATE, EngineConfig,
};
use crate::engine::RenderLoop;
use crate::error::{PortError, TreeError};
use crate::event::{NoteEvent, SampleTime};
use crate::instrument::InstrumentTree;
use crate::port::ParamValue;
use crate::synth::{SynthBackend, SynthFault};
use crate::tree::LogSink;

use log::{LevelFilter, error, warn};
use oslog::OsLogger;

// Logger subsystem identifier
const LOG_SUBSYSTEM: &str = "com.synthtree.engine";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at application startup, before any other FFI function. Tree
/// dumps and render loop messages then appear in Console.app and Xcode's
/// debug console.
#[unsafe(no_mangle)]
pub extern "C" fn synthtree_init_logger() {
    OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Status Codes
// ═══════════════════════════════════════════════════════════════════════════

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthtreeStatus {
    Ok = 0,
    NullPointer = 1,
    InvalidString = 2,
    NoSuchPath = 3,
    InvalidValue = 4,
    QueueFull = 5,
    NotRunning = 6,
    Failed = 7,
}

impl From<&PortError> for SynthtreeStatus {
    fn from(err: &PortError) -> Self {
        match err {
            PortError::Tree(TreeError::NoSuchPath(_)) => Self::NoSuchPath,
            PortError::Tree(_) | PortError::NotAPort(_) | PortError::WriteOnly(_) => Self::Failed,
            PortError::OutOfDomain { .. }
            | PortError::TypeMismatch { .. }
            | PortError::Arity { .. } => Self::InvalidValue,
            PortError::QueueFull(_) => Self::QueueFull,
        }
    }
}

fn status_of(result: Result<(), PortError>) -> SynthtreeStatus {
    match result {
        Ok(()) => SynthtreeStatus::Ok,
        Err(err) => {
            warn!("{err}");
            SynthtreeStatus::from(&err)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Host Synthesis Callbacks
// ═══════════════════════════════════════════════════════════════════════════

/// Synthesis implemented by the host, driven by the render loop.
///
/// Every callback is invoked on the render thread and must not block.
#[repr(C)]
pub struct SynthtreeCallbacks {
    /// Passed back unchanged to every callback.
    pub user_data: *mut c_void,

    /// Render `frames` frames into both planes. Return false on failure;
    /// the block is then replaced by silence.
    pub render: Option<
        extern "C" fn(user_data: *mut c_void, left: *mut f32, right: *mut f32, frames: u32) -> bool,
    >,

    /// `kind` is 0 for note-on (`value` = velocity) and 1 for note-off
    /// (`value` = id).
    pub note: Option<
        extern "C" fn(user_data: *mut c_void, kind: u8, channel: u8, note: u8, value: i32),
    >,

    /// Parameter write. `path` is UTF-8 and NOT null-terminated.
    pub param: Option<
        extern "C" fn(user_data: *mut c_void, path: *const u8, path_len: usize, value: f64),
    >,
}

struct CallbackSynth {
    callbacks: SynthtreeCallbacks,
}

// SAFETY: the host guarantees `user_data` may be used from the render
// thread, which is the only thread calling into the backend.
unsafe impl Send for CallbackSynth {}

impl SynthBackend for CallbackSynth {
    fn prepare(&mut self, _sample_rate: u32, _max_block: usize) {}

    fn set_param(&mut self, path: &str, value: ParamValue) {
        if let Some(param) = self.callbacks.param {
            param(self.callbacks.user_data, path.as_ptr(), path.len(), value.as_f64());
        }
    }

    fn apply(&mut self, event: &NoteEvent) {
        let Some(note_cb) = self.callbacks.note else {
            return;
        };
        match *event {
            NoteEvent::NoteOn {
                channel,
                note,
                velocity,
            } => note_cb(self.callbacks.user_data, 0, channel, note, velocity as i32),
            NoteEvent::NoteOff { channel, note, id } => {
                note_cb(self.callbacks.user_data, 1, channel, note, id)
            }
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), SynthFault> {
        let Some(render) = self.callbacks.render else {
            left.fill(0.0);
            right.fill(0.0);
            return Ok(());
        };
        let frames = left.len() as u32;
        if render(
            self.callbacks.user_data,
            left.as_mut_ptr(),
            right.as_mut_ptr(),
            frames,
        ) {
            Ok(())
        } else {
            Err(SynthFault::Failed)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Opaque Handle Types
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque handle to the instrument tree (control side).
pub struct SynthtreeInstrument {
    inner: InstrumentTree,
}

/// Opaque handle to the render loop (audio side).
pub struct SynthtreeRenderer {
    inner: RenderLoop<CallbackSynth>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Creation
// ═══════════════════════════════════════════════════════════════════════════

#[repr(C)]
pub struct SynthtreeConfig {
    /// Sample rate in Hz used by `renderer_start`.
    pub sample_rate: u32,
    /// Frames rendered per `renderer_advance`.
    pub block_len: u32,
    pub note_queue_capacity: u32,
    pub param_queue_capacity: u32,
    pub max_consecutive_faults: u32,
}

impl Default for SynthtreeConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_len: DEFAULT_BLOCK_LEN as u32,
            note_queue_capacity: DEFAULT_NOTE_QUEUE_CAPACITY as u32,
            param_queue_capacity: DEFAULT_PARAM_QUEUE_CAPACITY as u32,
            max_consecutive_faults: DEFAULT_MAX_CONSECUTIVE_FAULTS,
        }
    }
}

impl From<&SynthtreeConfig> for EngineConfig {
    fn from(cfg: &SynthtreeConfig) -> Self {
        EngineConfig::default()
            .sample_rate(cfg.sample_rate)
            .block_len(cfg.block_len as usize)
            .note_queue_capacity(cfg.note_queue_capacity as usize)
            .param_queue_capacity(cfg.param_queue_capacity as usize)
            .max_consecutive_faults(cfg.max_consecutive_faults)
    }
}

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn synthtree_default_config() -> SynthtreeConfig {
    SynthtreeConfig::default()
}

/// Create an instrument and its render loop.
///
/// Returns the instrument handle, or NULL on invalid input. The renderer
/// is returned via `out_renderer`. Both must be destroyed with their
/// respective destroy functions.
///
/// # Safety
/// - `name` must be a valid null-terminated UTF-8 string or NULL ("Synth")
/// - `config` must be NULL (defaults) or point to a valid SynthtreeConfig
/// - `out_renderer` must be a valid pointer to store the renderer handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn synthtree_create(
    name: *const c_char,
    config: *const SynthtreeConfig,
    callbacks: SynthtreeCallbacks,
    out_renderer: *mut *mut SynthtreeRenderer,
) -> *mut SynthtreeInstrument {
    if out_renderer.is_null() {
        return std::ptr::null_mut();
    }

    let name = if name.is_null() {
        "Synth"
    } else {
        match unsafe { CStr::from_ptr(name) }.to_str() {
            Ok(name) => name,
            Err(_) => return std::ptr::null_mut(),
        }
    };

    let config = if config.is_null() {
        EngineConfig::default()
    } else {
        EngineConfig::from(unsafe { &*config })
    };

    let (tree, inputs) = match create_bridge(name, &config, LogSink) {
        Ok(pair) => pair,
        Err(err) => {
            error!("synthtree_create: {err}");
            return std::ptr::null_mut();
        }
    };

    let synth = CallbackSynth { callbacks };
    let renderer = RenderLoop::new(synth, inputs, &config);
    unsafe {
        *out_renderer = Box::into_raw(Box::new(SynthtreeRenderer { inner: renderer }));
    }

    Box::into_raw(Box::new(SynthtreeInstrument { inner: tree }))
}

/// Destroy an instrument handle.
///
/// # Safety
/// `instrument` must be a valid pointer returned by `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_destroy(instrument: *mut SynthtreeInstrument) {
    if !instrument.is_null() {
        unsafe { drop(Box::from_raw(instrument)) };
    }
}

/// Destroy a renderer handle.
///
/// # Safety
/// `renderer` must be a valid pointer returned via `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renderer_destroy(renderer: *mut SynthtreeRenderer) {
    if !renderer.is_null() {
        unsafe { drop(Box::from_raw(renderer)) };
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Instrument - Path Messaging
// ═══════════════════════════════════════════════════════════════════════════

unsafe fn with_path<F>(
    instrument: *mut SynthtreeInstrument,
    path: *const c_char,
    f: F,
) -> SynthtreeStatus
where
    F: FnOnce(&mut InstrumentTree, &str) -> SynthtreeStatus,
{
    if instrument.is_null() || path.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    let Ok(path) = unsafe { CStr::from_ptr(path) }.to_str() else {
        return SynthtreeStatus::InvalidString;
    };
    f(unsafe { &mut (*instrument).inner }, path)
}

/// Write an integer parameter by path.
///
/// # Safety
/// `instrument` must be valid; `path` must be a null-terminated UTF-8 string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_set_int(
    instrument: *mut SynthtreeInstrument,
    path: *const c_char,
    value: i32,
) -> SynthtreeStatus {
    unsafe {
        with_path(instrument, path, |tree, path| {
            status_of(tree.dispatch(path, &[ParamValue::Int(value)]))
        })
    }
}

/// Write a float parameter by path.
///
/// # Safety
/// `instrument` must be valid; `path` must be a null-terminated UTF-8 string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_set_float(
    instrument: *mut SynthtreeInstrument,
    path: *const c_char,
    value: f32,
) -> SynthtreeStatus {
    unsafe {
        with_path(instrument, path, |tree, path| {
            status_of(tree.dispatch(path, &[ParamValue::Float(value)]))
        })
    }
}

/// Read a parameter by path as a double.
///
/// # Safety
/// `instrument` must be valid; `path` must be a null-terminated UTF-8
/// string; `out_value` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_get(
    instrument: *mut SynthtreeInstrument,
    path: *const c_char,
    out_value: *mut f64,
) -> SynthtreeStatus {
    if out_value.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    unsafe {
        with_path(instrument, path, |tree, path| match tree.query(path) {
            Ok(value) => {
                *out_value = value.as_f64();
                SynthtreeStatus::Ok
            }
            Err(err) => SynthtreeStatus::from(&err),
        })
    }
}

/// Queue a note-on at absolute sample `time` (0 = as soon as possible).
///
/// # Safety
/// `instrument` must be a valid pointer returned by `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_note_on(
    instrument: *mut SynthtreeInstrument,
    time: u64,
    channel: i32,
    note: i32,
    velocity: i32,
) -> SynthtreeStatus {
    if instrument.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    let tree = unsafe { &mut (*instrument).inner };
    status_of(tree.note_on_at(time as SampleTime, channel, note, velocity))
}

/// Queue a note-off at absolute sample `time` (0 = as soon as possible).
///
/// # Safety
/// `instrument` must be a valid pointer returned by `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_note_off(
    instrument: *mut SynthtreeInstrument,
    time: u64,
    channel: i32,
    note: i32,
    id: i32,
) -> SynthtreeStatus {
    if instrument.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    let tree = unsafe { &mut (*instrument).inner };
    status_of(tree.note_off_at(time as SampleTime, channel, note, id))
}

/// Dump the built tree to the log.
///
/// # Safety
/// `instrument` must be a valid pointer returned by `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_print_tree(instrument: *mut SynthtreeInstrument) {
    if instrument.is_null() {
        return;
    }
    unsafe { (*instrument).inner.print_tree() };
}

/// Ask the renderer to stop at its next block.
///
/// # Safety
/// `instrument` must be a valid pointer returned by `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn instrument_request_stop(instrument: *const SynthtreeInstrument) {
    if instrument.is_null() {
        return;
    }
    unsafe { (*instrument).inner.request_stop() };
}

// ═══════════════════════════════════════════════════════════════════════════
// Renderer
// ═══════════════════════════════════════════════════════════════════════════

/// Set the sample rate and prepare the renderer.
///
/// Not real-time safe; call before the audio callback starts.
///
/// # Safety
/// `renderer` must be a valid pointer returned via `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renderer_start(
    renderer: *mut SynthtreeRenderer,
    sample_rate: u32,
) -> SynthtreeStatus {
    if renderer.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    match unsafe { (*renderer).inner.start(sample_rate) } {
        Ok(()) => SynthtreeStatus::Ok,
        Err(err) => {
            error!("renderer_start: {err}");
            SynthtreeStatus::Failed
        }
    }
}

/// Render one block.
///
/// Returns `Ok` to keep going and `NotRunning` once the loop has stopped
/// or was never started.
///
/// # Safety
/// Must be called from the audio thread. `renderer` must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renderer_advance(renderer: *mut SynthtreeRenderer) -> SynthtreeStatus {
    if renderer.is_null() {
        return SynthtreeStatus::NullPointer;
    }
    match unsafe { (*renderer).inner.advance() } {
        Ok(true) => SynthtreeStatus::Ok,
        Ok(false) | Err(_) => SynthtreeStatus::NotRunning,
    }
}

/// Copy the last block into `out` as interleaved stereo.
///
/// Returns the number of frames written.
///
/// # Safety
/// `out` must have space for `capacity` floats.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renderer_read_interleaved(
    renderer: *const SynthtreeRenderer,
    out: *mut f32,
    capacity: usize,
) -> usize {
    if renderer.is_null() || out.is_null() {
        return 0;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(out, capacity) };
    unsafe { (*renderer).inner.write_interleaved(out) }
}

/// Frames rendered since the renderer was started.
///
/// # Safety
/// `renderer` must be a valid pointer returned via `synthtree_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renderer_samples_played(renderer: *const SynthtreeRenderer) -> u64 {
    if renderer.is_null() {
        return 0;
    }
    unsafe { (*renderer).inner.samples_played() }
}
