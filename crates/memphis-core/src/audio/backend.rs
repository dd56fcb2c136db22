//! The seam between the Audio Engine's policy and a concrete synthesis
//! runtime (WebAudio in the browser, a logger in the headless driver).
//!
//! The routing graph a backend builds has a fixed topology:
//!
//! ```text
//! voices -> input gate -> filter -+-> live delay ----------------+-> reverb -> master -> limiter -> out
//!                                 +-> freeze-in gate -> freeze delay -+
//! ```
//!
//! Only the freeze delay is ever rebuilt after construction.

use super::voice::NoteSpec;
use crate::constants::{FILTER_DEFAULT_HZ, LIMITER_DB, MASTER_DB, REVERB_WET_DEFAULT};
use crate::music::Timbre;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to create {node} node: {detail}")]
    NodeCreation { node: &'static str, detail: String },
    #[error("failed to connect {from} -> {to}: {detail}")]
    Connection {
        from: &'static str,
        to: &'static str,
        detail: String,
    },
    #[error("audio context has not been started")]
    NotStarted,
    #[error("routing graph is not built")]
    NoGraph,
    #[error("audio engine has been disposed")]
    Disposed,
}

/// Continuously controllable parameters of the routing graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphParam {
    InputGate,
    FreezeInputGate,
    FilterCutoff,
    ReverbWet,
    FreezeFeedback,
    FreezeWet,
    MasterGain,
}

/// Ping-pong delay configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelaySettings {
    pub delay_sec: f32,
    pub feedback: f32,
    pub wet: f32,
}

/// The live (always-on) echo.
pub const LIVE_DELAY: DelaySettings = DelaySettings {
    delay_sec: 0.25,
    feedback: 0.2,
    wet: 0.2,
};

/// Freeze delay armed for capture.
pub const FREEZE_CAPTURE_DELAY: DelaySettings = DelaySettings {
    delay_sec: 0.30,
    feedback: 0.95,
    wet: 1.0,
};

/// Freeze delay at rest (flushed, input gate closed).
pub const FREEZE_IDLE_DELAY: DelaySettings = DelaySettings {
    delay_sec: 0.25,
    feedback: 0.98,
    wet: 1.0,
};

/// Initial values for a freshly built routing graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphSettings {
    pub filter_hz: f32,
    pub live_delay: DelaySettings,
    pub freeze_delay: DelaySettings,
    pub reverb_wet: f32,
    pub reverb_decay_sec: f32,
    pub master_gain: f32,
    pub limiter_db: f32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            filter_hz: FILTER_DEFAULT_HZ,
            live_delay: LIVE_DELAY,
            freeze_delay: FREEZE_IDLE_DELAY,
            reverb_wet: REVERB_WET_DEFAULT,
            reverb_decay_sec: 6.0,
            master_gain: db_to_gain(MASTER_DB),
            limiter_db: LIMITER_DB,
        }
    }
}

/// A synthesis runtime the Audio Engine drives.
///
/// Implementations own the actual nodes; the engine owns the policy (when to
/// build, rebuild, ramp, create and dispose). Every node handed out must be
/// released exactly once through `dispose_voice` / `dispose_graph`.
pub trait AudioBackend {
    /// One persistent synth voice (oscillator stack + tremolo).
    type Voice;

    /// Start or resume the audio clock. Called on the first user gesture.
    fn resume(&mut self) -> Result<(), AudioError>;

    /// Audio clock in seconds; notes are scheduled against it.
    fn current_time(&self) -> f64;

    fn build_graph(&mut self, settings: &GraphSettings) -> Result<(), AudioError>;

    /// Tear down the freeze delay and replace it with a fresh one, re-wiring
    /// the freeze-in gate into it.
    fn rebuild_freeze_delay(&mut self, delay: DelaySettings) -> Result<(), AudioError>;

    /// Smoothly move a graph parameter to `value` over `ramp_sec`.
    fn ramp(&mut self, param: GraphParam, value: f32, ramp_sec: f64);

    fn create_voice(&mut self, timbre: Timbre) -> Result<Self::Voice, AudioError>;

    fn play_note(&mut self, voice: &mut Self::Voice, note: &NoteSpec) -> Result<(), AudioError>;

    fn dispose_voice(&mut self, voice: Self::Voice);

    fn dispose_graph(&mut self);

    /// Shut the runtime down after the last graph is gone. Later calls that
    /// need the runtime fail with [`AudioError::Disposed`].
    fn close(&mut self) {}
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
