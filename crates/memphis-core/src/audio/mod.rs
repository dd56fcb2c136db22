//! Audio Engine: pitch/timbre policy, chord batching, envelope shaping, the
//! voice pool and the freeze capture loop, driving a concrete synthesis
//! runtime through [`AudioBackend`].
//!
//! Control calls never fail. Backend errors are logged and the affected note
//! or graph change is skipped.

pub mod backend;
pub mod chord;
pub mod freeze;
pub mod voice;

pub use backend::{
    db_to_gain, AudioBackend, AudioError, DelaySettings, GraphParam, GraphSettings,
    FREEZE_CAPTURE_DELAY, FREEZE_IDLE_DELAY, LIVE_DELAY,
};
pub use chord::{ChordBatcher, ChordGroup};
pub use freeze::{FreezeInput, FreezeState};
pub use voice::{Envelope, NoteShape, NoteSpec, VoiceKey, VoicePool};

use crate::body::BodyId;
use crate::config::AudioParams;
use crate::constants::{
    FILTER_RAMP_SEC, GATE_RAMP_SEC, REVERB_RAMP_SEC, REVERB_WET_MAX,
};
use crate::music::{Scale, Timbre};
use fnv::FnvHashSet;
use glam::Vec2;

/// Identity of a sounding entity. Simulation bodies map one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl From<BodyId> for EntityId {
    fn from(id: BodyId) -> Self {
        EntityId(id.0)
    }
}

/// One collision (or pointer contact) to be sounded.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionNote {
    pub entity: EntityId,
    /// Strike intensity, 0..1.
    pub velocity: f32,
    pub size: f32,
    pub hue: f32,
    /// Morph energy of the body, 0..1.
    pub morph_level: f32,
    pub timestamp_ms: f64,
    /// Explicit scale index; `None` derives it from `size`.
    pub pitch_index: Option<usize>,
    /// Angular velocity of the body (radians per step).
    pub spin: f32,
    /// Explicit timbre; `None` derives it from `hue`.
    pub timbre: Option<Timbre>,
}

impl CollisionNote {
    /// A neutral mid-size, mid-morph note with no spin.
    pub fn simple(entity: EntityId, velocity: f32, timestamp_ms: f64) -> Self {
        Self {
            entity,
            velocity,
            size: 30.0,
            hue: 180.0,
            morph_level: 0.5,
            timestamp_ms,
            pitch_index: None,
            spin: 0.0,
            timbre: None,
        }
    }
}

pub struct AudioEngine<B: AudioBackend> {
    backend: B,
    params: AudioParams,
    scale: Scale,
    voices: VoicePool<B::Voice>,
    chords: ChordBatcher,
    freeze: FreezeState,
    started: bool,
    graph_ready: bool,
    muted: bool,
    disposed: bool,
    notes_played: u64,
}

impl<B: AudioBackend> AudioEngine<B> {
    /// Build the routing graph on `backend`. A failed build is logged and the
    /// engine stays silent until the next `rebuild`.
    pub fn new(backend: B, params: AudioParams) -> Self {
        let mut engine = Self {
            backend,
            chords: ChordBatcher::new(params.chord_window_ms),
            params,
            scale: Scale::default(),
            voices: VoicePool::default(),
            freeze: FreezeState::Idle,
            started: false,
            graph_ready: false,
            muted: false,
            disposed: false,
            notes_played: 0,
        };
        engine.build_graph();
        engine
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn params(&self) -> &AudioParams {
        &self.params
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_notes(&self) -> usize {
        self.chords.pending()
    }

    pub fn notes_played(&self) -> u64 {
        self.notes_played
    }

    /// Start the audio clock on the first user gesture. Idempotent.
    pub fn ensure_started(&mut self) {
        if self.started || self.disposed {
            return;
        }
        match self.backend.resume() {
            Ok(()) => {
                self.started = true;
                log::info!("[audio] started");
            }
            Err(e) => log::warn!("[audio] start failed: {}", e),
        }
    }

    /// Queue a collision for the current chord window. Ignored before start.
    pub fn trigger_collision(&mut self, note: CollisionNote) {
        if self.disposed || !self.started {
            log::trace!("[audio] dropping note for {:?}: not started", note.entity);
            return;
        }
        self.update_filter_from_spin(note.spin);
        log::trace!(
            "[audio] queue {:?} v={:.2} t={:.1}",
            note.entity,
            note.velocity,
            note.timestamp_ms
        );
        self.chords.push(note);
    }

    /// Queue a neutral note for `entity`.
    pub fn trigger_simple(&mut self, entity: EntityId, velocity: f32, now_ms: f64) {
        self.trigger_collision(CollisionNote::simple(entity, velocity, now_ms));
    }

    /// Flush every chord group whose window has elapsed. Called once per
    /// frame; returns the number of notes handed to the backend.
    pub fn poll(&mut self, now_ms: f64) -> usize {
        if self.disposed {
            return 0;
        }
        let mut played = 0;
        for group in self.chords.drain_due(now_ms) {
            let solo = group.is_solo();
            for (i, note) in group.members.iter().enumerate() {
                let offset = if solo {
                    0.0
                } else {
                    i as f64 * self.params.stagger_sec
                };
                if self.play(note, offset) {
                    played += 1;
                }
            }
        }
        played
    }

    /// Ramp the reverb send from the pointer's height: the top of the canvas
    /// is wettest.
    pub fn modulate_with_pointer(&mut self, pointer: Vec2, canvas_height: f32) {
        if self.disposed || !self.graph_ready || canvas_height <= 0.0 || !pointer.is_finite() {
            return;
        }
        let ny = (pointer.y / canvas_height).clamp(0.0, 1.0);
        let wet = ((1.0 - ny) * REVERB_WET_MAX).min(REVERB_WET_MAX);
        self.backend
            .ramp(GraphParam::ReverbWet, wet, REVERB_RAMP_SEC);
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.freeze
    }

    /// Start capturing into a fresh freeze delay. No-op while recording.
    pub fn freeze_press(&mut self) {
        self.apply_freeze(FreezeInput::Press);
    }

    /// Stop capturing and loop what was captured. No-op unless recording.
    pub fn freeze_release(&mut self) {
        self.apply_freeze(FreezeInput::Release);
    }

    /// Discard the loop and return to idle. No-op when idle.
    pub fn clear_freeze_buffer(&mut self) {
        self.apply_freeze(FreezeInput::Clear);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if self.disposed || !self.graph_ready {
            return;
        }
        let gain = if muted {
            0.0
        } else {
            db_to_gain(self.params.master_db)
        };
        self.backend.ramp(GraphParam::MasterGain, gain, GATE_RAMP_SEC);
        log::info!("[audio] muted={}", muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Release the voices and pending notes of entities not in `live`.
    /// Returns the number of voices disposed.
    pub fn retain_entities(&mut self, live: &[EntityId]) -> usize {
        let live: FnvHashSet<EntityId> = live.iter().copied().collect();
        self.chords.retain_entities(|e| live.contains(&e));
        let orphans = self.voices.take_orphans(|e| live.contains(&e));
        let count = orphans.len();
        for (_, voice) in orphans {
            self.backend.dispose_voice(voice);
        }
        if count > 0 {
            log::debug!("[audio] released {} voices of removed entities", count);
        }
        count
    }

    /// Tear down every voice and the routing graph and build them again.
    /// Mute and start state survive; pending notes and the freeze loop do not.
    pub fn rebuild(&mut self) {
        if self.disposed {
            return;
        }
        self.release_nodes();
        self.chords.clear();
        self.freeze = FreezeState::Idle;
        self.build_graph();
        log::info!("[audio] rebuilt (muted={})", self.muted);
    }

    /// Release every owned node exactly once. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.release_nodes();
        self.backend.close();
        self.chords.clear();
        self.freeze = FreezeState::Idle;
        self.disposed = true;
        log::info!("[audio] disposed after {} notes", self.notes_played);
    }

    fn build_graph(&mut self) {
        let settings = GraphSettings {
            master_gain: if self.muted {
                0.0
            } else {
                db_to_gain(self.params.master_db)
            },
            ..GraphSettings::default()
        };
        match self.backend.build_graph(&settings) {
            Ok(()) => self.graph_ready = true,
            Err(e) => {
                self.graph_ready = false;
                log::error!("[audio] routing graph build failed: {}", e);
            }
        }
    }

    fn release_nodes(&mut self) {
        let count = self.voices.len();
        for (_, voice) in self.voices.drain() {
            self.backend.dispose_voice(voice);
        }
        if self.graph_ready {
            self.backend.dispose_graph();
            self.graph_ready = false;
        }
        log::debug!("[audio] released {} voices", count);
    }

    fn apply_freeze(&mut self, input: FreezeInput) {
        if self.disposed {
            return;
        }
        let Some(next) = self.freeze.next(input) else {
            log::debug!("[freeze] {:?} ignored while {}", input, self.freeze);
            return;
        };
        if self.graph_ready {
            self.run_freeze_transition(input);
        }
        log::info!("[freeze] {} -> {}", self.freeze, next);
        self.freeze = next;
    }

    fn run_freeze_transition(&mut self, input: FreezeInput) {
        match input {
            FreezeInput::Press => {
                if let Err(e) = self.backend.rebuild_freeze_delay(FREEZE_CAPTURE_DELAY) {
                    log::warn!("[freeze] capture delay rebuild failed: {}", e);
                }
                self.backend
                    .ramp(GraphParam::FreezeInputGate, 1.0, GATE_RAMP_SEC);
                self.backend.ramp(GraphParam::InputGate, 1.0, GATE_RAMP_SEC);
            }
            FreezeInput::Release => {
                self.backend
                    .ramp(GraphParam::FreezeFeedback, 0.98, GATE_RAMP_SEC);
                self.backend.ramp(GraphParam::FreezeWet, 1.0, GATE_RAMP_SEC);
                self.backend
                    .ramp(GraphParam::FreezeInputGate, 0.0, GATE_RAMP_SEC);
            }
            FreezeInput::Clear => {
                if let Err(e) = self.backend.rebuild_freeze_delay(FREEZE_IDLE_DELAY) {
                    log::warn!("[freeze] idle delay rebuild failed: {}", e);
                }
                self.backend
                    .ramp(GraphParam::FreezeInputGate, 0.0, GATE_RAMP_SEC);
            }
        }
    }

    fn update_filter_from_spin(&mut self, spin: f32) {
        if !self.graph_ready {
            return;
        }
        let hz = self.filter_cutoff_for_spin(spin);
        self.backend
            .ramp(GraphParam::FilterCutoff, hz, FILTER_RAMP_SEC);
    }

    /// Cutoff for a given angular speed: more spin is brighter.
    pub fn filter_cutoff_for_spin(&self, spin: f32) -> f32 {
        let full = self.params.spin_full_scale.max(f32::EPSILON);
        let norm = if spin.is_finite() {
            spin.abs().min(full) / full
        } else {
            0.0
        };
        self.params.filter_min_hz + norm * (self.params.filter_max_hz - self.params.filter_min_hz)
    }

    /// Scale index a note will sound at.
    pub fn pitch_index_for(&self, note: &CollisionNote) -> usize {
        match note.pitch_index {
            Some(i) => i.min(self.scale.max_index()),
            None => self.scale.index_for_size(note.size),
        }
    }

    fn play(&mut self, note: &CollisionNote, offset_sec: f64) -> bool {
        if !self.graph_ready {
            return false;
        }
        let timbre = note.timbre.unwrap_or_else(|| Timbre::from_hue(note.hue));
        let frequency = self.scale.frequency_hz(self.pitch_index_for(note));
        let start = self.backend.current_time() + self.params.lead_sec + offset_sec;
        let spec = NoteShape::from_collision(note.velocity, note.morph_level).into_note(
            frequency,
            note.velocity,
            start,
        );

        let key = VoiceKey {
            entity: note.entity,
            timbre,
        };
        let backend = &mut self.backend;
        let voice = match self
            .voices
            .get_or_try_create(key, || backend.create_voice(timbre))
        {
            Ok(v) => v,
            Err(e) => {
                log::warn!("[audio] voice for {:?} unavailable: {}", key, e);
                return false;
            }
        };
        if let Err(e) = backend.play_note(voice, &spec) {
            log::warn!("[audio] note for {:?} dropped: {}", key, e);
            return false;
        }
        self.notes_played += 1;
        log::trace!(
            "[audio] play {:?} {:?} {:.1}Hz at {:.3}",
            note.entity,
            timbre,
            frequency,
            start
        );
        true
    }
}

impl<B: AudioBackend> Drop for AudioEngine<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
