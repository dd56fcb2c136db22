//! Note shaping (envelope, gate, tremolo) and the per-entity voice pool.

use super::EntityId;
use crate::constants::*;
use crate::music::Timbre;
use fnv::FnvHashMap;
use smallvec::SmallVec;

/// ADSR times in seconds; `sustain` is a level in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    /// Envelope level (0..1) `t` seconds after note-on while the gate is held.
    pub fn held_level(&self, t: f32) -> f32 {
        if t <= 0.0 {
            0.0
        } else if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            let u = (t - self.attack) / self.decay;
            1.0 + (self.sustain - 1.0) * u
        } else {
            self.sustain
        }
    }

    /// Linear-ramp breakpoints `(seconds after note-on, level)` for a note
    /// gated for `gate` seconds, scaled to `peak`. Times are non-decreasing
    /// and the last point returns to zero.
    pub fn breakpoints(&self, gate: f32, peak: f32) -> SmallVec<[(f32, f32); 5]> {
        let mut pts: SmallVec<[(f32, f32); 5]> = SmallVec::new();
        pts.push((0.0, 0.0));
        let gate = gate.max(0.0);
        if gate <= self.attack {
            pts.push((gate, self.held_level(gate) * peak));
        } else {
            pts.push((self.attack, peak));
            let decay_end = self.attack + self.decay;
            if gate > decay_end {
                pts.push((decay_end, self.sustain * peak));
            }
            pts.push((gate, self.held_level(gate) * peak));
        }
        pts.push((gate + self.release, 0.0));
        pts
    }
}

/// Everything a backend needs to sound one note on an existing voice.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteSpec {
    pub frequency_hz: f32,
    /// Peak level, 0..1.
    pub velocity: f32,
    /// Absolute audio-clock start time (seconds).
    pub start_time: f64,
    pub gate_sec: f32,
    pub envelope: Envelope,
    pub tremolo_hz: f32,
    pub tremolo_depth: f32,
}

impl NoteSpec {
    /// Time after `start_time` at which the note is fully silent.
    pub fn audible_duration(&self) -> f32 {
        self.gate_sec + self.envelope.release
    }
}

/// Collision-dependent shaping, independent of pitch and timing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteShape {
    pub envelope: Envelope,
    pub gate_sec: f32,
    pub tremolo_hz: f32,
    pub tremolo_depth: f32,
}

impl NoteShape {
    /// Harder hits attack and decay faster; more morph energy gives a longer,
    /// release-dominated tail and faster tremolo.
    pub fn from_collision(velocity: f32, morph: f32) -> Self {
        let v = velocity.clamp(0.1, 1.0);
        let morph = morph.clamp(0.0, 1.0);
        let attack = ATTACK_MIN_SEC + (1.0 - v) * ATTACK_SPAN_SEC;
        let decay = DECAY_MIN_SEC + (1.0 - v) * DECAY_SPAN_SEC;
        let sustain = SUSTAIN_MIN + morph * SUSTAIN_SPAN;
        let budget = (NOTE_BUDGET_MIN_SEC + morph * (NOTE_BUDGET_MAX_SEC - NOTE_BUDGET_MIN_SEC))
            .min(NOTE_BUDGET_MAX_SEC);
        let release_ratio = RELEASE_RATIO_MIN + morph * RELEASE_RATIO_SPAN;
        let release = (budget * release_ratio).max(MIN_SEGMENT_SEC);
        let gate_sec = (budget - release).max(MIN_SEGMENT_SEC);
        Self {
            envelope: Envelope {
                attack,
                decay,
                sustain,
                release,
            },
            gate_sec,
            tremolo_hz: TREMOLO_MIN_HZ + morph * TREMOLO_SPAN_HZ,
            tremolo_depth: TREMOLO_DEPTH,
        }
    }

    pub fn into_note(self, frequency_hz: f32, velocity: f32, start_time: f64) -> NoteSpec {
        NoteSpec {
            frequency_hz,
            velocity: velocity.clamp(0.0, 1.0),
            start_time,
            gate_sec: self.gate_sec,
            envelope: self.envelope,
            tremolo_hz: self.tremolo_hz,
            tremolo_depth: self.tremolo_depth,
        }
    }
}

/// Voice identity: one voice per entity and timbre.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceKey {
    pub entity: EntityId,
    pub timbre: Timbre,
}

/// Lazily-populated voice cache. Voices are created on first use, reused on
/// every later trigger and leave the pool through `drain` or `take_orphans`.
pub struct VoicePool<V> {
    voices: FnvHashMap<VoiceKey, V>,
}

impl<V> Default for VoicePool<V> {
    fn default() -> Self {
        Self {
            voices: FnvHashMap::default(),
        }
    }
}

impl<V> VoicePool<V> {
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn contains(&self, key: &VoiceKey) -> bool {
        self.voices.contains_key(key)
    }

    /// Existing voice for `key`, or a new one from `create`. A failed
    /// creation leaves the pool unchanged.
    pub fn get_or_try_create<E>(
        &mut self,
        key: VoiceKey,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<&mut V, E> {
        use std::collections::hash_map::Entry;
        match self.voices.entry(key) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => Ok(e.insert(create()?)),
        }
    }

    /// Remove the voices whose entity fails `keep` and hand them out.
    pub fn take_orphans(&mut self, mut keep: impl FnMut(EntityId) -> bool) -> Vec<(VoiceKey, V)> {
        let gone: Vec<VoiceKey> = self
            .voices
            .keys()
            .filter(|k| !keep(k.entity))
            .copied()
            .collect();
        gone.into_iter()
            .filter_map(|k| self.voices.remove(&k).map(|v| (k, v)))
            .collect()
    }

    /// Remove every voice, handing each out exactly once.
    pub fn drain(&mut self) -> impl Iterator<Item = (VoiceKey, V)> + '_ {
        self.voices.drain()
    }
}
