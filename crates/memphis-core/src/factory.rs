//! Entity Factory: seeds the population under the area budget and turns
//! physics contacts into notes.

use crate::audio::{AudioBackend, AudioEngine, CollisionNote};
use crate::body::{blob_outline, BodyDesc, BodyId, Material};
use crate::color::{hex_to_hue, PaletteQueue};
use crate::config::clamp_population;
use crate::constants::*;
use crate::music::Timbre;
use crate::physics::{CollisionEvent, Simulation};
use fnv::{FnvHashMap, FnvHashSet};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::PI;

/// Left/right margin and top margin used when placing bodies.
const SEED_MARGIN_X: f32 = 100.0;
const SEED_MARGIN_TOP: f32 = 50.0;
const SEED_MARGIN_BOTTOM: f32 = 250.0;

/// Dedup table size above which stale pair entries are pruned.
const PAIR_TABLE_PRUNE_AT: usize = 256;

pub struct EntityFactory {
    desired_count: usize,
    palette: PaletteQueue,
    last_pair_hit: FnvHashMap<(BodyId, BodyId), f64>,
    rng: StdRng,
}

impl EntityFactory {
    pub fn new(desired_count: usize, rng: StdRng) -> Self {
        Self {
            desired_count: clamp_population(desired_count),
            palette: PaletteQueue::default(),
            last_pair_hit: FnvHashMap::default(),
            rng,
        }
    }

    /// Clamp `n` to the population range and remember it for resets.
    pub fn set_desired_count(&mut self, n: usize) -> usize {
        self.desired_count = clamp_population(n);
        self.desired_count
    }

    pub fn desired_count(&self) -> usize {
        self.desired_count
    }

    /// Place `count` (or the desired count) bodies. Sizes are spread evenly
    /// over the calibrated range with a little jitter, then shrunk uniformly
    /// to respect the area budget. The largest body is pitch-locked to the
    /// lowest note.
    pub fn seed_scene<B: AudioBackend>(
        &mut self,
        sim: &mut Simulation,
        audio: &AudioEngine<B>,
        count: Option<usize>,
    ) -> Vec<BodyId> {
        let n = match count {
            Some(c) => self.set_desired_count(c),
            None => self.desired_count,
        };
        let (w, h) = (sim.width(), sim.height());
        let sizes = plan_sizes(&mut self.rng, n, w, h);
        let locked = largest_index(&sizes);

        let scale = audio.scale();
        let mut ids = Vec::with_capacity(n);
        for (i, &size) in sizes.iter().enumerate() {
            let color_hex = self.palette.next_color(&mut self.rng);
            let hue = hex_to_hue(color_hex);
            let pitch_locked = Some(i) == locked;
            let note_index = if pitch_locked {
                0
            } else {
                scale.index_for_size(size)
            };

            let mx = SEED_MARGIN_X.min(w / 2.0);
            let top = SEED_MARGIN_TOP.min(h / 2.0);
            let span_y = (h - SEED_MARGIN_TOP - SEED_MARGIN_BOTTOM).max(0.0);
            let position = Vec2::new(
                mx + self.rng.gen::<f32>() * (w - 2.0 * mx),
                top + self.rng.gen::<f32>() * span_y,
            );
            let material = Material {
                elasticity: 0.85 + self.rng.gen::<f32>() * 0.1,
                mass_factor: 0.5 + self.rng.gen::<f32>() * 1.5,
                friction: 0.01,
            };
            let velocity = Vec2::new(
                (self.rng.gen::<f32>() - 0.5) * 3.0,
                (self.rng.gen::<f32>() - 0.5) * 3.0,
            );
            let points = 10 + self.rng.gen_range(0..6);
            let outline = blob_outline(&mut self.rng, size, points);

            let id = sim.add_body(BodyDesc {
                outline,
                position,
                velocity,
                angular_velocity: (self.rng.gen::<f32>() - 0.5) * 0.1,
                size,
                material,
                color_hex,
                hue,
                timbre: timbre_for(color_hex, hue),
                note_index,
                pitch_locked,
            });
            ids.push(id);
        }
        log::info!(
            "[factory] seeded {} bodies on {}x{} (locked {:?})",
            n,
            w,
            h,
            locked.and_then(|i| ids.get(i))
        );
        ids
    }

    /// Remove every body and seed the desired count again.
    pub fn reset_scene<B: AudioBackend>(
        &mut self,
        sim: &mut Simulation,
        audio: &AudioEngine<B>,
    ) -> Vec<BodyId> {
        sim.clear_dynamic();
        self.last_pair_hit.clear();
        self.seed_scene(sim, audio, None)
    }

    /// Sound every body side of every contact, after pair dedup. Returns the
    /// number of notes handed to the audio engine.
    pub fn handle_collisions<B: AudioBackend>(
        &mut self,
        events: &[CollisionEvent],
        now_ms: f64,
        sim: &mut Simulation,
        audio: &mut AudioEngine<B>,
    ) -> usize {
        let mut triggered = 0;
        for ev in events {
            if let Some((a, b)) = ev.body_pair() {
                if !self.admit_pair(a, b, now_ms) {
                    log::trace!("[factory] dedup {} {} at {:.1}", a, b, now_ms);
                    continue;
                }
            }
            for side in ev.sides() {
                if let Some(id) = side.body() {
                    if self.sound_body(id, now_ms, sim, audio) {
                        triggered += 1;
                    }
                }
            }
        }
        triggered
    }

    fn admit_pair(&mut self, a: BodyId, b: BodyId, now_ms: f64) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&last) = self.last_pair_hit.get(&key) {
            if now_ms - last < PAIR_DEDUP_MS {
                return false;
            }
        }
        if self.last_pair_hit.len() >= PAIR_TABLE_PRUNE_AT {
            self.last_pair_hit
                .retain(|_, t| now_ms - *t < PAIR_DEDUP_MS);
        }
        self.last_pair_hit.insert(key, now_ms);
        true
    }

    fn sound_body<B: AudioBackend>(
        &mut self,
        id: BodyId,
        now_ms: f64,
        sim: &mut Simulation,
        audio: &mut AudioEngine<B>,
    ) -> bool {
        let Some(body) = sim.body(id) else {
            return false;
        };
        let scale = audio.scale();
        let current = body.note_index.min(scale.max_index());
        let chosen = if body.pitch_locked {
            current
        } else {
            let jitter = self.rng.gen_range(-PITCH_JITTER_STEPS..=PITCH_JITTER_STEPS);
            let desired = scale.clamp_index(current as i64 + jitter as i64);
            let home = body.initial_note_index as i64;
            let lo = scale.clamp_index(home - PITCH_RANGE_STEPS as i64);
            let hi = scale.clamp_index(home + PITCH_RANGE_STEPS as i64);
            let used: FnvHashSet<usize> = sim
                .bodies()
                .iter()
                .filter(|b| b.id != id)
                .map(|b| b.note_index)
                .collect();
            nearest_unused_index(desired, scale.len(), &used, lo, hi)
        };

        let note = CollisionNote {
            entity: id.into(),
            velocity: collision_intensity(body.speed(), body.angular_velocity),
            size: body.size,
            hue: body.hue,
            morph_level: body.morph_boost,
            timestamp_ms: now_ms,
            pitch_index: Some(chosen),
            spin: body.angular_velocity,
            timbre: Some(timbre_for(body.color_hex, body.hue)),
        };

        let kick = (self.rng.gen::<f32>() - 0.5) * COLLISION_SPIN_KICK;
        if let Some(body) = sim.body_mut(id) {
            body.note_index = chosen;
            body.angular_velocity += kick;
            body.boost_morph(MORPH_COLLISION_BOOST);
            body.boost_saturation();
        }
        audio.trigger_collision(note);
        true
    }
}

/// Strike intensity from linear and angular speed, in [0, 1].
pub fn collision_intensity(speed: f32, angular_velocity: f32) -> f32 {
    let raw = (speed + angular_velocity.abs() * INTENSITY_ANGULAR_WEIGHT) / INTENSITY_NORMALIZER;
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Palette override first, hue bucket otherwise.
pub fn timbre_for(color_hex: &str, hue: f32) -> Timbre {
    Timbre::for_palette_hex(color_hex).unwrap_or_else(|| Timbre::from_hue(hue))
}

/// Search outward from `desired` (below first, then above) for an index in
/// `[lo, hi]` that is not in `used`. Falls back to `desired` clamped into the
/// range when every candidate is taken.
pub fn nearest_unused_index(
    desired: usize,
    len: usize,
    used: &FnvHashSet<usize>,
    lo: usize,
    hi: usize,
) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len - 1;
    let (lo, hi) = (lo.min(max), hi.min(max));
    let desired = desired.min(max);
    let free = |i: usize| i >= lo && i <= hi && !used.contains(&i);
    for d in 0..len {
        let below = desired.saturating_sub(d);
        if free(below) {
            return below;
        }
        let above = (desired + d).min(max);
        if free(above) {
            return above;
        }
    }
    desired.clamp(lo, hi.max(lo))
}

/// Evenly spread sizes over `[MIN_SIZE, MAX_SIZE]` with jitter, shrunk so
/// that `Σ π r² ≤ AREA_BUDGET · w · h`.
pub fn plan_sizes<R: Rng>(rng: &mut R, n: usize, width: f32, height: f32) -> Vec<f32> {
    let spread = 1.0 / (n.max(4) as f32);
    let mut sizes: Vec<f32> = (0..n)
        .map(|i| {
            let t = if n <= 1 {
                0.5
            } else {
                i as f32 / (n - 1) as f32
            };
            let jitter = (rng.gen::<f32>() - 0.5) * spread;
            let tt = (t + jitter).clamp(0.0, 1.0);
            MIN_SIZE + tt * (MAX_SIZE - MIN_SIZE)
        })
        .collect();

    let max_area = AREA_BUDGET * width * height;
    let total: f32 = sizes.iter().map(|r| PI * r * r).sum();
    if total > max_area {
        let k = (max_area / total.max(1e-6)).sqrt() * AREA_BUDGET_MARGIN;
        for s in &mut sizes {
            *s *= k;
        }
    }
    sizes
}

fn largest_index(sizes: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in sizes.iter().enumerate() {
        if best.map_or(true, |(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}
