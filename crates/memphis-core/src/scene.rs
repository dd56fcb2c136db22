//! Host facade: one object the front-end drives per frame and per input
//! event. Owns the simulation, the audio engine, the factory and the
//! renderer, and routes contact events between them.

use crate::audio::{AudioBackend, AudioEngine, CollisionNote, EntityId, FreezeState};
use crate::body::BodyId;
use crate::clock::{Clock, InstantClock};
use crate::config::SceneConfig;
use crate::constants::MORPH_HOVER_BOOST;
use crate::factory::EntityFactory;
use crate::physics::Simulation;
use crate::visuals::{Renderer, Surface};
use fnv::FnvHashSet;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// What one `tick` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub contacts: usize,
    pub notes_queued: usize,
    pub notes_played: usize,
}

pub struct Scene<B: AudioBackend, C: Clock = InstantClock> {
    config: SceneConfig,
    sim: Simulation,
    audio: AudioEngine<B>,
    factory: EntityFactory,
    renderer: Renderer,
    clock: C,
    hovered: FnvHashSet<BodyId>,
    disposed: bool,
}

impl<B: AudioBackend> Scene<B, InstantClock> {
    pub fn new(config: SceneConfig, backend: B) -> Self {
        Self::with_clock(config, backend, InstantClock::default())
    }
}

impl<B: AudioBackend, C: Clock> Scene<B, C> {
    /// Build every engine and seed the initial population.
    pub fn with_clock(config: SceneConfig, backend: B, clock: C) -> Self {
        let config = config.sanitized();
        let rng = |salt: u64| match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(salt)),
            None => StdRng::from_entropy(),
        };
        let mut sim = Simulation::new(config.width, config.height, config.physics.clone(), rng(0));
        let audio = AudioEngine::new(backend, config.audio.clone());
        let mut factory = EntityFactory::new(config.population, rng(1));
        let renderer = Renderer::new(rng(2));
        factory.seed_scene(&mut sim, &audio, None);
        log::info!(
            "[scene] ready: {} bodies on {}x{}",
            sim.bodies().len(),
            config.width,
            config.height
        );
        Self {
            config,
            sim,
            audio,
            factory,
            renderer,
            clock,
            hovered: FnvHashSet::default(),
            disposed: false,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn audio(&self) -> &AudioEngine<B> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine<B> {
        &mut self.audio
    }

    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Advance one frame: step physics, sound new contacts, flush due chords.
    pub fn tick(&mut self) -> FrameStats {
        if self.disposed {
            return FrameStats::default();
        }
        let events = self.sim.step();
        let now = self.clock.now_ms();

        for ev in &events {
            if let Some((a, _)) = ev.body_pair() {
                if let Some(hue) = self.sim.body(a).map(|b| b.hue) {
                    self.renderer.spawn_burst(ev.point, hue);
                }
            }
        }

        let notes_queued = self
            .factory
            .handle_collisions(&events, now, &mut self.sim, &mut self.audio);
        let notes_played = self.audio.poll(now);
        FrameStats {
            contacts: events.len(),
            notes_queued,
            notes_played,
        }
    }

    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if self.disposed {
            return;
        }
        self.renderer.render(
            surface,
            self.sim.bodies(),
            self.sim.width(),
            self.sim.height(),
        );
    }

    /// Pointer motion in canvas pixels. `movement` is the motion since the
    /// previous event. Bodies under the pointer brighten and swell; bodies
    /// the pointer just entered sound once. Returns how many were entered.
    pub fn pointer_move(&mut self, x: f32, y: f32, movement: Vec2) -> usize {
        if self.disposed {
            return 0;
        }
        let p = Vec2::new(x, y);
        if !p.is_finite() {
            return 0;
        }
        self.sim.pointer_move(x, y);
        let now = self.clock.now_ms();
        let velocity = if movement.is_finite() {
            (movement.length() / 10.0 + 0.2).min(1.0)
        } else {
            0.2
        };

        let hits = self.sim.hits_at(x, y);
        let mut entered = 0;
        for id in &hits {
            let Some(body) = self.sim.body_mut(*id) else {
                continue;
            };
            body.boost_saturation();
            body.boost_morph(MORPH_HOVER_BOOST);
            if self.hovered.contains(id) {
                continue;
            }
            let note = CollisionNote {
                entity: (*id).into(),
                velocity,
                size: body.size,
                hue: body.hue,
                morph_level: body.morph_boost,
                timestamp_ms: now,
                pitch_index: Some(body.note_index),
                spin: body.angular_velocity,
                timbre: None,
            };
            self.audio.trigger_collision(note);
            entered += 1;
        }
        self.hovered = hits.into_iter().collect();

        self.audio.modulate_with_pointer(p, self.sim.height());
        self.renderer.add_trail(p);
        entered
    }

    /// Press: first gesture starts audio, then capture into the freeze loop.
    pub fn pointer_down(&mut self, button: i16, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.audio.ensure_started();
        self.sim.pointer_down(button, x, y);
        self.audio.freeze_press();
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.sim.pointer_up(x, y);
        self.audio.freeze_release();
    }

    /// New canvas size. Bodies rescale when the size actually changed;
    /// invalid sizes are ignored.
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.disposed {
            return;
        }
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            log::warn!("[scene] ignoring resize to {}x{}", width, height);
            return;
        }
        if width == self.sim.width() && height == self.sim.height() {
            return;
        }
        self.sim.rescale(width, height);
        self.config.width = width;
        self.config.height = height;
    }

    pub fn ensure_audio_started(&mut self) {
        self.audio.ensure_started();
    }

    /// Clamp `n`, rebuild the audio engine (keeping mute) and reseed.
    pub fn set_population_count(&mut self, n: usize) -> usize {
        if self.disposed {
            return self.factory.desired_count();
        }
        let n = self.factory.set_desired_count(n);
        self.config.population = n;
        self.audio.rebuild();
        self.reset();
        log::info!("[scene] population set to {}", n);
        n
    }

    pub fn population_count(&self) -> usize {
        self.sim.bodies().len()
    }

    /// Clear all bodies, reseed the desired count and release the voices of
    /// the bodies that are gone.
    pub fn reset(&mut self) {
        if self.disposed {
            return;
        }
        self.factory.reset_scene(&mut self.sim, &self.audio);
        let live: Vec<EntityId> = self.sim.bodies().iter().map(|b| b.id.into()).collect();
        self.audio.retain_entities(&live);
        self.hovered.clear();
        self.renderer.clear_effects();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.audio.set_muted(muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.audio.toggle_mute()
    }

    pub fn is_muted(&self) -> bool {
        self.audio.is_muted()
    }

    pub fn freeze_press(&mut self) {
        self.audio.freeze_press();
    }

    pub fn freeze_release(&mut self) {
        self.audio.freeze_release();
    }

    pub fn clear_freeze_buffer(&mut self) {
        self.audio.clear_freeze_buffer();
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.audio.freeze_state()
    }

    /// Release audio nodes and stop the simulation. Safe to call twice.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.audio.dispose();
        self.sim.dispose();
        self.hovered.clear();
        self.disposed = true;
        log::info!("[scene] disposed");
    }
}
