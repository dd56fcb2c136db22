//! Visual Renderer: background texture, organic blob outlines and transient
//! particle/trail effects, drawn through a [`Surface`].
//!
//! The renderer never mutates bodies. Morph energy is decayed by the
//! simulation step and only read here.

use crate::body::Body;
use crate::color::hex_with_saturation;
use crate::constants::*;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;

/// Radius of a burst particle.
const PARTICLE_RADIUS: f32 = 3.0;
/// Upper bound on live particles; the oldest are dropped first.
const MAX_PARTICLES: usize = 1024;
const MAX_TRAIL_POINTS: usize = 256;

/// A 2D drawing target. Colors are CSS color strings; coordinates are canvas
/// CSS pixels.
pub trait Surface {
    /// Paint the whole surface with `color`.
    fn fill_background(&mut self, color: &str, width: f32, height: f32);

    /// One cubic bezier stroke.
    fn stroke_bezier(&mut self, from: Vec2, c1: Vec2, c2: Vec2, to: Vec2, color: &str, alpha: f32);

    /// Closed polygon, filled then stroked.
    fn draw_polygon(&mut self, points: &[Vec2], fill: &str, stroke: &str, line_width: f32);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f32,
    pub hue: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub position: Vec2,
    pub life: f32,
}

/// Short-lived decorations that are not simulation bodies.
#[derive(Clone, Debug, Default)]
pub struct Effects {
    particles: Vec<Particle>,
    trail: Vec<TrailPoint>,
}

impl Effects {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn trail(&self) -> &[TrailPoint] {
        &self.trail
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty() && self.trail.is_empty()
    }

    /// Radial burst of particles moving outward at 2-5 px per frame.
    pub fn spawn_burst<R: Rng>(&mut self, rng: &mut R, at: Vec2, hue: f32) {
        if !at.is_finite() {
            return;
        }
        for _ in 0..BURST_PARTICLES {
            let dir = Vec2::from_angle(rng.gen::<f32>() * TAU);
            let speed = 2.0 + rng.gen::<f32>() * 3.0;
            self.particles.push(Particle {
                position: at,
                velocity: dir * speed,
                life: 1.0,
                hue,
            });
        }
        if self.particles.len() > MAX_PARTICLES {
            let excess = self.particles.len() - MAX_PARTICLES;
            self.particles.drain(..excess);
        }
    }

    pub fn add_trail(&mut self, at: Vec2) {
        if !at.is_finite() {
            return;
        }
        self.trail.push(TrailPoint {
            position: at,
            life: 1.0,
        });
        if self.trail.len() > MAX_TRAIL_POINTS {
            let excess = self.trail.len() - MAX_TRAIL_POINTS;
            self.trail.drain(..excess);
        }
    }

    /// Age every effect by one frame, draw the survivors, then drop the
    /// expired ones.
    pub fn advance_and_draw<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        for p in &mut self.particles {
            p.position += p.velocity;
            p.life -= EFFECT_LIFE_DECAY;
            if p.life > 0.0 {
                let color = format!("hsla({:.0}, 90%, 55%, {:.3})", p.hue, p.life);
                surface.fill_circle(p.position, PARTICLE_RADIUS, &color);
            }
        }
        for t in &mut self.trail {
            t.life = (t.life - EFFECT_LIFE_DECAY).max(0.0);
            let r = (6.0 * t.life).max(0.1);
            if r > 0.1 {
                let color = format!("rgba(0,0,0,{:.3})", 0.15 * t.life);
                surface.fill_circle(t.position, r, &color);
            }
        }
        self.particles.retain(|p| p.life > 0.0);
        self.trail.retain(|t| t.life > 0.0);
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.trail.clear();
    }
}

pub struct Renderer {
    time: f32,
    effects: Effects,
    rng: StdRng,
}

impl Renderer {
    pub fn new(rng: StdRng) -> Self {
        Self {
            time: 0.0,
            effects: Effects::default(),
            rng,
        }
    }

    /// Animation time accumulator (advances 0.016 per frame).
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn spawn_burst(&mut self, at: Vec2, hue: f32) {
        self.effects.spawn_burst(&mut self.rng, at, hue);
    }

    pub fn add_trail(&mut self, at: Vec2) {
        self.effects.add_trail(at);
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// Draw one frame: background, pattern, bodies, then effects.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        bodies: &[Body],
        width: f32,
        height: f32,
    ) {
        surface.fill_background(BACKGROUND_HEX, width, height);
        draw_pattern(surface, width, height);

        self.time += RENDER_TIME_STEP;
        for b in bodies {
            let outline = blob_render_outline(b, self.time);
            surface.draw_polygon(&outline, &fill_color(b), OUTLINE_COLOR, OUTLINE_WIDTH);
        }

        self.effects.advance_and_draw(surface);
    }
}

/// Stable pseudo-random value in [0, 1) derived from an id and a salt.
pub fn identity_noise(id: u32, salt: u32) -> f32 {
    let x = ((id as f64) * 12.9898 + (salt as f64) * 78.233).sin() * 43758.5453;
    (x - x.floor()) as f32
}

/// Radius the outline oscillates around; never below `MIN_RENDER_RADIUS`.
pub fn render_radius(body: &Body) -> f32 {
    let w = body.bounds.width();
    let h = body.bounds.height();
    let r = w.min(h) * 0.5;
    if r.is_finite() {
        r.max(MIN_RENDER_RADIUS)
    } else {
        MIN_RENDER_RADIUS
    }
}

/// Canvas-space outline: two summed sines at per-identity frequencies and
/// phases, animated by `time`, amplitude growing with morph energy.
pub fn blob_render_outline(body: &Body, time: f32) -> Vec<Vec2> {
    let id = body.id.0;
    let base_r = render_radius(body);
    let freq1 = 2.0 + (identity_noise(id, 1) * 3.0).floor();
    let freq2 = 3.0 + (identity_noise(id, 2) * 4.0).floor();
    let phase1 = identity_noise(id, 3) * TAU;
    let phase2 = identity_noise(id, 4) * TAU;
    let boost = body.morph_boost.clamp(0.0, 1.0);
    let amp = base_r * (BLOB_BASE_AMPLITUDE + boost * BLOB_MORPH_AMPLITUDE);
    let speed = BLOB_WOBBLE_SPEED;

    let rot = Vec2::from_angle(body.angle);
    (0..BLOB_OUTLINE_STEPS)
        .map(|i| {
            let a = i as f32 / BLOB_OUTLINE_STEPS as f32 * TAU;
            let wobble = (a * freq1 + time * speed + phase1).sin() * 0.6
                + (a * freq2 + time * speed * 0.6 + phase2).sin() * 0.4;
            let r = base_r + amp * wobble;
            body.position + rot.rotate(Vec2::from_angle(a) * r)
        })
        .collect()
}

/// Base color with saturation lifted by the body's saturation level.
pub fn fill_color(body: &Body) -> String {
    let level = body.sat_level.clamp(0.0, 1.0);
    let pct = FILL_SAT_FLOOR_PCT + level * FILL_SAT_SPAN_PCT;
    hex_with_saturation(body.color_hex, pct / 100.0)
}

fn draw_pattern<S: Surface + ?Sized>(surface: &mut S, width: f32, height: f32) {
    let mut y = 0.0;
    while y < height {
        let mut x = 0.0;
        while x < width {
            surface.stroke_bezier(
                Vec2::new(x + 10.0, y + 10.0),
                Vec2::new(x + 20.0, y),
                Vec2::new(x + 40.0, y + 20.0),
                Vec2::new(x + 50.0, y + 10.0),
                "#000",
                PATTERN_ALPHA,
            );
            x += PATTERN_SPACING;
        }
        y += PATTERN_SPACING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_noise_is_stable_and_in_range() {
        for id in 0..50 {
            for salt in 1..5 {
                let v = identity_noise(id, salt);
                assert!((0.0..1.0).contains(&v));
                assert_eq!(v, identity_noise(id, salt));
            }
        }
    }

    #[derive(Default)]
    struct Count {
        circles: usize,
    }

    impl Surface for Count {
        fn fill_background(&mut self, _: &str, _: f32, _: f32) {}
        fn stroke_bezier(&mut self, _: Vec2, _: Vec2, _: Vec2, _: Vec2, _: &str, _: f32) {}
        fn draw_polygon(&mut self, _: &[Vec2], _: &str, _: &str, _: f32) {}
        fn fill_circle(&mut self, _: Vec2, _: f32, _: &str) {
            self.circles += 1;
        }
    }

    #[test]
    fn effects_expire_after_fifty_frames() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(1);
        let mut fx = Effects::default();
        fx.spawn_burst(&mut rng, Vec2::new(10.0, 10.0), 30.0);
        fx.add_trail(Vec2::new(5.0, 5.0));
        assert_eq!(fx.particles().len(), BURST_PARTICLES);

        let mut s = Count::default();
        fx.advance_and_draw(&mut s);
        assert_eq!(s.circles, BURST_PARTICLES + 1);
        for _ in 0..60 {
            fx.advance_and_draw(&mut s);
        }
        assert!(fx.is_empty());
    }

    #[test]
    fn non_finite_effect_positions_are_ignored() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(1);
        let mut fx = Effects::default();
        fx.spawn_burst(&mut rng, Vec2::new(f32::NAN, 0.0), 0.0);
        fx.add_trail(Vec2::new(0.0, f32::INFINITY));
        assert!(fx.is_empty());
    }
}
