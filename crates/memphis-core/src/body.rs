//! Simulation bodies: the blob outline, kinematics, material and the
//! transient per-body state read by the audio and visual layers.

use crate::constants::{
    FRAME_SEC, SAT_DECAY_TAU_SEC, SAT_FLOOR, SAT_HOLD_SEC, SAT_RISE_PER_STEP,
};
use crate::geometry::{self, Aabb};
use crate::music::Timbre;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Stable identity of a simulation body. Ids are never reused within one
/// simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Restitution.
    pub elasticity: f32,
    pub mass_factor: f32,
    pub friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.9,
            mass_factor: 1.0,
            friction: 0.01,
        }
    }
}

/// Everything needed to create a body; the simulation assigns the id.
#[derive(Clone, Debug)]
pub struct BodyDesc {
    /// Outline in body-local coordinates around the origin.
    pub outline: Vec<Vec2>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub size: f32,
    pub material: Material,
    pub color_hex: &'static str,
    pub hue: f32,
    pub timbre: Timbre,
    pub note_index: usize,
    pub pitch_locked: bool,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub id: BodyId,

    // geometry
    local: Vec<Vec2>,
    world: Vec<Vec2>,
    shape_revision: u32,
    pub bounds: Aabb,
    /// Nominal bounding radius used for audio/visual mapping and the area budget.
    pub size: f32,

    // kinematics
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,

    pub material: Material,

    // appearance
    pub color_hex: &'static str,
    pub hue: f32,
    pub timbre: Timbre,

    // audio linkage
    pub note_index: usize,
    pub initial_note_index: usize,
    pub pitch_locked: bool,

    // transient state
    pub morph_boost: f32,
    pub sat_level: f32,
    pub sat_target: f32,
    pub sat_hold: f32,
}

impl Body {
    pub fn new(id: BodyId, desc: BodyDesc) -> Self {
        let local = geometry::convex_hull(&desc.outline);
        let mut body = Self {
            id,
            local,
            world: Vec::new(),
            shape_revision: 0,
            bounds: Aabb::from_points(&[]),
            size: desc.size,
            position: desc.position,
            velocity: desc.velocity,
            angle: 0.0,
            angular_velocity: desc.angular_velocity,
            material: desc.material,
            color_hex: desc.color_hex,
            hue: desc.hue,
            timbre: desc.timbre,
            note_index: desc.note_index,
            initial_note_index: desc.note_index,
            pitch_locked: desc.pitch_locked,
            morph_boost: 0.0,
            sat_level: 0.0,
            sat_target: 0.0,
            sat_hold: 0.0,
        };
        body.sync_world();
        body
    }

    /// World-space outline (convex).
    pub fn outline(&self) -> &[Vec2] {
        &self.world
    }

    /// Outline around the body origin; the collider is built from it.
    pub(crate) fn local_outline(&self) -> &[Vec2] {
        &self.local
    }

    /// Bumped every time the local outline changes.
    pub(crate) fn shape_revision(&self) -> u32 {
        self.shape_revision
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.bounds.contains(p) && geometry::contains_point(&self.world, p)
    }

    /// Move the outline to a pose read back from the physics pipeline.
    pub fn set_pose(&mut self, position: Vec2, angle: f32) {
        self.position = position;
        self.angle = angle.rem_euclid(TAU);
        self.sync_world();
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.sync_world();
    }

    /// Scale the outline along the world axes around the body's center.
    /// Does not touch `size` or `position`.
    pub fn scale_geometry(&mut self, sx: f32, sy: f32) {
        let (sin, cos) = self.angle.sin_cos();
        let rot = Vec2::new(cos, sin);
        let unrot = Vec2::new(cos, -sin);
        let scaled: Vec<Vec2> = self
            .local
            .iter()
            .map(|p| {
                let w = rot.rotate(*p);
                unrot.rotate(Vec2::new(w.x * sx, w.y * sy))
            })
            .collect();
        self.local = geometry::convex_hull(&scaled);
        self.shape_revision = self.shape_revision.wrapping_add(1);
        self.sync_world();
    }

    /// Raise the saturation target to maximum and re-arm the hold timer.
    pub fn boost_saturation(&mut self) {
        self.sat_target = 1.0;
        self.sat_hold = SAT_HOLD_SEC;
    }

    /// Add morph energy, capped at 1.
    pub fn boost_morph(&mut self, amount: f32) {
        self.morph_boost = (self.morph_boost + amount).min(1.0);
    }

    /// One step of the saturation timers: hold countdown, then approach the
    /// target (linear rise, exponential fall).
    pub fn advance_saturation(&mut self) {
        self.sat_hold = (self.sat_hold - FRAME_SEC).max(0.0);
        if self.sat_hold <= 0.0 {
            self.sat_target = SAT_FLOOR;
        }
        if self.sat_level < self.sat_target {
            self.sat_level = (self.sat_level + SAT_RISE_PER_STEP).min(self.sat_target);
        } else if self.sat_level > self.sat_target {
            let k = 1.0 - (-FRAME_SEC / SAT_DECAY_TAU_SEC).exp();
            self.sat_level -= (self.sat_level - self.sat_target) * k;
            if self.sat_level - self.sat_target < 1e-4 {
                self.sat_level = self.sat_target;
            }
        }
    }

    pub fn reset_transients(&mut self) {
        self.morph_boost = 0.0;
        self.sat_level = 0.0;
        self.sat_target = 0.0;
        self.sat_hold = 0.0;
    }

    fn sync_world(&mut self) {
        let (sin, cos) = self.angle.sin_cos();
        let rot = Vec2::new(cos, sin);
        self.world.clear();
        self.world
            .extend(self.local.iter().map(|p| self.position + rot.rotate(*p)));
        self.bounds = Aabb::from_points(&self.world);
    }
}

/// Irregular blob outline: `points` jittered radial samples around the origin
/// with radii in `[0.7, 1.15] * radius`.
pub fn blob_outline<R: Rng>(rng: &mut R, radius: f32, points: usize) -> Vec<Vec2> {
    let points = points.max(3);
    let irregularity = 0.45;
    let slice = TAU / points as f32;
    (0..points)
        .map(|i| {
            let angle = i as f32 * slice + rng.gen::<f32>() * slice * 0.3;
            let r = radius * (0.7 + rng.gen::<f32>() * irregularity);
            Vec2::from_angle(angle) * r
        })
        .collect()
}
