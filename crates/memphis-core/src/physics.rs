//! Simulation Engine: fixed-step 2D dynamics for convex blob bodies inside
//! four thick static walls, running on the rapier2d pipeline.
//!
//! Each `step()`:
//! 1. applies the pending pointer nudge to bodies under the pointer,
//! 2. pushes the body mirrors (pose, velocity, outline) into the pipeline,
//! 3. steps the pipeline and reads poses and velocities back,
//! 4. reports the contacts that started during the step,
//! 5. applies the motion policy (damping, speed caps, floors with jitter) and
//!    advances the per-body saturation and morph timers.
//!
//! `Body` is the mirror the rest of the crate reads and writes. Between steps
//! it is authoritative: edits to position, velocity or outline are pushed into
//! the pipeline on the next step. Velocities on the mirror are in pixels per
//! step; the pipeline runs in pixels per second.
//!
//! Nothing here returns an error: invalid input is clamped or ignored.

use crate::body::{Body, BodyDesc, BodyId};
use crate::config::PhysicsParams;
use crate::constants::{
    AREA_BUDGET, AREA_BUDGET_MARGIN, BODY_DENSITY, FRAME_SEC, PHYSICS_LENGTH_UNIT,
};
use fnv::{FnvHashMap, FnvHashSet};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use rapier2d::crossbeam::channel::{self, Receiver};
use rapier2d::prelude::{
    point, vector, ActiveEvents, CCDSolver, ChannelEventCollector, CoefficientCombineRule,
    ColliderBuilder, ColliderHandle, ColliderSet, CollisionEvent as PipelineEvent,
    ContactForceEvent, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters, IslandManager,
    Isometry, MultibodyJointSet, NarrowPhase, PhysicsPipeline, Real, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, Vector,
};
use std::f32::consts::PI;

/// Which boundary wall took part in a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wall {
    Top,
    Bottom,
    Left,
    Right,
}

/// One participant of a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collider {
    Body(BodyId),
    Wall(Wall),
}

impl Collider {
    pub fn body(self) -> Option<BodyId> {
        match self {
            Collider::Body(id) => Some(id),
            Collider::Wall(_) => None,
        }
    }

    /// Bodies sort before walls, lower ids first.
    fn key(self) -> u32 {
        match self {
            Collider::Body(id) => id.0,
            Collider::Wall(w) => u32::MAX - w as u32,
        }
    }
}

/// Emitted once when two colliders start touching. A body side is always
/// `a`; body pairs come with the lower id first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    pub a: Collider,
    pub b: Collider,
    pub point: Vec2,
    /// Points from `a` towards `b`.
    pub normal: Vec2,
}

impl CollisionEvent {
    pub fn sides(&self) -> [Collider; 2] {
        [self.a, self.b]
    }

    /// Both sides are simulation bodies.
    pub fn body_pair(&self) -> Option<(BodyId, BodyId)> {
        Some((self.a.body()?, self.b.body()?))
    }
}

#[derive(Clone, Copy, Debug)]
struct PointerTrack {
    current: Vec2,
    last: Vec2,
}

/// Pipeline handles of one body plus what was last synced into them.
#[derive(Clone, Copy, Debug)]
struct Slot {
    rigid: RigidBodyHandle,
    collider: ColliderHandle,
    shape_revision: u32,
    pose: (Vec2, f32),
}

/// The rapier sets and solvers, stepped as one unit.
struct PhysicsWorld {
    gravity: Vector<Real>,
    integration: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    collector: ChannelEventCollector,
    contact_events: Receiver<PipelineEvent>,
    // kept so the collector's force channel stays connected
    _force_events: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    fn new(dt: f32) -> Self {
        let (contact_send, contact_events) = channel::unbounded();
        let (force_send, force_events) = channel::unbounded();
        Self {
            gravity: vector![0.0, 0.0],
            integration: IntegrationParameters {
                dt,
                length_unit: PHYSICS_LENGTH_UNIT,
                ..Default::default()
            },
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            collector: ChannelEventCollector::new(contact_send, force_send),
            contact_events,
            _force_events: force_events,
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.collector,
        );
    }

    fn attach(&mut self, builder: ColliderBuilder, parent: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(builder, parent, &mut self.rigid_bodies)
    }

    fn detach(&mut self, handle: ColliderHandle) {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.rigid_bodies, true);
    }

    /// Removes the rigid body together with its colliders.
    fn remove(&mut self, handle: RigidBodyHandle) {
        self.rigid_bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn collider_center(&self, handle: ColliderHandle) -> Vec2 {
        self.colliders
            .get(handle)
            .map(|c| from_vector(c.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Deepest contact point and the normal from `a` towards `b`. Falls back
    /// to the collider centers when the pair has no manifold yet.
    fn contact_geometry(&self, a: ColliderHandle, b: ColliderHandle) -> (Vec2, Vec2) {
        let (ca, cb) = (self.collider_center(a), self.collider_center(b));
        let fallback = ((ca + cb) * 0.5, (cb - ca).normalize_or_zero());
        let Some(pair) = self.narrow_phase.contact_pair(a, b) else {
            return fallback;
        };
        let Some((manifold, contact)) = pair.find_deepest_contact() else {
            return fallback;
        };
        let Some(first) = self.colliders.get(pair.collider1) else {
            return fallback;
        };
        let p = first.position() * contact.local_p1;
        let mut normal = from_vector(&manifold.data.normal);
        if pair.collider1 != a {
            normal = -normal;
        }
        (
            Vec2::new(p.x, p.y),
            normal.try_normalize().unwrap_or(fallback.1),
        )
    }
}

pub struct Simulation {
    width: f32,
    height: f32,
    params: PhysicsParams,
    bodies: Vec<Body>,
    slots: FnvHashMap<BodyId, Slot>,
    owners: FnvHashMap<ColliderHandle, Collider>,
    walls: Option<RigidBodyHandle>,
    world: PhysicsWorld,
    pointer: Option<PointerTrack>,
    next_id: u32,
    steps: u64,
    rng: StdRng,
    disposed: bool,
}

impl Simulation {
    pub fn new(width: f32, height: f32, params: PhysicsParams, rng: StdRng) -> Self {
        let dt = FRAME_SEC * params.time_scale.max(0.01);
        let mut sim = Self {
            width: width.max(1.0),
            height: height.max(1.0),
            params,
            bodies: Vec::new(),
            slots: FnvHashMap::default(),
            owners: FnvHashMap::default(),
            walls: None,
            world: PhysicsWorld::new(dt),
            pointer: None,
            next_id: 1,
            steps: 0,
            rng,
            disposed: false,
        };
        sim.rebuild_walls();
        sim
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    /// Sum of `π·size²` over all bodies.
    pub fn total_body_area(&self) -> f32 {
        self.bodies.iter().map(|b| PI * b.size * b.size).sum()
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        let body = Body::new(id, desc);

        let rigid = RigidBodyBuilder::dynamic()
            .position(Isometry::new(to_vector(body.position), body.angle))
            .linvel(to_vector(body.velocity / FRAME_SEC))
            .angvel(body.angular_velocity / FRAME_SEC)
            .can_sleep(false)
            .ccd_enabled(true)
            .build();
        let rigid = self.world.rigid_bodies.insert(rigid);
        let collider = self.world.attach(body_collider(&body), rigid);
        self.owners.insert(collider, Collider::Body(id));
        self.slots.insert(
            id,
            Slot {
                rigid,
                collider,
                shape_revision: body.shape_revision(),
                pose: (body.position, body.angle),
            },
        );
        self.bodies.push(body);
        id
    }

    /// Remove every dynamic body. Walls stay.
    pub fn clear_dynamic(&mut self) {
        log::debug!("[physics] clearing {} bodies", self.bodies.len());
        for (_, slot) in self.slots.drain() {
            self.world.remove(slot.rigid);
        }
        self.owners.retain(|_, c| matches!(c, Collider::Wall(_)));
        self.bodies.clear();
    }

    /// Reposition the boundary walls; bodies are untouched.
    pub fn resize(&mut self, width: f32, height: f32) {
        if !valid_dimension(width) || !valid_dimension(height) {
            log::warn!("[physics] ignoring resize to {}x{}", width, height);
            return;
        }
        self.width = width;
        self.height = height;
        self.rebuild_walls();
    }

    /// Scale every body with the canvas, then shrink uniformly if the area
    /// budget would be exceeded.
    pub fn rescale(&mut self, width: f32, height: f32) {
        if !valid_dimension(width) || !valid_dimension(height) {
            log::warn!("[physics] ignoring rescale to {}x{}", width, height);
            return;
        }
        let sx = width / self.width;
        let sy = height / self.height;
        if !sx.is_finite() || !sy.is_finite() || (sx == 1.0 && sy == 1.0) {
            self.resize(width, height);
            return;
        }
        let uniform = sx.min(sy);
        for b in &mut self.bodies {
            b.scale_geometry(sx, sy);
            b.set_position(Vec2::new(b.position.x * sx, b.position.y * sy));
            b.size *= uniform;
        }
        self.resize(width, height);

        let max_area = AREA_BUDGET * self.width * self.height;
        let total = self.total_body_area();
        if total > max_area && total > 0.0 {
            let k = (max_area / total).sqrt() * AREA_BUDGET_MARGIN;
            for b in &mut self.bodies {
                b.scale_geometry(k, k);
                b.size *= k;
            }
            log::debug!("[physics] area budget applied k={:.3}", k);
        }
        log::info!(
            "[physics] rescaled to {}x{} (sx={:.3}, sy={:.3})",
            width,
            height,
            sx,
            sy
        );
    }

    // ---------------- Pointer ----------------

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let p = Vec2::new(x, y);
        if !p.is_finite() {
            return;
        }
        self.pointer = Some(match self.pointer {
            Some(track) => PointerTrack {
                current: p,
                last: track.current,
            },
            None => PointerTrack { current: p, last: p },
        });
    }

    pub fn pointer_down(&mut self, _button: i16, x: f32, y: f32) {
        let p = Vec2::new(x, y);
        if p.is_finite() {
            self.pointer = Some(PointerTrack { current: p, last: p });
        }
    }

    pub fn pointer_up(&mut self, _x: f32, _y: f32) {
        self.pointer = None;
    }

    /// Bodies whose outline contains the point. No side effects.
    pub fn hits_at(&self, x: f32, y: f32) -> Vec<BodyId> {
        let p = Vec2::new(x, y);
        self.bodies
            .iter()
            .filter(|b| b.contains(p))
            .map(|b| b.id)
            .collect()
    }

    // ---------------- Stepping ----------------

    /// Advance one fixed frame. Returns the contacts that started this step.
    pub fn step(&mut self) -> Vec<CollisionEvent> {
        if self.disposed {
            return Vec::new();
        }
        self.steps += 1;
        self.apply_pointer();
        let rebuilt = self.push_bodies();
        self.world.step();
        self.pull_bodies();
        let events = self.contact_starts(&rebuilt);

        for i in 0..self.bodies.len() {
            self.apply_motion_policy(i);
        }
        events
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pointer = None;
        for (_, slot) in self.slots.drain() {
            self.world.remove(slot.rigid);
        }
        if let Some(walls) = self.walls.take() {
            self.world.remove(walls);
        }
        self.owners.clear();
        log::debug!("[physics] disposed after {} steps", self.steps);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn apply_pointer(&mut self) {
        let Some(track) = self.pointer else {
            return;
        };
        let delta = track.current - track.last;
        if delta == Vec2::ZERO {
            return;
        }
        let torque = self.params.pointer_torque * sign_or_zero(delta.x);
        let nudge = self.params.pointer_nudge;
        for b in self.bodies.iter_mut().filter(|b| b.contains(track.current)) {
            b.velocity += delta * nudge / b.material.mass_factor.max(0.1);
            b.angular_velocity += torque;
        }
        // consumed: the same motion is not applied twice
        self.pointer = Some(PointerTrack {
            current: track.current,
            last: track.current,
        });
    }

    /// Copy mirror state into the pipeline. Returns the colliders that were
    /// rebuilt because an outline changed.
    fn push_bodies(&mut self) -> FnvHashSet<ColliderHandle> {
        let mut rebuilt = FnvHashSet::default();
        for body in &self.bodies {
            let Some(slot) = self.slots.get_mut(&body.id) else {
                continue;
            };
            if slot.shape_revision != body.shape_revision() {
                self.world.detach(slot.collider);
                self.owners.remove(&slot.collider);
                slot.collider = self.world.attach(body_collider(body), slot.rigid);
                slot.shape_revision = body.shape_revision();
                self.owners.insert(slot.collider, Collider::Body(body.id));
                rebuilt.insert(slot.collider);
            }
            let Some(rb) = self.world.rigid_bodies.get_mut(slot.rigid) else {
                continue;
            };
            if slot.pose != (body.position, body.angle) {
                rb.set_position(Isometry::new(to_vector(body.position), body.angle), true);
            }
            rb.set_linvel(to_vector(body.velocity / FRAME_SEC), true);
            rb.set_angvel(body.angular_velocity / FRAME_SEC, true);
        }
        rebuilt
    }

    fn pull_bodies(&mut self) {
        for body in &mut self.bodies {
            let Some(slot) = self.slots.get_mut(&body.id) else {
                continue;
            };
            let Some(rb) = self.world.rigid_bodies.get(slot.rigid) else {
                continue;
            };
            body.set_pose(from_vector(rb.translation()), rb.rotation().angle());
            body.velocity = from_vector(rb.linvel()) * FRAME_SEC;
            body.angular_velocity = rb.angvel() * FRAME_SEC;
            slot.pose = (body.position, body.angle);
        }
    }

    /// Drain the pipeline's start events. Touching pairs that only restarted
    /// because a collider was rebuilt are not reported again.
    fn contact_starts(&mut self, rebuilt: &FnvHashSet<ColliderHandle>) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.world.contact_events.try_recv() {
            let PipelineEvent::Started(h1, h2, _) = event else {
                continue;
            };
            if rebuilt.contains(&h1) || rebuilt.contains(&h2) {
                continue;
            }
            let (Some(c1), Some(c2)) = (self.owners.get(&h1), self.owners.get(&h2)) else {
                continue;
            };
            let (ha, a, hb, b) = if c1.key() <= c2.key() {
                (h1, *c1, h2, *c2)
            } else {
                (h2, *c2, h1, *c1)
            };
            let (point, normal) = self.world.contact_geometry(ha, hb);
            events.push(CollisionEvent {
                a,
                b,
                point,
                normal,
            });
        }
        if !events.is_empty() {
            log::trace!("[physics] step {}: {} new contacts", self.steps, events.len());
        }
        events
    }

    fn apply_motion_policy(&mut self, i: usize) {
        let p = &self.params;
        let jitter = Vec2::new(
            (self.rng.gen::<f32>() - 0.5) * p.speed_jitter,
            (self.rng.gen::<f32>() - 0.5) * p.speed_jitter,
        );
        let fallback_dir = Vec2::from_angle(self.rng.gen::<f32>() * 2.0 * PI);
        let b = &mut self.bodies[i];

        b.velocity *= p.linear_damping;
        let speed = b.velocity.length();
        if speed > p.max_speed {
            b.velocity = b.velocity / speed * p.max_speed;
        } else if speed < p.speed_floor {
            let nudged = b.velocity + jitter;
            let dir = nudged.try_normalize().unwrap_or(fallback_dir);
            b.velocity = dir * nudged.length().max(p.speed_floor);
        }

        let mut av = b.angular_velocity * p.angular_damping;
        if av.abs() > p.max_angular {
            av = p.max_angular * av.signum();
        }
        if av.abs() < p.angular_floor {
            // a resting body keeps turning in the positive direction
            let dir = if av == 0.0 { 1.0 } else { av.signum() };
            av = p.angular_floor * dir;
        }
        b.angular_velocity = av;

        b.advance_saturation();
        b.morph_boost *= p.morph_retain;
        if b.morph_boost < 1e-4 {
            b.morph_boost = 0.0;
        }
    }

    /// One fixed body carrying the four wall slabs. Top and bottom overhang
    /// the corners so nothing escapes diagonally.
    fn rebuild_walls(&mut self) {
        if let Some(old) = self.walls.take() {
            self.world.remove(old);
            self.owners.retain(|_, c| matches!(c, Collider::Body(_)));
        }
        let fixed = self
            .world
            .rigid_bodies
            .insert(RigidBodyBuilder::fixed().build());
        let (w, h, t) = (self.width, self.height, self.params.wall_thickness);
        let slabs = [
            (Wall::Top, Vec2::new(w / 2.0, -t / 2.0), w / 2.0 + t, t / 2.0),
            (Wall::Bottom, Vec2::new(w / 2.0, h + t / 2.0), w / 2.0 + t, t / 2.0),
            (Wall::Left, Vec2::new(-t / 2.0, h / 2.0), t / 2.0, h / 2.0),
            (Wall::Right, Vec2::new(w + t / 2.0, h / 2.0), t / 2.0, h / 2.0),
        ];
        for (wall, center, hx, hy) in slabs {
            let slab = ColliderBuilder::cuboid(hx, hy)
                .translation(to_vector(center))
                .restitution(0.0)
                .friction(0.0);
            let handle = self.world.attach(slab, fixed);
            self.owners.insert(handle, Collider::Wall(wall));
        }
        self.walls = Some(fixed);
    }
}

/// Convex collider for a body's outline; a disc of the nominal size when the
/// outline is degenerate.
fn body_collider(body: &Body) -> ColliderBuilder {
    let hull: Vec<_> = body
        .local_outline()
        .iter()
        .map(|p| point![p.x, p.y])
        .collect();
    ColliderBuilder::convex_hull(&hull)
        .unwrap_or_else(|| ColliderBuilder::ball(body.size.max(1.0)))
        .density(BODY_DENSITY * body.material.mass_factor.max(0.1))
        .restitution(body.material.elasticity)
        .restitution_combine_rule(CoefficientCombineRule::Max)
        .friction(body.material.friction)
        .active_events(ActiveEvents::COLLISION_EVENTS)
}

#[inline]
fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

#[inline]
fn from_vector(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[inline]
fn valid_dimension(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[inline]
fn sign_or_zero(v: f32) -> f32 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}
