// Integration tests for the simulation engine.

use glam::Vec2;
use memphis_core::body::{BodyDesc, Material};
use memphis_core::constants::{AREA_BUDGET, MAX_SPEED, SPEED_FLOOR};
use memphis_core::physics::Collider;
use memphis_core::{PhysicsParams, Simulation, Timbre};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sim(w: f32, h: f32) -> Simulation {
    Simulation::new(w, h, PhysicsParams::default(), StdRng::seed_from_u64(9))
}

fn square(at: Vec2, side: f32, velocity: Vec2) -> BodyDesc {
    let h = side / 2.0;
    BodyDesc {
        outline: vec![
            Vec2::new(-h, -h),
            Vec2::new(h, -h),
            Vec2::new(h, h),
            Vec2::new(-h, h),
        ],
        position: at,
        velocity,
        angular_velocity: 0.0,
        size: side / 2.0,
        material: Material::default(),
        color_hex: "#DE4636",
        hue: 6.0,
        timbre: Timbre::FatSawtooth,
        note_index: 5,
        pitch_locked: false,
    }
}

#[test]
fn speeds_stay_between_floor_and_cap() {
    let mut s = sim(400.0, 300.0);
    s.add_body(square(Vec2::new(100.0, 100.0), 40.0, Vec2::new(30.0, -12.0)));
    s.add_body(square(Vec2::new(250.0, 150.0), 30.0, Vec2::ZERO));
    s.add_body(square(Vec2::new(320.0, 220.0), 24.0, Vec2::new(-0.01, 0.0)));
    for _ in 0..600 {
        s.step();
        for b in s.bodies() {
            let v = b.speed();
            assert!(v <= MAX_SPEED + 1e-4, "speed {v} above cap");
            assert!(v >= SPEED_FLOOR - 1e-4, "speed {v} below floor");
        }
    }
}

#[test]
fn bodies_stay_inside_the_walls() {
    let mut s = sim(300.0, 200.0);
    for i in 0..5 {
        s.add_body(square(
            Vec2::new(40.0 + i as f32 * 50.0, 100.0),
            30.0,
            Vec2::new(3.0, if i % 2 == 0 { 3.0 } else { -3.0 }),
        ));
    }
    for _ in 0..2000 {
        s.step();
    }
    for b in s.bodies() {
        assert!(b.position.x > -20.0 && b.position.x < 320.0, "{:?}", b.position);
        assert!(b.position.y > -20.0 && b.position.y < 220.0, "{:?}", b.position);
    }
}

#[test]
fn contact_is_reported_once_when_it_starts() {
    let mut s = sim(400.0, 400.0);
    let a = s.add_body(square(Vec2::new(100.0, 100.0), 40.0, Vec2::ZERO));
    let b = s.add_body(square(Vec2::new(130.0, 100.0), 40.0, Vec2::ZERO));

    let first = s.step();
    let pairs: Vec<_> = first.iter().filter_map(|e| e.body_pair()).collect();
    assert_eq!(pairs, vec![(a, b)]);
    let ev = first[0];
    assert!(ev.normal.x > 0.9, "normal points from a to b: {:?}", ev.normal);

    let second = s.step();
    assert!(second.iter().all(|e| e.body_pair().is_none()));
}

#[test]
fn wall_contacts_are_reported_with_a_wall_side() {
    let mut s = sim(200.0, 200.0);
    s.add_body(square(Vec2::new(185.0, 100.0), 40.0, Vec2::new(2.0, 0.0)));
    let events = s.step();
    assert!(events
        .iter()
        .any(|e| matches!(e.b, Collider::Wall(_))));
}

#[test]
fn pointer_motion_nudges_bodies_under_it_once() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(200.0, 200.0), 60.0, Vec2::ZERO));
    s.pointer_move(195.0, 200.0);
    s.pointer_move(205.0, 200.0);
    s.step();
    let v1 = s.body(id).map(|b| b.velocity).unwrap();
    assert!(v1.x > 0.25, "nudged velocity {v1:?}");

    s.step();
    let v2 = s.body(id).map(|b| b.velocity).unwrap();
    assert!(v2.x <= v1.x + 0.05, "nudge applied twice: {v1:?} -> {v2:?}");
}

#[test]
fn pointer_outside_bodies_has_no_effect() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(100.0, 100.0), 20.0, Vec2::new(1.0, 0.0)));
    s.pointer_move(300.0, 300.0);
    s.pointer_move(350.0, 300.0);
    s.step();
    let v = s.body(id).map(|b| b.velocity).unwrap();
    assert!((v.x - 0.997).abs() < 1e-3);
}

#[test]
fn hits_at_finds_containing_bodies_only() {
    let mut s = sim(400.0, 400.0);
    let a = s.add_body(square(Vec2::new(100.0, 100.0), 40.0, Vec2::ZERO));
    s.add_body(square(Vec2::new(300.0, 300.0), 40.0, Vec2::ZERO));
    assert_eq!(s.hits_at(105.0, 95.0), vec![a]);
    assert!(s.hits_at(200.0, 200.0).is_empty());
}

#[test]
fn invalid_resize_is_ignored() {
    let mut s = sim(400.0, 300.0);
    s.resize(0.0, 300.0);
    s.resize(-5.0, 10.0);
    s.resize(f32::NAN, 10.0);
    assert_eq!((s.width(), s.height()), (400.0, 300.0));
    s.resize(500.0, 320.0);
    assert_eq!((s.width(), s.height()), (500.0, 320.0));
}

#[test]
fn rescale_scales_positions_and_sizes() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(100.0, 200.0), 40.0, Vec2::ZERO));
    s.rescale(800.0, 600.0);
    let b = s.body(id).unwrap();
    assert!((b.position.x - 200.0).abs() < 1e-3);
    assert!((b.position.y - 300.0).abs() < 1e-3);
    assert!((b.size - 30.0).abs() < 1e-3, "size scales by the smaller axis");
}

#[test]
fn rescale_enforces_the_area_budget() {
    // start over budget: 10 bodies of size 65 on a 400x400 canvas
    let mut s = sim(400.0, 400.0);
    for i in 0..10 {
        s.add_body(square(
            Vec2::new(40.0 + i as f32 * 35.0, 200.0),
            130.0,
            Vec2::ZERO,
        ));
    }
    assert!(s.total_body_area() > AREA_BUDGET * 400.0 * 400.0);
    s.rescale(500.0, 400.0);
    let budget = AREA_BUDGET * 500.0 * 400.0;
    assert!(
        s.total_body_area() <= budget,
        "{} > {}",
        s.total_body_area(),
        budget
    );
}

#[test]
fn repeated_rescales_never_exceed_the_area_budget() {
    let mut rng = StdRng::seed_from_u64(41);
    for round in 0..200 {
        let mut s = sim(400.0, 400.0);
        for i in 0..10 {
            let side = rng.gen_range(60.0..160.0);
            s.add_body(square(Vec2::new(30.0 + i as f32 * 35.0, 200.0), side, Vec2::ZERO));
        }
        let (w, h) = (rng.gen_range(150.0..900.0), rng.gen_range(150.0..900.0));
        s.rescale(w, h);
        let budget = AREA_BUDGET * w * h;
        assert!(
            s.total_body_area() <= budget,
            "round {round}: {} > {budget} on {w}x{h}",
            s.total_body_area()
        );
    }
}

#[test]
fn rescaled_outlines_keep_colliding_without_restarting_contacts() {
    let mut s = sim(400.0, 400.0);
    let a = s.add_body(square(Vec2::new(100.0, 100.0), 40.0, Vec2::ZERO));
    let b = s.add_body(square(Vec2::new(135.0, 100.0), 40.0, Vec2::ZERO));
    assert_eq!(s.step().iter().filter_map(|e| e.body_pair()).count(), 1);

    // both squares grow into each other; the pair is already touching
    s.rescale(480.0, 480.0);
    let again: Vec<_> = s.step().iter().filter_map(|e| e.body_pair()).collect();
    assert!(again.is_empty(), "restarted {again:?}");

    for _ in 0..120 {
        s.step();
    }
    let (pa, pb) = (s.body(a).unwrap().position, s.body(b).unwrap().position);
    assert!(pa.distance(pb) > 40.0, "bodies still interpenetrate: {pa:?} {pb:?}");
}

#[test]
fn position_edits_between_steps_move_the_body() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(100.0, 100.0), 20.0, Vec2::ZERO));
    s.step();
    s.body_mut(id).unwrap().set_position(Vec2::new(300.0, 250.0));
    s.step();
    let p = s.body(id).unwrap().position;
    assert!(p.distance(Vec2::new(300.0, 250.0)) < 2.0, "{p:?}");
    assert_eq!(s.hits_at(300.0, 250.0), vec![id]);
}

#[test]
fn dispose_is_idempotent_and_stops_stepping() {
    let mut s = sim(400.0, 400.0);
    s.add_body(square(Vec2::new(100.0, 100.0), 40.0, Vec2::new(1.0, 0.0)));
    s.dispose();
    s.dispose();
    assert!(s.is_disposed());
    let steps = s.steps();
    assert!(s.step().is_empty());
    assert_eq!(s.steps(), steps);
}

#[test]
fn morph_energy_decays_every_step() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(200.0, 200.0), 40.0, Vec2::ZERO));
    s.body_mut(id).unwrap().boost_morph(1.0);
    s.step();
    let m = s.body(id).unwrap().morph_boost;
    assert!((m - 0.2).abs() < 1e-5, "morph {m}");
}

#[test]
fn saturation_holds_then_decays() {
    let mut s = sim(400.0, 400.0);
    let id = s.add_body(square(Vec2::new(200.0, 200.0), 40.0, Vec2::ZERO));
    s.body_mut(id).unwrap().boost_saturation();
    for _ in 0..120 {
        s.step();
    }
    let risen = s.body(id).unwrap().sat_level;
    assert!(risen > 0.8, "level after 2s: {risen}");
    for _ in 0..(5 * 60) {
        s.step();
    }
    let held = s.body(id).unwrap().sat_level;
    assert!((held - 1.0).abs() < 1e-4, "held {held}");
    for _ in 0..(10 * 60) {
        s.step();
    }
    let decayed = s.body(id).unwrap().sat_level;
    assert!(decayed < 0.5 && decayed > 0.2, "decayed {decayed}");
}
