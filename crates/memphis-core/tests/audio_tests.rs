// Integration tests for the audio engine policy, driven through a
// recording backend.

mod common;

use common::RecordingBackend;
use memphis_core::audio::{
    db_to_gain, AudioEngine, CollisionNote, EntityId, FreezeState, GraphParam,
    FREEZE_CAPTURE_DELAY, FREEZE_IDLE_DELAY,
};
use memphis_core::constants::{FILTER_MAX_HZ, FILTER_MIN_HZ, MASTER_DB};
use memphis_core::{AudioParams, Timbre};
use glam::Vec2;

fn started() -> (AudioEngine<RecordingBackend>, std::rc::Rc<std::cell::RefCell<common::AudioLog>>) {
    let (backend, log) = RecordingBackend::new();
    let mut engine = AudioEngine::new(backend, AudioParams::default());
    engine.ensure_started();
    (engine, log)
}

fn note(entity: u32, t: f64) -> CollisionNote {
    CollisionNote {
        entity: EntityId(entity),
        velocity: 0.7,
        size: 40.0,
        hue: 200.0,
        morph_level: 0.3,
        timestamp_ms: t,
        pitch_index: Some(entity as usize),
        spin: 0.01,
        timbre: Some(Timbre::Triangle),
    }
}

#[test]
fn notes_before_start_are_dropped() {
    let (backend, log) = RecordingBackend::new();
    let mut engine = AudioEngine::new(backend, AudioParams::default());
    engine.trigger_collision(note(1, 0.0));
    assert_eq!(engine.pending_notes(), 0);
    assert_eq!(engine.poll(100.0), 0);
    assert!(log.borrow().notes.is_empty());
}

#[test]
fn ensure_started_is_idempotent() {
    let (mut engine, log) = started();
    engine.ensure_started();
    engine.ensure_started();
    assert!(engine.is_started());
    assert_eq!(log.borrow().resumed, 1);
}

#[test]
fn far_apart_collisions_play_as_separate_solo_notes() {
    let (mut engine, log) = started();
    engine.trigger_collision(note(1, 0.0));
    engine.trigger_collision(note(2, 20.0));
    assert_eq!(engine.poll(14.0), 0);
    assert_eq!(engine.poll(15.0), 1);
    assert_eq!(engine.poll(35.0), 1);

    let log = log.borrow();
    assert_eq!(log.notes.len(), 2);
    for (_, spec) in &log.notes {
        assert!((spec.start_time - (1.0 + 0.01)).abs() < 1e-9);
    }
}

#[test]
fn close_collisions_flush_together_with_stagger() {
    let (mut engine, log) = started();
    engine.trigger_collision(note(1, 0.0));
    engine.trigger_collision(note(2, 5.0));
    assert_eq!(engine.poll(10.0), 0);
    assert_eq!(engine.poll(15.0), 2);

    let log = log.borrow();
    let starts: Vec<f64> = log.notes.iter().map(|(_, n)| n.start_time).collect();
    assert!((starts[0] - 1.01).abs() < 1e-9);
    assert!((starts[1] - starts[0] - 0.002).abs() < 1e-9);
}

#[test]
fn ten_ms_apart_is_still_inside_the_window() {
    let (mut engine, _log) = started();
    engine.trigger_collision(note(1, 0.0));
    engine.trigger_collision(note(2, 10.0));
    assert_eq!(engine.poll(15.0), 2);
}

#[test]
fn voices_are_reused_per_entity_and_timbre() {
    let (mut engine, log) = started();
    engine.trigger_collision(note(1, 0.0));
    engine.poll(100.0);
    engine.trigger_collision(note(1, 200.0));
    engine.poll(300.0);
    engine.trigger_collision(CollisionNote {
        timbre: Some(Timbre::Square),
        ..note(1, 400.0)
    });
    engine.poll(500.0);

    assert_eq!(engine.voice_count(), 2);
    let log = log.borrow();
    assert_eq!(log.voices_created.len(), 2);
    assert_eq!(log.notes[0].0, log.notes[1].0);
    assert_ne!(log.notes[0].0, log.notes[2].0);
}

#[test]
fn timbre_and_pitch_fall_back_to_hue_and_size() {
    let (mut engine, log) = started();
    let mut n = CollisionNote::simple(EntityId(3), 0.5, 0.0);
    n.size = 60.0;
    n.hue = 10.0;
    engine.trigger_collision(n.clone());
    engine.poll(20.0);

    let log = log.borrow();
    assert_eq!(log.voices_created[0].1, Timbre::Sine);
    let lowest = engine.scale().frequency_hz(0);
    assert!((log.notes[0].1.frequency_hz - lowest).abs() < 1e-3);
    assert_eq!(engine.pitch_index_for(&CollisionNote { size: 20.0, ..n }), 23);
}

#[test]
fn explicit_pitch_index_is_clamped() {
    let (engine, _log) = started();
    let n = CollisionNote {
        pitch_index: Some(500),
        ..note(1, 0.0)
    };
    assert_eq!(engine.pitch_index_for(&n), engine.scale().max_index());
}

#[test]
fn spin_drives_the_filter_cutoff() {
    let (mut engine, log) = started();
    engine.trigger_collision(CollisionNote {
        spin: -1.0,
        ..note(1, 0.0)
    });
    assert_eq!(log.borrow().last_ramp(GraphParam::FilterCutoff), Some(FILTER_MAX_HZ));
    engine.trigger_collision(CollisionNote {
        spin: 0.0,
        ..note(2, 1.0)
    });
    assert_eq!(log.borrow().last_ramp(GraphParam::FilterCutoff), Some(FILTER_MIN_HZ));
    let mid = engine.filter_cutoff_for_spin(0.04);
    assert!((mid - (FILTER_MIN_HZ + FILTER_MAX_HZ) / 2.0).abs() < 1.0);
}

#[test]
fn harder_hits_get_shorter_attacks() {
    let (mut engine, log) = started();
    engine.trigger_collision(CollisionNote {
        velocity: 1.0,
        ..note(1, 0.0)
    });
    engine.trigger_collision(CollisionNote {
        velocity: 0.1,
        ..note(2, 100.0)
    });
    engine.poll(1000.0);
    let log = log.borrow();
    let hard = &log.notes[0].1;
    let soft = &log.notes[1].1;
    assert!(hard.envelope.attack < soft.envelope.attack);
    assert!(hard.envelope.decay < soft.envelope.decay);
    assert!(hard.audible_duration() <= 3.0 + 1e-4);
}

#[test]
fn pointer_height_sets_reverb_wet() {
    let (mut engine, log) = started();
    engine.modulate_with_pointer(Vec2::new(10.0, 0.0), 400.0);
    assert_eq!(log.borrow().last_ramp(GraphParam::ReverbWet), Some(0.7));
    engine.modulate_with_pointer(Vec2::new(10.0, 400.0), 400.0);
    assert_eq!(log.borrow().last_ramp(GraphParam::ReverbWet), Some(0.0));
    engine.modulate_with_pointer(Vec2::new(10.0, 200.0), 400.0);
    let wet = log.borrow().last_ramp(GraphParam::ReverbWet).unwrap();
    assert!((wet - 0.35).abs() < 1e-6);
}

#[test]
fn freeze_cycle_rebuilds_only_on_press_and_clear() {
    let (mut engine, log) = started();
    assert_eq!(engine.freeze_state(), FreezeState::Idle);

    engine.freeze_press();
    assert_eq!(engine.freeze_state(), FreezeState::Recording);
    assert_eq!(log.borrow().freeze_rebuilds, vec![FREEZE_CAPTURE_DELAY]);
    assert_eq!(log.borrow().last_ramp(GraphParam::FreezeInputGate), Some(1.0));

    engine.freeze_press();
    assert_eq!(engine.freeze_state(), FreezeState::Recording);
    assert_eq!(log.borrow().freeze_rebuilds.len(), 1);

    engine.freeze_release();
    assert_eq!(engine.freeze_state(), FreezeState::Playing);
    assert_eq!(log.borrow().last_ramp(GraphParam::FreezeInputGate), Some(0.0));
    assert_eq!(log.borrow().last_ramp(GraphParam::FreezeFeedback), Some(0.98));
    assert_eq!(log.borrow().freeze_rebuilds.len(), 1);

    engine.clear_freeze_buffer();
    assert_eq!(engine.freeze_state(), FreezeState::Idle);
    assert_eq!(
        log.borrow().freeze_rebuilds,
        vec![FREEZE_CAPTURE_DELAY, FREEZE_IDLE_DELAY]
    );

    let ramps_before = log.borrow().ramps.len();
    engine.freeze_release();
    assert_eq!(engine.freeze_state(), FreezeState::Idle);
    assert_eq!(log.borrow().ramps.len(), ramps_before);
}

#[test]
fn clearing_while_recording_returns_to_idle() {
    let (mut engine, log) = started();
    engine.freeze_press();
    engine.clear_freeze_buffer();
    assert_eq!(engine.freeze_state(), FreezeState::Idle);
    assert_eq!(log.borrow().freeze_rebuilds.len(), 2);
}

#[test]
fn mute_ramps_master_and_survives_rebuild() {
    let (mut engine, log) = started();
    engine.set_muted(true);
    assert!(engine.is_muted());
    assert_eq!(log.borrow().last_ramp(GraphParam::MasterGain), Some(0.0));

    engine.rebuild();
    assert!(engine.is_muted());
    {
        let log = log.borrow();
        assert_eq!(log.graphs_built.len(), 2);
        assert_eq!(log.graphs_built[1].master_gain, 0.0);
        assert_eq!(log.graphs_disposed, 1);
    }

    assert!(!engine.toggle_mute());
    let unmuted = log.borrow().last_ramp(GraphParam::MasterGain).unwrap();
    assert!((unmuted - db_to_gain(MASTER_DB)).abs() < 1e-6);
}

#[test]
fn rebuild_drops_voices_pending_notes_and_freeze() {
    let (mut engine, log) = started();
    engine.trigger_collision(note(1, 0.0));
    engine.poll(20.0);
    engine.trigger_collision(note(2, 30.0));
    engine.freeze_press();
    engine.rebuild();

    assert_eq!(engine.voice_count(), 0);
    assert_eq!(engine.pending_notes(), 0);
    assert_eq!(engine.freeze_state(), FreezeState::Idle);
    assert!(engine.is_started());
    assert_eq!(log.borrow().voices_disposed.len(), 1);
}

#[test]
fn dispose_releases_every_node_exactly_once() {
    let (mut engine, log) = started();
    for i in 0..4 {
        engine.trigger_collision(note(i, i as f64 * 100.0));
        engine.poll(i as f64 * 100.0 + 20.0);
    }
    engine.dispose();
    engine.dispose();
    drop(engine);

    let log = log.borrow();
    let mut disposed = log.voices_disposed.clone();
    disposed.sort_unstable();
    let created: Vec<u32> = log.voices_created.iter().map(|(id, _)| *id).collect();
    assert_eq!(disposed, created);
    assert_eq!(log.graphs_disposed, 1);
    assert_eq!(log.closed, 1);
}

#[test]
fn voices_of_removed_entities_are_released() {
    let (mut engine, log) = started();
    for i in 0..3 {
        engine.trigger_collision(note(i, i as f64 * 100.0));
        engine.poll(i as f64 * 100.0 + 20.0);
    }
    engine.trigger_collision(note(2, 400.0));
    assert_eq!(engine.voice_count(), 3);

    let released = engine.retain_entities(&[EntityId(1)]);
    assert_eq!(released, 2);
    assert_eq!(engine.voice_count(), 1);
    assert_eq!(engine.pending_notes(), 0, "entity 2's waiting note is dropped");
    assert_eq!(log.borrow().voices_disposed.len(), 2);
    assert!(log.borrow().graphs_disposed == 0);

    assert_eq!(engine.retain_entities(&[EntityId(1)]), 0);
}

#[test]
fn drop_disposes_the_engine() {
    let (engine, log) = started();
    drop(engine);
    assert_eq!(log.borrow().graphs_disposed, 1);
}

#[test]
fn calls_after_dispose_are_ignored() {
    let (mut engine, log) = started();
    engine.dispose();
    engine.trigger_collision(note(1, 0.0));
    engine.freeze_press();
    engine.rebuild();
    assert_eq!(engine.poll(100.0), 0);
    assert_eq!(engine.freeze_state(), FreezeState::Idle);
    assert_eq!(log.borrow().graphs_built.len(), 1);
}

#[test]
fn voice_creation_failure_drops_the_note() {
    let (mut engine, log) = started();
    engine.backend_mut().fail_voices = true;
    engine.trigger_collision(note(1, 0.0));
    assert_eq!(engine.poll(20.0), 0);
    assert_eq!(engine.voice_count(), 0);

    engine.backend_mut().fail_voices = false;
    engine.trigger_collision(note(1, 30.0));
    assert_eq!(engine.poll(50.0), 1);
    assert_eq!(log.borrow().notes.len(), 1);
}

#[test]
fn trigger_simple_uses_a_neutral_descriptor() {
    let (mut engine, log) = started();
    engine.trigger_simple(EntityId(9), 0.8, 0.0);
    assert_eq!(engine.poll(20.0), 1);
    let log = log.borrow();
    assert_eq!(log.voices_created[0].1, Timbre::Square);
    assert_eq!(log.last_ramp(GraphParam::FilterCutoff), Some(FILTER_MIN_HZ));
}
