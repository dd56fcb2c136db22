// Shared test doubles: an audio backend and a drawing surface that only
// record what they were asked to do.

#![allow(dead_code)]

use glam::Vec2;
use memphis_core::audio::{
    AudioBackend, AudioError, DelaySettings, GraphParam, GraphSettings, NoteSpec,
};
use memphis_core::Timbre;
use memphis_core::visuals::Surface;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct AudioLog {
    pub resumed: usize,
    pub graphs_built: Vec<GraphSettings>,
    pub graphs_disposed: usize,
    pub freeze_rebuilds: Vec<DelaySettings>,
    pub ramps: Vec<(GraphParam, f32)>,
    pub voices_created: Vec<(u32, Timbre)>,
    pub voices_disposed: Vec<u32>,
    pub notes: Vec<(u32, NoteSpec)>,
    pub closed: usize,
}

impl AudioLog {
    pub fn last_ramp(&self, param: GraphParam) -> Option<f32> {
        self.ramps
            .iter()
            .rev()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| *v)
    }

    pub fn ramp_count(&self, param: GraphParam) -> usize {
        self.ramps.iter().filter(|(p, _)| *p == param).count()
    }
}

#[derive(Debug)]
pub struct RecordedVoice {
    pub id: u32,
    pub timbre: Timbre,
}

/// Backend whose log stays readable after the engine is dropped.
pub struct RecordingBackend {
    pub log: Rc<RefCell<AudioLog>>,
    pub time: f64,
    pub fail_voices: bool,
    next_voice: u32,
}

impl RecordingBackend {
    pub fn new() -> (Self, Rc<RefCell<AudioLog>>) {
        let log = Rc::new(RefCell::new(AudioLog::default()));
        (
            Self {
                log: log.clone(),
                time: 1.0,
                fail_voices: false,
                next_voice: 1,
            },
            log,
        )
    }
}

impl AudioBackend for RecordingBackend {
    type Voice = RecordedVoice;

    fn resume(&mut self) -> Result<(), AudioError> {
        self.log.borrow_mut().resumed += 1;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn build_graph(&mut self, settings: &GraphSettings) -> Result<(), AudioError> {
        self.log.borrow_mut().graphs_built.push(settings.clone());
        Ok(())
    }

    fn rebuild_freeze_delay(&mut self, delay: DelaySettings) -> Result<(), AudioError> {
        self.log.borrow_mut().freeze_rebuilds.push(delay);
        Ok(())
    }

    fn ramp(&mut self, param: GraphParam, value: f32, _ramp_sec: f64) {
        self.log.borrow_mut().ramps.push((param, value));
    }

    fn create_voice(&mut self, timbre: Timbre) -> Result<Self::Voice, AudioError> {
        if self.fail_voices {
            return Err(AudioError::NodeCreation {
                node: "oscillator",
                detail: "test failure".into(),
            });
        }
        let id = self.next_voice;
        self.next_voice += 1;
        self.log.borrow_mut().voices_created.push((id, timbre));
        Ok(RecordedVoice { id, timbre })
    }

    fn play_note(&mut self, voice: &mut Self::Voice, note: &NoteSpec) -> Result<(), AudioError> {
        self.log.borrow_mut().notes.push((voice.id, note.clone()));
        Ok(())
    }

    fn dispose_voice(&mut self, voice: Self::Voice) {
        self.log.borrow_mut().voices_disposed.push(voice.id);
    }

    fn dispose_graph(&mut self) {
        self.log.borrow_mut().graphs_disposed += 1;
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Background(String),
    Bezier { alpha: f32 },
    Polygon { points: Vec<Vec2>, fill: String, stroke: String },
    Circle { center: Vec2, radius: f32, color: String },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn polygons(&self) -> Vec<&DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Polygon { .. }))
            .collect()
    }

    pub fn circles(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Circle { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn fill_background(&mut self, color: &str, _width: f32, _height: f32) {
        self.calls.push(DrawCall::Background(color.to_string()));
    }

    fn stroke_bezier(&mut self, _: Vec2, _: Vec2, _: Vec2, _: Vec2, _color: &str, alpha: f32) {
        self.calls.push(DrawCall::Bezier { alpha });
    }

    fn draw_polygon(&mut self, points: &[Vec2], fill: &str, stroke: &str, _line_width: f32) {
        self.calls.push(DrawCall::Polygon {
            points: points.to_vec(),
            fill: fill.to_string(),
            stroke: stroke.to_string(),
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            color: color.to_string(),
        });
    }
}
