use clap::Parser;
use glam::Vec2;
use memphis_core::{ManualClock, Scene, SceneConfig, Surface};

mod backend;

use backend::LogBackend;

const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Number of frames to simulate (60 per second)
    #[arg(long, default_value_t = 1800)]
    frames: u64,

    /// Body count, clamped to 2..=14
    #[arg(long, default_value_t = 8)]
    population: usize,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 960.0)]
    width: f32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 640.0)]
    height: f32,

    /// RNG seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Sweep a virtual pointer across the canvas every frame
    #[arg(long, default_value_t = false)]
    sweep: bool,

    /// Hold the freeze capture from this frame for two seconds
    #[arg(long)]
    freeze_at: Option<u64>,
}

/// Surface that only counts what it was asked to draw.
#[derive(Default)]
struct CountingSurface {
    polygons: u64,
    strokes: u64,
    circles: u64,
}

impl Surface for CountingSurface {
    fn fill_background(&mut self, _color: &str, _width: f32, _height: f32) {}

    fn stroke_bezier(&mut self, _: Vec2, _: Vec2, _: Vec2, _: Vec2, _color: &str, _alpha: f32) {
        self.strokes += 1;
    }

    fn draw_polygon(&mut self, _points: &[Vec2], _fill: &str, _stroke: &str, _line_width: f32) {
        self.polygons += 1;
    }

    fn fill_circle(&mut self, _center: Vec2, _radius: f32, _color: &str) {
        self.circles += 1;
    }
}

/// Pointer position on a slow Lissajous path.
fn sweep_point(frame: u64, width: f32, height: f32) -> Vec2 {
    let t = frame as f32 / 60.0;
    Vec2::new(
        width * (0.5 + 0.4 * (t * 0.7).sin()),
        height * (0.5 + 0.4 * (t * 1.1).cos()),
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if !(args.width.is_finite() && args.height.is_finite() && args.width > 0.0 && args.height > 0.0) {
        anyhow::bail!("canvas must have a positive size, got {}x{}", args.width, args.height);
    }

    let clock = ManualClock::new(0.0);
    let config = SceneConfig {
        width: args.width,
        height: args.height,
        population: args.population,
        seed: args.seed,
        ..Default::default()
    };
    let mut scene = Scene::with_clock(config, LogBackend::new(clock.clone()), clock.clone());
    log::info!(
        "[native] {} frames, {} bodies on {}x{}",
        args.frames,
        scene.population_count(),
        scene.simulation().width(),
        scene.simulation().height()
    );

    // Stands in for the first user gesture.
    scene.ensure_audio_started();

    let freeze_window = args.freeze_at.map(|f| (f, f + 120));
    let mut surface = CountingSurface::default();
    let mut last_pointer: Option<Vec2> = None;
    let mut contacts = 0_u64;
    let mut played = 0_u64;

    for frame in 0..args.frames {
        clock.advance(FRAME_MS);

        if args.sweep {
            let p = sweep_point(frame, scene.simulation().width(), scene.simulation().height());
            let movement = last_pointer.map(|l| p - l).unwrap_or(Vec2::ZERO);
            scene.pointer_move(p.x, p.y, movement);
            last_pointer = Some(p);
        }
        if let Some((start, end)) = freeze_window {
            if frame == start {
                scene.freeze_press();
                log::info!("[native] freeze -> {}", scene.freeze_state());
            } else if frame == end {
                scene.freeze_release();
                log::info!("[native] freeze -> {}", scene.freeze_state());
            }
        }

        let stats = scene.tick();
        contacts += stats.contacts as u64;
        played += stats.notes_played as u64;
        scene.render(&mut surface);
    }

    let backend = scene.audio().backend();
    log::info!(
        "[native] done: contacts={} notes={} (backend saw {}), voices={}, polygons={} strokes={} particles={}",
        contacts,
        played,
        backend.notes,
        scene.audio().voice_count(),
        surface.polygons,
        surface.strokes,
        surface.circles
    );
    scene.dispose();
    Ok(())
}
