// Shared simulation/audio/visual tuning constants.
//
// Units: distances are canvas CSS pixels, linear velocities are pixels per
// step, angular velocities are radians per step, times are seconds unless the
// name says otherwise.

// Timestep
pub const FRAME_MS: f64 = 1000.0 / 60.0; // one host animation frame
pub const FRAME_SEC: f32 = 1.0 / 60.0;
pub const TIME_SCALE: f32 = 0.8; // whole simulation runs 20% slow

// Population
pub const MIN_POPULATION: usize = 2;
pub const MAX_POPULATION: usize = 14;
pub const DEFAULT_POPULATION: usize = 7;

// Area budget: total body area never exceeds this share of the canvas
pub const AREA_BUDGET: f32 = 0.5;
pub const AREA_BUDGET_MARGIN: f32 = 0.999; // shrink factors land slightly under the exact root

// Calibrated body size range (bounding radius)
pub const MIN_SIZE: f32 = 20.0;
pub const MAX_SIZE: f32 = 60.0;

// Linear motion
pub const MAX_SPEED: f32 = 3.2;
pub const LINEAR_DAMPING: f32 = 0.997;
pub const SPEED_FLOOR: f32 = 0.12;
pub const SPEED_JITTER: f32 = 0.04; // full width of the re-injected jitter

// Angular motion
pub const MAX_ANGULAR: f32 = 0.08;
pub const ANGULAR_DAMPING: f32 = 0.996;
pub const ANGULAR_FLOOR: f32 = 0.002;

// Containment
pub const WALL_THICKNESS: f32 = 200.0;

// Rigid-body pipeline
pub const PHYSICS_LENGTH_UNIT: f32 = 50.0; // pixels treated as one solver length unit
pub const BODY_DENSITY: f32 = 0.001; // mass per square pixel at mass_factor 1

// Pointer nudging
pub const POINTER_NUDGE: f32 = 0.04; // velocity per pixel of pointer motion (unit mass)
pub const POINTER_TORQUE: f32 = 0.004;

// Morph boost
pub const MORPH_RETAIN_PER_STEP: f32 = 0.2;
pub const MORPH_COLLISION_BOOST: f32 = 0.35;
pub const MORPH_HOVER_BOOST: f32 = 0.2;

// Saturation timers
pub const SAT_HOLD_SEC: f32 = 8.0;
pub const SAT_RISE_PER_STEP: f32 = (1.0 / (60.0 * 1.5)) * 1.1;
pub const SAT_DECAY_TAU_SEC: f32 = 10.0;
pub const SAT_FLOOR: f32 = 0.0;

// Collision handling
pub const PAIR_DEDUP_MS: f64 = 5.0;
pub const PITCH_JITTER_STEPS: i32 = 3;
pub const PITCH_RANGE_STEPS: i32 = 4; // max distance from the seed-time index
pub const COLLISION_SPIN_KICK: f32 = 0.2; // full width of the random kick
pub const INTENSITY_ANGULAR_WEIGHT: f32 = 10.0;
pub const INTENSITY_NORMALIZER: f32 = 8.0;

// Chord batching and scheduling
pub const CHORD_WINDOW_MS: f64 = 15.0;
pub const NOTE_LEAD_SEC: f64 = 0.01;
pub const CHORD_STAGGER_SEC: f64 = 0.002;

// Parameter smoothing
pub const GATE_RAMP_SEC: f64 = 0.02;
pub const FILTER_RAMP_SEC: f64 = 0.05;
pub const TREMOLO_RAMP_SEC: f64 = 0.05;
pub const REVERB_RAMP_SEC: f64 = 0.1;

// Filter driven by spin
pub const FILTER_MIN_HZ: f32 = 400.0;
pub const FILTER_MAX_HZ: f32 = 12_000.0;
pub const FILTER_DEFAULT_HZ: f32 = 3_000.0;

// Reverb send driven by pointer height
pub const REVERB_WET_MAX: f32 = 0.7;
pub const REVERB_WET_DEFAULT: f32 = 0.4;

// Master level
pub const MASTER_DB: f32 = -8.0;
pub const LIMITER_DB: f32 = -2.0;

// Envelope ranges
pub const ATTACK_MIN_SEC: f32 = 0.005;
pub const ATTACK_SPAN_SEC: f32 = 0.05;
pub const DECAY_MIN_SEC: f32 = 0.1;
pub const DECAY_SPAN_SEC: f32 = 0.6;
pub const SUSTAIN_MIN: f32 = 0.1;
pub const SUSTAIN_SPAN: f32 = 0.7;
pub const NOTE_BUDGET_MIN_SEC: f32 = 0.25;
pub const NOTE_BUDGET_MAX_SEC: f32 = 3.0;
pub const RELEASE_RATIO_MIN: f32 = 0.6;
pub const RELEASE_RATIO_SPAN: f32 = 0.2;
pub const MIN_SEGMENT_SEC: f32 = 0.05;
pub const TREMOLO_MIN_HZ: f32 = 3.0;
pub const TREMOLO_SPAN_HZ: f32 = 3.0;
pub const TREMOLO_DEPTH: f32 = 0.6;

// Palette (base colors, hex)
pub const HEX_PALETTE: [&str; 7] = [
    "#DEC651", "#6E3A2E", "#F4E0D2", "#EC9362", "#DE4636", "#DBAAEA", "#6E657A",
];

// Rendering
pub const BACKGROUND_HEX: &str = "#f7f5ef";
pub const OUTLINE_COLOR: &str = "rgba(0,0,0,0.85)";
pub const OUTLINE_WIDTH: f32 = 3.0;
pub const PATTERN_SPACING: f32 = 60.0;
pub const PATTERN_ALPHA: f32 = 0.08;
pub const MIN_RENDER_RADIUS: f32 = 8.0;
pub const BLOB_OUTLINE_STEPS: usize = 72;
pub const BLOB_BASE_AMPLITUDE: f32 = 0.35;
pub const BLOB_MORPH_AMPLITUDE: f32 = 0.5;
pub const BLOB_WOBBLE_SPEED: f32 = 0.5;
pub const RENDER_TIME_STEP: f32 = 0.016;
pub const FILL_SAT_FLOOR_PCT: f32 = 15.0;
pub const FILL_SAT_SPAN_PCT: f32 = 84.0;
pub const BURST_PARTICLES: usize = 16;
pub const EFFECT_LIFE_DECAY: f32 = 0.02;
