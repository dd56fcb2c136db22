//! Runtime configuration. Every struct has a `Default` built from
//! `constants.rs`; hosts override individual fields.

use crate::constants::*;

/// Minimum accepted canvas edge, in pixels.
pub const MIN_CANVAS_EDGE: f32 = 1.0;

/// Host-supplied scene setup.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub width: f32,
    pub height: f32,
    pub population: usize,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub physics: PhysicsParams,
    pub audio: AudioParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            population: DEFAULT_POPULATION,
            seed: None,
            physics: PhysicsParams::default(),
            audio: AudioParams::default(),
        }
    }
}

impl SceneConfig {
    /// Clamp the population and dimensions into their valid ranges.
    pub fn sanitized(mut self) -> Self {
        self.population = clamp_population(self.population);
        if !self.width.is_finite() || self.width < MIN_CANVAS_EDGE {
            self.width = MIN_CANVAS_EDGE;
        }
        if !self.height.is_finite() || self.height < MIN_CANVAS_EDGE {
            self.height = MIN_CANVAS_EDGE;
        }
        self
    }
}

/// Clamp a requested body count to `[MIN_POPULATION, MAX_POPULATION]`.
#[inline]
pub fn clamp_population(n: usize) -> usize {
    n.clamp(MIN_POPULATION, MAX_POPULATION)
}

/// Simulation Engine tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsParams {
    pub max_speed: f32,
    pub max_angular: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub speed_floor: f32,
    pub speed_jitter: f32,
    pub angular_floor: f32,
    pub wall_thickness: f32,
    pub time_scale: f32,
    pub morph_retain: f32,
    pub pointer_nudge: f32,
    pub pointer_torque: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            max_angular: MAX_ANGULAR,
            linear_damping: LINEAR_DAMPING,
            angular_damping: ANGULAR_DAMPING,
            speed_floor: SPEED_FLOOR,
            speed_jitter: SPEED_JITTER,
            angular_floor: ANGULAR_FLOOR,
            wall_thickness: WALL_THICKNESS,
            time_scale: TIME_SCALE,
            morph_retain: MORPH_RETAIN_PER_STEP,
            pointer_nudge: POINTER_NUDGE,
            pointer_torque: POINTER_TORQUE,
        }
    }
}

/// Audio Engine tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParams {
    pub chord_window_ms: f64,
    pub lead_sec: f64,
    pub stagger_sec: f64,
    /// Spin magnitude that maps to the top of the filter range.
    pub spin_full_scale: f32,
    pub filter_min_hz: f32,
    pub filter_max_hz: f32,
    pub master_db: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            chord_window_ms: CHORD_WINDOW_MS,
            lead_sec: NOTE_LEAD_SEC,
            stagger_sec: CHORD_STAGGER_SEC,
            spin_full_scale: MAX_ANGULAR,
            filter_min_hz: FILTER_MIN_HZ,
            filter_max_hz: FILTER_MAX_HZ,
            master_db: MASTER_DB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_is_clamped() {
        assert_eq!(clamp_population(0), 2);
        assert_eq!(clamp_population(7), 7);
        assert_eq!(clamp_population(99), 14);
    }

    #[test]
    fn sanitized_rejects_degenerate_canvas() {
        let cfg = SceneConfig {
            width: -5.0,
            height: f32::NAN,
            population: 40,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.width, MIN_CANVAS_EDGE);
        assert_eq!(cfg.height, MIN_CANVAS_EDGE);
        assert_eq!(cfg.population, MAX_POPULATION);
    }
}
