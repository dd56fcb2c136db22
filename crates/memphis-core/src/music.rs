use crate::constants::{MAX_SIZE, MIN_SIZE};

/// Oscillator family used by a body's synth voice.
///
/// The last two are layered variants: `FatSawtooth` stacks detuned saws and
/// `FmTriangle` is a triangle carrier under sine frequency modulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timbre {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    FatSawtooth,
    FmTriangle,
}

impl Timbre {
    /// Coarse 60-degree hue buckets.
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(360.0);
        if h < 60.0 {
            Timbre::Sine
        } else if h < 120.0 {
            Timbre::Triangle
        } else if h < 180.0 {
            Timbre::Sawtooth
        } else if h < 240.0 {
            Timbre::Square
        } else if h < 300.0 {
            Timbre::FatSawtooth
        } else {
            Timbre::FmTriangle
        }
    }

    /// Explicit per-color override for the palette (warmer colors get richer
    /// spectra). Unknown colors return `None` and fall back to the hue bucket.
    pub fn for_palette_hex(hex: &str) -> Option<Self> {
        let t = match hex.to_ascii_uppercase().as_str() {
            "#DE4636" => Timbre::FatSawtooth,
            "#EC9362" => Timbre::FmTriangle,
            "#DEC651" => Timbre::Sawtooth,
            "#6E3A2E" => Timbre::Square,
            "#DBAAEA" => Timbre::Triangle,
            "#6E657A" => Timbre::Sine,
            "#F4E0D2" => Timbre::Triangle,
            _ => return None,
        };
        Some(t)
    }
}

/// Dorian mode (relative semitone degrees within one octave).
pub const DORIAN: &[i32] = &[0, 2, 3, 5, 7, 9, 10];

/// MIDI note of G2, the lowest note of the instrument.
pub const G2_MIDI: i32 = 43;

/// Number of notes in the playable scale.
pub const SCALE_LEN: usize = 24;

/// The playable scale: G Dorian from G2 up to Bb5, as MIDI note numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    notes: Vec<i32>,
}

impl Default for Scale {
    fn default() -> Self {
        Self::build(G2_MIDI, DORIAN, SCALE_LEN)
    }
}

impl Scale {
    /// Walk `degrees` upward from `root_midi`, octave by octave, until `len`
    /// notes have been collected.
    pub fn build(root_midi: i32, degrees: &[i32], len: usize) -> Self {
        let mut notes = Vec::with_capacity(len);
        if degrees.is_empty() {
            return Self { notes };
        }
        let mut octave = 0;
        while notes.len() < len {
            for d in degrees {
                if notes.len() == len {
                    break;
                }
                notes.push(root_midi + octave * 12 + d);
            }
            octave += 1;
        }
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Highest valid index.
    pub fn max_index(&self) -> usize {
        self.notes.len().saturating_sub(1)
    }

    /// Clamp any (possibly negative) index into range.
    pub fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.max_index() as i64) as usize
    }

    pub fn midi(&self, index: usize) -> i32 {
        self.notes
            .get(index.min(self.max_index()))
            .copied()
            .unwrap_or(G2_MIDI)
    }

    pub fn frequency_hz(&self, index: usize) -> f32 {
        midi_to_hz(self.midi(index) as f32)
    }

    /// Map a body size onto the scale: larger bodies sound lower.
    pub fn index_for_size(&self, size: f32) -> usize {
        let clamped = size.clamp(MIN_SIZE, MAX_SIZE);
        let t = (clamped - MIN_SIZE) / (MAX_SIZE - MIN_SIZE);
        let inv = 1.0 - t;
        let idx = (inv * self.max_index() as f32).round() as i64;
        self.clamp_index(idx)
    }
}

/// Convert a MIDI note number to Hertz (A4=440 Hz).
///
/// Monotonic and exhibits octave symmetry: +12 semitones doubles the frequency.
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}
