//! Hex color parsing, HSL conversion and the palette queue used at seeding.

use crate::constants::HEX_PALETTE;
use rand::seq::SliceRandom;
use rand::Rng;

/// Hue/saturation/lightness triple. `h` in degrees [0, 360), `s`/`l` in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    /// CSS `hsl()` string with integer components.
    pub fn to_css(self) -> String {
        format!(
            "hsl({}, {}%, {}%)",
            self.h.round() as i32,
            (self.s.clamp(0.0, 1.0) * 100.0).round() as i32,
            (self.l.clamp(0.0, 1.0) * 100.0).round() as i32
        )
    }

    pub fn with_saturation(self, s: f32) -> Self {
        Self {
            s: s.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into normalized RGB.
pub fn parse_hex(hex: &str) -> Option<[f32; 3]> {
    let c = hex.trim().trim_start_matches('#');
    if c.len() != 6 || !c.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&c[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

pub fn rgb_to_hsl([r, g, b]: [f32; 3]) -> Hsl {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d == 0.0 {
        return Hsl { h: 0.0, s: 0.0, l };
    }
    let s = d / (1.0 - (2.0 * l - 1.0).abs());
    let mut h = if max == r {
        ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    h *= 60.0;
    Hsl { h, s, l }
}

/// Hue in degrees of a hex color; 0 for unparsable input.
pub fn hex_to_hue(hex: &str) -> f32 {
    parse_hex(hex).map(|rgb| rgb_to_hsl(rgb).h).unwrap_or(0.0)
}

/// Re-express `hex` as a CSS color with the given saturation (0..1), keeping
/// its hue and lightness.
pub fn hex_with_saturation(hex: &str, saturation: f32) -> String {
    match parse_hex(hex) {
        Some(rgb) => rgb_to_hsl(rgb).with_saturation(saturation).to_css(),
        None => hex.to_string(),
    }
}

/// Round-robin palette source. Each cycle hands out every palette color once
/// in shuffled order; the next cycle never starts with the color that ended
/// the previous one.
#[derive(Clone, Debug, Default)]
pub struct PaletteQueue {
    queue: Vec<&'static str>,
    last: Option<&'static str>,
}

impl PaletteQueue {
    pub fn next_color<R: Rng>(&mut self, rng: &mut R) -> &'static str {
        if self.queue.is_empty() {
            self.refill(rng);
        }
        // queue is popped from the back
        let color = self.queue.pop().unwrap_or(HEX_PALETTE[0]);
        self.last = Some(color);
        color
    }

    fn refill<R: Rng>(&mut self, rng: &mut R) {
        let mut fresh: Vec<&'static str> = HEX_PALETTE.to_vec();
        fresh.shuffle(rng);
        if let (Some(last), Some(&first)) = (self.last, fresh.last()) {
            if first == last && fresh.len() > 1 {
                let end = fresh.len() - 1;
                fresh.swap(0, end);
            }
        }
        self.queue = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn hue_of_primary_colors() {
        assert!((hex_to_hue("#FF0000") - 0.0).abs() < 1e-3);
        assert!((hex_to_hue("#00FF00") - 120.0).abs() < 1e-3);
        assert!((hex_to_hue("#0000FF") - 240.0).abs() < 1e-3);
        assert_eq!(hex_to_hue("nope"), 0.0);
    }

    #[test]
    fn saturation_override_keeps_hue_and_lightness() {
        let css = hex_with_saturation("#DE4636", 0.15);
        assert!(css.starts_with("hsl(6, 15%,"), "{css}");
    }

    #[test]
    fn palette_cycles_without_repeats() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut q = PaletteQueue::default();
        let mut prev: Option<&str> = None;
        for cycle in 0..5 {
            let mut seen = Vec::new();
            for _ in 0..HEX_PALETTE.len() {
                let c = q.next_color(&mut rng);
                assert_ne!(Some(c), prev, "immediate repeat in cycle {cycle}");
                assert!(!seen.contains(&c));
                seen.push(c);
                prev = Some(c);
            }
        }
    }
}
