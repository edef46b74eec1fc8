//! Status strip animations.
//!
//! A [`Pattern`] is a colour plus an [`Animation`]; [`LedPatternEngine`]
//! turns elapsed time into the colour to show.  The indicator loop ticks
//! it once per cadence.
//!
//! | Pattern    | Animation   | Colour | Period  |
//! |------------|-------------|--------|---------|
//! | `POURING`  | Breathing   | blue   | 2000 ms |
//! | `CLEANING` | Blink       | cyan   | 250 ms  |
//! | `SUCCESS`  | DoubleFlash | green  | 1000 ms |

/// Colour as (R, G, B), each 0–255.
pub type Rgb = (u8, u8, u8);

pub const OFF: Rgb = (0, 0, 0);

pub const COLOUR_POURING: Rgb = (0, 50, 255);
pub const COLOUR_CLEANING: Rgb = (0, 200, 200);
pub const COLOUR_SUCCESS: Rgb = (0, 255, 50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    /// Triangle ramp from dark to full and back.
    Breathing { period_ms: u32 },
    /// On for the first half of each period.
    Blink { period_ms: u32 },
    /// Two 100 ms flashes at the start of each second.
    DoubleFlash,
}

impl Animation {
    /// Brightness (0–255) at `phase_ms` into the animation.
    fn level(self, phase_ms: u32) -> u8 {
        match self {
            Self::Breathing { period_ms } => triangle(phase_ms, period_ms),
            Self::Blink { period_ms } => {
                if phase_ms % period_ms < period_ms / 2 {
                    u8::MAX
                } else {
                    0
                }
            }
            Self::DoubleFlash => match phase_ms % 1000 {
                0..100 | 200..300 => u8::MAX,
                _ => 0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub colour: Rgb,
    pub animation: Animation,
}

/// Shown while pumps pour.
pub const POURING: Pattern = Pattern {
    colour: COLOUR_POURING,
    animation: Animation::Breathing { period_ms: 2000 },
};
/// Shown while every line is flushed.
pub const CLEANING: Pattern = Pattern {
    colour: COLOUR_CLEANING,
    animation: Animation::Blink { period_ms: 250 },
};
/// One-shot completion cue.
pub const SUCCESS: Pattern = Pattern {
    colour: COLOUR_SUCCESS,
    animation: Animation::DoubleFlash,
};

/// Plays one [`Pattern`] from phase zero.
pub struct LedPatternEngine {
    pattern: Pattern,
    phase_ms: u32,
}

impl LedPatternEngine {
    pub fn with_pattern(pattern: Pattern) -> Self {
        Self { pattern, phase_ms: 0 }
    }

    /// Move `delta_ms` forward and return the colour to show.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        dim(self.pattern.colour, self.pattern.animation.level(self.phase_ms))
    }
}

fn triangle(phase_ms: u32, period_ms: u32) -> u8 {
    let half = u64::from(period_ms / 2).max(1);
    let pos = u64::from(phase_ms % period_ms.max(1));
    let rising = if pos < half { pos } else { u64::from(period_ms) - pos };
    (rising * 255 / half).min(255) as u8
}

fn dim((r, g, b): Rgb, level: u8) -> Rgb {
    let scale = |c: u8| (u16::from(c) * u16::from(level) / 255) as u8;
    (scale(r), scale(g), scale(b))
}
