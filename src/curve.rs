use crate::{
    core::{FrameIndex, Intensity},
    error::{SunlapseError, SunlapseResult},
};

/// Dawn / solar-noon / dusk as fractional positions in the frame domain.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolarOffsets {
    pub dawn: f64,
    pub noon: f64,
    pub dusk: f64,
}

impl SolarOffsets {
    /// Build validated offsets with `dawn <= noon <= dusk`.
    pub fn new(dawn: f64, noon: f64, dusk: f64) -> SunlapseResult<Self> {
        let offsets = Self { dawn, noon, dusk };
        offsets.validate()?;
        Ok(offsets)
    }

    pub fn validate(&self) -> SunlapseResult<()> {
        if !(self.dawn.is_finite() && self.noon.is_finite() && self.dusk.is_finite()) {
            return Err(SunlapseError::geometry(format!(
                "offsets must be finite (dawn={}, noon={}, dusk={})",
                self.dawn, self.noon, self.dusk
            )));
        }
        if self.dawn > self.noon || self.noon > self.dusk {
            return Err(SunlapseError::geometry(format!(
                "expected dawn <= noon <= dusk, got dawn={}, noon={}, dusk={}",
                self.dawn, self.noon, self.dusk
            )));
        }
        Ok(())
    }
}

/// How `255 × fraction` becomes an integer level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Truncate toward zero. Matches the output of earlier timelapses.
    #[default]
    Truncate,
    /// Round half away from zero.
    Nearest,
}

impl Rounding {
    fn apply(self, level: f64) -> f64 {
        match self {
            Self::Truncate => level.trunc(),
            Self::Nearest => level.round(),
        }
    }
}

/// Brightness of `frame` for a day described by `offsets`.
///
/// Piecewise over `[0, dawn)`, `[dawn, noon)`, `[noon, dusk)`, `[dusk, ..)`:
/// black, rising ramp, falling ramp, black. A ramp whose width is `<= 0` is a
/// step straight to its target (white for the rise, black for the fall).
pub fn intensity(frame: FrameIndex, offsets: &SolarOffsets, rounding: Rounding) -> Intensity {
    let f = frame.as_f64();

    if f < offsets.dawn {
        return Intensity::BLACK;
    }

    if f < offsets.noon {
        let width = offsets.noon - offsets.dawn;
        if width <= 0.0 {
            return Intensity::WHITE;
        }
        let level = rounding.apply(255.0 * (f - offsets.dawn) / width);
        return Intensity::from_level(level);
    }

    if f < offsets.dusk {
        let width = offsets.dusk - offsets.noon;
        if width <= 0.0 {
            return Intensity::BLACK;
        }
        let level = 255.0 - rounding.apply(255.0 * (f - offsets.noon) / width);
        return Intensity::from_level(level);
    }

    Intensity::BLACK
}
