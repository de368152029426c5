use crate::error::{SunlapseError, SunlapseResult};

/// 0-based frame position inside one day's frame domain `[0, frames_per_day)`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

/// 8-bit grayscale level, equal across R/G/B.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Intensity(pub u8);

impl Intensity {
    pub const BLACK: Self = Self(0);
    pub const WHITE: Self = Self(255);

    /// Clamp an already-rounded level into `[0, 255]`.
    pub fn from_level(level: f64) -> Self {
        if level.is_nan() {
            return Self::BLACK;
        }
        Self(level.clamp(0.0, 255.0) as u8)
    }

    /// Every representable intensity, darkest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=u8::MAX).map(Self)
    }

    pub fn inverted(self) -> Self {
        Self(u8::MAX - self.0)
    }
}

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> SunlapseResult<Self> {
        if width == 0 || height == 0 {
            return Err(SunlapseError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_from_level_clamps_and_truncates() {
        assert_eq!(Intensity::from_level(-3.0), Intensity(0));
        assert_eq!(Intensity::from_level(127.9), Intensity(127));
        assert_eq!(Intensity::from_level(300.0), Intensity(255));
        assert_eq!(Intensity::from_level(f64::NAN), Intensity(0));
    }

    #[test]
    fn intensity_domain_has_256_values() {
        assert_eq!(Intensity::all().count(), 256);
        assert_eq!(Intensity(40).inverted(), Intensity(215));
    }

    #[test]
    fn canvas_rejects_zero_dimensions() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 0).is_err());
        assert!(Canvas::new(2, 2).is_ok());
    }
}
