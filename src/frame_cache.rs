use std::path::{Path, PathBuf};

use crate::{
    core::{Canvas, Intensity},
    error::{SunlapseError, SunlapseResult},
};

/// Writes one uniformly filled frame to `path`.
pub trait FrameSynthesizer {
    fn synthesize(&mut self, canvas: Canvas, intensity: Intensity, path: &Path)
    -> SunlapseResult<()>;
}

/// Uniform RGB8 PNG via the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngSynthesizer;

impl FrameSynthesizer for PngSynthesizer {
    fn synthesize(
        &mut self,
        canvas: Canvas,
        intensity: Intensity,
        path: &Path,
    ) -> SunlapseResult<()> {
        let v = intensity.0;
        let img = image::RgbImage::from_pixel(canvas.width, canvas.height, image::Rgb([v, v, v]));
        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| SunlapseError::FrameSynthesis {
                intensity: v,
                source,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedFrame {
    pub intensity: Intensity,
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePopulation {
    /// Materialize a frame on its first request.
    #[default]
    Lazy,
    /// Materialize all 256 frames before assembly starts.
    Eager,
}

/// At most one physical frame per intensity for the lifetime of the cache.
///
/// Creation goes through `&mut self`, so there is a single writer. A parallel
/// assembler would call [`FrameCache::prefill`] first and then share the
/// cache read-only through [`FrameCache::lookup`].
pub struct FrameCache<S> {
    dir: PathBuf,
    canvas: Canvas,
    synth: S,
    slots: Vec<Option<CachedFrame>>,
    synthesized: u64,
}

impl<S: FrameSynthesizer> FrameCache<S> {
    /// `dir` must already exist.
    pub fn new(dir: impl Into<PathBuf>, canvas: Canvas, synth: S) -> Self {
        Self {
            dir: dir.into(),
            canvas,
            synth,
            slots: vec![None; 256],
            synthesized: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn frame_path(&self, intensity: Intensity) -> PathBuf {
        self.dir.join(format!("{:03}.png", intensity.0))
    }

    /// Existing frame for `intensity`, synthesizing it on the first request.
    pub fn get(&mut self, intensity: Intensity) -> SunlapseResult<&CachedFrame> {
        let slot = usize::from(intensity.0);
        if self.slots[slot].is_none() {
            let path = self.frame_path(intensity);
            self.synth.synthesize(self.canvas, intensity, &path)?;
            self.synthesized += 1;
            tracing::debug!(intensity = intensity.0, path = %path.display(), "cached frame");
            self.slots[slot] = Some(CachedFrame { intensity, path });
        }
        self.slots[slot]
            .as_ref()
            .ok_or_else(|| SunlapseError::validation("frame cache slot empty after fill (bug)"))
    }

    pub fn lookup(&self, intensity: Intensity) -> Option<&CachedFrame> {
        self.slots[usize::from(intensity.0)].as_ref()
    }

    /// Materialize every intensity not cached yet.
    pub fn prefill(&mut self) -> SunlapseResult<()> {
        for intensity in Intensity::all() {
            self.get(intensity)?;
        }
        tracing::info!(frames = self.len(), dir = %self.dir.display(), "frame cache prefilled");
        Ok(())
    }

    /// Number of frames materialized so far.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of calls made into the synthesizer.
    pub fn synthesized_count(&self) -> u64 {
        self.synthesized
    }
}
