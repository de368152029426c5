use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::{
    config::TimelapseConfig,
    encode_ffmpeg::{EncodeConfig, FfmpegEncoder, VideoEncoder},
    error::{SunlapseError, SunlapseResult},
    frame_cache::{CachePopulation, FrameCache, FrameSynthesizer, PngSynthesizer},
    heatmap::{self, BrightnessMatrix},
    sequence::{SequenceAssembler, matrix_only},
    solar::{SolarDay, SolarEventSource, SolarTimingAdapter, SpaEventSource},
};

/// Which final artifacts a run produces.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub encode_video: bool,
    pub write_heatmap: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            encode_video: true,
            write_heatmap: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub dates: usize,
    pub entries_published: u64,
    pub frames_synthesized: u64,
    pub distinct_intensities: usize,
}

#[derive(Clone, Debug)]
pub struct RunOutput {
    pub matrix: BrightnessMatrix,
    pub stats: RunStats,
}

/// Full run with the bundled collaborators: SPA lookup, PNG frames, system ffmpeg.
pub fn run_timelapse(cfg: &TimelapseConfig, opts: RunOptions) -> SunlapseResult<RunOutput> {
    run_timelapse_with(
        cfg,
        SpaEventSource {
            delta_t: cfg.delta_t,
        },
        PngSynthesizer,
        &mut FfmpegEncoder,
        opts,
    )
}

/// Solar days -> frame cache + sequence -> video -> heatmap.
///
/// `frames/` and `sequence/` under the work directory are wiped and recreated
/// first, so a rerun never reads leftovers. The sequence directory is removed
/// again on every exit path. The video and heatmap are staged next to their
/// targets and only renamed into place once both have been written.
pub fn run_timelapse_with<E, S, V>(
    cfg: &TimelapseConfig,
    source: E,
    synth: S,
    encoder: &mut V,
    opts: RunOptions,
) -> SunlapseResult<RunOutput>
where
    E: SolarEventSource,
    S: FrameSynthesizer,
    V: VideoEncoder + ?Sized,
{
    cfg.validate()?;
    let canvas = cfg.canvas()?;
    let days = solar_days_with(cfg, source)?;

    prepare_work_dir(cfg, opts.encode_video)?;

    let mut cache = FrameCache::new(cfg.frames_dir(), canvas, synth);
    if cfg.cache_population == CachePopulation::Eager {
        cache.prefill()?;
    }

    let mut staged = Vec::new();
    let (matrix, entries_published) = if opts.encode_video {
        let sequence = ScratchDirGuard::new(cfg.sequence_dir());
        let assembler = SequenceAssembler::new(
            sequence.path(),
            cfg.frames_per_day,
            cfg.rounding,
            cfg.publish_mode,
        );
        let assembly = assembler.assemble(&cfg.dates, &days, &mut cache)?;
        tracing::info!(
            entries = assembly.entries_published,
            distinct = assembly.distinct_intensities,
            "sequence assembled"
        );

        let video = StagedOutput::new(cfg.video_out.clone());
        let encode_cfg = EncodeConfig {
            out_path: video.staged().to_path_buf(),
            ..cfg.encode_config()
        };
        encoder.encode(sequence.path(), &encode_cfg)?;
        staged.push(video);
        sequence.remove()?;
        (assembly.matrix, assembly.entries_published)
    } else {
        // No sequence without an encoder to consume it; only the frames the run uses.
        let matrix = matrix_only(&days, cfg.frames_per_day, cfg.rounding)?;
        for intensity in matrix.distinct_intensities() {
            cache.get(intensity)?;
        }
        (matrix, 0)
    };

    if opts.write_heatmap {
        let heat = StagedOutput::new(cfg.heatmap_out.clone());
        heatmap::save_png(&heatmap::render(&matrix)?, heat.staged())?;
        staged.push(heat);
    }

    for target in publish_all(staged)? {
        tracing::info!(path = %target.display(), "wrote output");
    }

    Ok(RunOutput {
        stats: RunStats {
            dates: cfg.dates.len(),
            entries_published,
            frames_synthesized: cache.synthesized_count(),
            distinct_intensities: cache.len(),
        },
        matrix,
    })
}

/// Per-date solar days for `cfg`, without touching the filesystem.
pub fn solar_days_with<E: SolarEventSource>(
    cfg: &TimelapseConfig,
    source: E,
) -> SunlapseResult<Vec<SolarDay>> {
    let adapter = SolarTimingAdapter::new(
        source,
        cfg.latitude,
        cfg.longitude,
        cfg.tz()?,
        cfg.frames_per_day,
        cfg.polar_policy,
    );
    adapter.compute_all(&cfg.dates)
}

pub fn solar_days(cfg: &TimelapseConfig) -> SunlapseResult<Vec<(NaiveDate, SolarDay)>> {
    cfg.validate()?;
    let days = solar_days_with(
        cfg,
        SpaEventSource {
            delta_t: cfg.delta_t,
        },
    )?;
    Ok(cfg.dates.iter().copied().zip(days).collect())
}

/// Summary image only: no frames, no sequence, no video.
pub fn write_heatmap_only(cfg: &TimelapseConfig) -> SunlapseResult<BrightnessMatrix> {
    let days: Vec<SolarDay> = solar_days(cfg)?.into_iter().map(|(_, d)| d).collect();
    let matrix = matrix_only(&days, cfg.frames_per_day, cfg.rounding)?;
    heatmap::write_png(&heatmap::render(&matrix)?, &cfg.heatmap_out)?;
    Ok(matrix)
}

/// Reset the run-owned subdirectories; anything else under `work_dir` is left alone.
fn prepare_work_dir(cfg: &TimelapseConfig, with_sequence: bool) -> SunlapseResult<()> {
    for dir in [cfg.frames_dir(), cfg.sequence_dir()] {
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| SunlapseError::io_at("clear", &dir, e))?;
        }
    }
    let mut dirs = vec![cfg.frames_dir()];
    if with_sequence {
        dirs.push(cfg.sequence_dir());
    }
    for dir in dirs {
        std::fs::create_dir_all(&dir).map_err(|e| SunlapseError::io_at("create dir", &dir, e))?;
    }
    Ok(())
}

/// A final artifact written to its partial path; deleted on drop unless published.
struct StagedOutput {
    staged: Option<PathBuf>,
    target: PathBuf,
}

impl StagedOutput {
    fn new(target: PathBuf) -> Self {
        Self {
            staged: Some(partial_path(&target)),
            target,
        }
    }

    fn staged(&self) -> &Path {
        self.staged.as_deref().unwrap_or(&self.target)
    }

    fn publish(mut self) -> SunlapseResult<PathBuf> {
        if let Some(staged) = self.staged.as_ref() {
            std::fs::rename(staged, &self.target)
                .map_err(|e| SunlapseError::io_at("publish", &self.target, e))?;
            self.staged = None;
        }
        Ok(std::mem::take(&mut self.target))
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if let Some(path) = self.staged.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Rename every staged output into place, or none of them.
fn publish_all(outputs: Vec<StagedOutput>) -> SunlapseResult<Vec<PathBuf>> {
    let mut done = Vec::with_capacity(outputs.len());
    for out in outputs {
        match out.publish() {
            Ok(target) => done.push(target),
            Err(e) => {
                for target in &done {
                    let _ = std::fs::remove_file(target);
                }
                return Err(e);
            }
        }
    }
    Ok(done)
}

/// Sibling path used while an artifact is being written: `out.mp4` -> `out.partial.mp4`.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    path.with_file_name(name)
}

/// Removes a scratch directory when dropped.
struct ScratchDirGuard(Option<PathBuf>);

impl ScratchDirGuard {
    fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    fn path(&self) -> &Path {
        self.0.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Remove now and report failures, instead of the silent removal on drop.
    fn remove(mut self) -> SunlapseResult<()> {
        if let Some(path) = self.0.take()
            && path.exists()
        {
            std::fs::remove_dir_all(&path)
                .map_err(|e| SunlapseError::io_at("remove sequence dir", &path, e))?;
        }
        Ok(())
    }
}

impl Drop for ScratchDirGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}
