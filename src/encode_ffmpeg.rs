use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    error::{SunlapseError, SunlapseResult},
    pipeline::partial_path,
    sequence::SequenceNaming,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> SunlapseResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SunlapseError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(SunlapseError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // libx264 + yuv420p rejects odd dimensions.
            return Err(SunlapseError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// Turns a directory of sorted, glob-addressable frames into one video file.
pub trait VideoEncoder {
    fn encode(&mut self, sequence_dir: &Path, cfg: &EncodeConfig) -> SunlapseResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> SunlapseResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| SunlapseError::io_at("create output directory", parent, e))?;
    }
    Ok(())
}

/// System `ffmpeg` reading the sequence directory through `-pattern_type glob`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoder;

impl VideoEncoder for FfmpegEncoder {
    fn encode(&mut self, sequence_dir: &Path, cfg: &EncodeConfig) -> SunlapseResult<()> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(SunlapseError::validation(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        // ffmpeg runs inside the sequence directory, so the output path must not be relative.
        let out_path = std::path::absolute(&cfg.out_path)
            .map_err(|e| SunlapseError::io_at("resolve output path", &cfg.out_path, e))?;
        let tmp = partial_path(&out_path);

        let mut cmd = Command::new("ffmpeg");
        cmd.current_dir(sequence_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-framerate",
                &cfg.fps.to_string(),
                "-pattern_type",
                "glob",
                "-i",
                SequenceNaming::GLOB,
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(&tmp);

        tracing::info!(
            dir = %sequence_dir.display(),
            out = %out_path.display(),
            fps = cfg.fps,
            "compiling video"
        );

        let output = cmd.output().map_err(|e| {
            SunlapseError::io("failed to run ffmpeg (is it installed and on PATH?)", e)
        })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&tmp);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SunlapseError::Encoding {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        std::fs::rename(&tmp, &out_path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            SunlapseError::io_at("publish video", &out_path, e)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, height: u32, fps: u32) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps,
            out_path: PathBuf::from("target/out.mp4"),
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(cfg(0, 10, 30).validate().is_err());
        assert!(cfg(11, 10, 30).validate().is_err());
        assert!(cfg(10, 10, 0).validate().is_err());
        assert!(cfg(1920, 1080, 100).validate().is_ok());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_file_names() {
        ensure_parent_dir(Path::new("out.mp4")).unwrap();
    }
}
