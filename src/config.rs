use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use chrono::{Datelike as _, NaiveDate};
use chrono_tz::Tz;

use crate::{
    core::Canvas,
    curve::Rounding,
    encode_ffmpeg::EncodeConfig,
    error::{SunlapseError, SunlapseResult},
    frame_cache::CachePopulation,
    sequence::{PublishMode, ensure_strictly_increasing},
    solar::PolarPolicy,
};

/// Everything a run needs, resolved once up front and passed down explicitly.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelapseConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_frames_per_day")]
    pub frames_per_day: u64,

    pub dates: Vec<NaiveDate>,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name, e.g. `Pacific/Auckland`.
    pub timezone: String,
    /// TT - UT in seconds, for the SPA lookup.
    #[serde(default = "default_delta_t")]
    pub delta_t: f64,

    #[serde(default)]
    pub rounding: Rounding,
    #[serde(default)]
    pub polar_policy: PolarPolicy,
    #[serde(default)]
    pub cache_population: CachePopulation,
    #[serde(default)]
    pub publish_mode: PublishMode,

    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_video_out")]
    pub video_out: PathBuf,
    #[serde(default = "default_heatmap_out")]
    pub heatmap_out: PathBuf,
}

fn default_fps() -> u32 {
    100
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_frames_per_day() -> u64 {
    1440
}

fn default_delta_t() -> f64 {
    69.0
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".data")
}

fn default_video_out() -> PathBuf {
    PathBuf::from("out.mp4")
}

fn default_heatmap_out() -> PathBuf {
    PathBuf::from("timeline.png")
}

impl TimelapseConfig {
    /// Defaults for everything except the date list and location.
    pub fn new(dates: Vec<NaiveDate>, latitude: f64, longitude: f64, timezone: &str) -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            frames_per_day: default_frames_per_day(),
            dates,
            latitude,
            longitude,
            timezone: timezone.to_string(),
            delta_t: default_delta_t(),
            rounding: Rounding::default(),
            polar_policy: PolarPolicy::default(),
            cache_population: CachePopulation::default(),
            publish_mode: PublishMode::default(),
            work_dir: default_work_dir(),
            video_out: default_video_out(),
            heatmap_out: default_heatmap_out(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> SunlapseResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| SunlapseError::io_at("open config", path, e))?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_reader(r: impl Read) -> SunlapseResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| SunlapseError::validation(format!("parse config JSON: {e}")))
    }

    pub fn validate(&self) -> SunlapseResult<()> {
        if self.frames_per_day == 0 {
            return Err(SunlapseError::validation("frames_per_day must be > 0"));
        }
        if u32::try_from(self.frames_per_day).is_err() {
            return Err(SunlapseError::validation(
                "frames_per_day must fit the heatmap height (u32)",
            ));
        }
        self.encode_config().validate()?;
        if self.dates.is_empty() {
            return Err(SunlapseError::validation("at least one date is required"));
        }
        if let Some(bad) = self.dates.iter().find(|d| !(0..=9999).contains(&d.year())) {
            return Err(SunlapseError::validation(format!(
                "date {bad} is outside years 0000..=9999"
            )));
        }
        ensure_strictly_increasing(&self.dates)?;
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(SunlapseError::validation(format!(
                "latitude {} must be within [-90, 90]",
                self.latitude
            )));
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(SunlapseError::validation(format!(
                "longitude {} must be within [-180, 180]",
                self.longitude
            )));
        }
        if !self.delta_t.is_finite() {
            return Err(SunlapseError::validation("delta_t must be finite"));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> SunlapseResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            SunlapseError::validation(format!("unknown time zone '{}': {e}", self.timezone))
        })
    }

    pub fn canvas(&self) -> SunlapseResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            out_path: self.video_out.clone(),
        }
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.work_dir.join("frames")
    }

    pub fn sequence_dir(&self) -> PathBuf {
        self.work_dir.join("sequence")
    }
}
