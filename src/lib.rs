#![forbid(unsafe_code)]

//! Daylight timelapses: per-date dawn/noon/dusk become a grayscale light curve,
//! rendered as a deduplicated frame sequence for `ffmpeg` plus a one-image
//! (date × frame-of-day) summary.

pub mod config;
pub mod core;
pub mod curve;
pub mod encode_ffmpeg;
pub mod error;
pub mod frame_cache;
pub mod heatmap;
pub mod pipeline;
pub mod sequence;
pub mod solar;

pub use crate::config::TimelapseConfig;
pub use crate::core::{Canvas, FrameIndex, Intensity};
pub use curve::{Rounding, SolarOffsets, intensity};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, VideoEncoder, is_ffmpeg_on_path};
pub use error::{SunlapseError, SunlapseResult};
pub use frame_cache::{CachePopulation, CachedFrame, FrameCache, FrameSynthesizer, PngSynthesizer};
pub use heatmap::BrightnessMatrix;
pub use pipeline::{
    RunOptions, RunOutput, RunStats, run_timelapse, run_timelapse_with, solar_days,
    solar_days_with, write_heatmap_only,
};
pub use sequence::{Assembly, PublishMode, SequenceAssembler, SequenceEntry, SequenceNaming};
pub use solar::{
    PolarPolicy, SolarDay, SolarEventSource, SolarLookup, SolarTimingAdapter, SpaEventSource,
};
