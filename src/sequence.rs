use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::{
    core::FrameIndex,
    curve::Rounding,
    error::{SunlapseError, SunlapseResult},
    frame_cache::{FrameCache, FrameSynthesizer},
    heatmap::BrightnessMatrix,
    solar::SolarDay,
};

const MIN_FRAME_DIGITS: usize = 6;

/// `(date, frame) -> file name`, where name order equals presentation order.
///
/// Names are `YYYY-MM-DD-FFFFFF.png`: a fixed-width ISO date followed by a
/// frame number zero-padded to a width that fits the whole frame domain. The
/// encoder consumes the directory through a sorted glob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceNaming {
    frame_digits: usize,
}

impl SequenceNaming {
    pub const GLOB: &'static str = "*.png";

    pub fn new(frames_per_day: u64) -> Self {
        let widest = frames_per_day.saturating_sub(1).to_string().len();
        Self {
            frame_digits: widest.max(MIN_FRAME_DIGITS),
        }
    }

    pub fn frame_digits(&self) -> usize {
        self.frame_digits
    }

    pub fn entry_name(&self, date: NaiveDate, frame: FrameIndex) -> String {
        format!(
            "{}-{:0width$}.png",
            date.format("%Y-%m-%d"),
            frame.0,
            width = self.frame_digits
        )
    }
}

/// How a sequence entry refers to its cached frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Hard link, falling back to a copy where links are not possible.
    #[default]
    HardLink,
    Copy,
}

/// One published `(date, frame)` slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceEntry {
    pub date: NaiveDate,
    pub frame: FrameIndex,
    pub name: String,
    pub target: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembly {
    pub matrix: BrightnessMatrix,
    pub entries_published: u64,
    pub distinct_intensities: usize,
}

/// Publishes every `(date, frame)` of a run into one flat directory.
#[derive(Clone, Debug)]
pub struct SequenceAssembler {
    dir: PathBuf,
    naming: SequenceNaming,
    frames_per_day: u64,
    rounding: Rounding,
    publish: PublishMode,
}

impl SequenceAssembler {
    /// `dir` must exist and be empty.
    pub fn new(
        dir: impl Into<PathBuf>,
        frames_per_day: u64,
        rounding: Rounding,
        publish: PublishMode,
    ) -> Self {
        Self {
            dir: dir.into(),
            naming: SequenceNaming::new(frames_per_day),
            frames_per_day,
            rounding,
            publish,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> SequenceNaming {
        self.naming
    }

    /// Dates in input order, frames in increasing order: evaluate, resolve, publish, record.
    pub fn assemble<S: FrameSynthesizer>(
        &self,
        dates: &[NaiveDate],
        days: &[SolarDay],
        cache: &mut FrameCache<S>,
    ) -> SunlapseResult<Assembly> {
        if dates.len() != days.len() {
            return Err(SunlapseError::validation(format!(
                "got {} dates but {} solar days",
                dates.len(),
                days.len()
            )));
        }
        ensure_strictly_increasing(dates)?;

        let mut matrix = BrightnessMatrix::new(dates.len(), self.frames_per_day);
        let mut published = 0u64;

        for (pos, (&date, day)) in dates.iter().zip(days).enumerate() {
            tracing::info!(%date, "assembling date {}/{}", pos + 1, dates.len());
            for f in 0..self.frames_per_day {
                let frame = FrameIndex(f);
                let intensity = day.intensity(frame, self.rounding);
                let cached = cache.get(intensity)?;
                let entry = SequenceEntry {
                    date,
                    frame,
                    name: self.naming.entry_name(date, frame),
                    target: cached.path.clone(),
                };
                self.publish_entry(&entry)?;
                matrix.set(pos, frame, intensity)?;
                published += 1;
                tracing::debug!(
                    intensity = intensity.0,
                    "frame {}/{}",
                    f + 1,
                    self.frames_per_day
                );
            }
        }

        Ok(Assembly {
            matrix,
            entries_published: published,
            distinct_intensities: cache.len(),
        })
    }

    fn publish_entry(&self, entry: &SequenceEntry) -> SunlapseResult<()> {
        let link = self.dir.join(&entry.name);
        if link.exists() {
            return Err(SunlapseError::validation(format!(
                "sequence entry '{}' already exists; the sequence directory must start empty",
                link.display()
            )));
        }

        match self.publish {
            PublishMode::HardLink => {
                if let Err(e) = std::fs::hard_link(&entry.target, &link) {
                    // Only "links are impossible here" falls back; anything else is a real failure.
                    match e.kind() {
                        std::io::ErrorKind::CrossesDevices | std::io::ErrorKind::Unsupported => {
                            tracing::debug!(error = %e, "hard link unavailable, copying instead");
                            copy_frame(&entry.target, &link)?;
                        }
                        _ => return Err(SunlapseError::io_at("link frame into", &link, e)),
                    }
                }
            }
            PublishMode::Copy => copy_frame(&entry.target, &link)?,
        }
        Ok(())
    }
}

fn copy_frame(target: &Path, link: &Path) -> SunlapseResult<()> {
    std::fs::copy(target, link)
        .map(|_| ())
        .map_err(|e| SunlapseError::io_at("copy frame into", link, e))
}

/// Names sort by date first, so dates have to arrive already sorted and unique.
pub fn ensure_strictly_increasing(dates: &[NaiveDate]) -> SunlapseResult<()> {
    for pair in dates.windows(2) {
        if pair[0] >= pair[1] {
            return Err(SunlapseError::validation(format!(
                "dates must be strictly increasing, got {} then {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

/// Fill a matrix without touching the filesystem.
pub fn matrix_only(
    days: &[SolarDay],
    frames_per_day: u64,
    rounding: Rounding,
) -> SunlapseResult<BrightnessMatrix> {
    let mut matrix = BrightnessMatrix::new(days.len(), frames_per_day);
    for (pos, day) in days.iter().enumerate() {
        for f in 0..frames_per_day {
            let frame = FrameIndex(f);
            matrix.set(pos, frame, day.intensity(frame, rounding))?;
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::Intensity, curve::SolarOffsets};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn names_pad_to_at_least_six_digits() {
        let n = SequenceNaming::new(1440);
        assert_eq!(n.frame_digits(), 6);
        assert_eq!(
            n.entry_name(d(2018, 1, 1), FrameIndex(7)),
            "2018-01-01-000007.png"
        );
    }

    #[test]
    fn names_widen_for_large_frame_domains() {
        let n = SequenceNaming::new(10_000_001);
        assert_eq!(n.frame_digits(), 8);
        assert_eq!(
            n.entry_name(d(2018, 12, 31), FrameIndex(10_000_000)),
            "2018-12-31-10000000.png"
        );
    }

    #[test]
    fn early_years_keep_fixed_width() {
        let n = SequenceNaming::new(10);
        assert!(n.entry_name(d(999, 1, 1), FrameIndex(0)).starts_with("0999-01-01-"));
    }

    #[test]
    fn unsorted_dates_are_rejected() {
        assert!(ensure_strictly_increasing(&[d(2018, 1, 2), d(2018, 1, 1)]).is_err());
        assert!(ensure_strictly_increasing(&[d(2018, 1, 1), d(2018, 1, 1)]).is_err());
        assert!(ensure_strictly_increasing(&[d(2018, 1, 1), d(2018, 1, 3)]).is_ok());
        assert!(ensure_strictly_increasing(&[]).is_ok());
    }

    #[test]
    fn matrix_only_follows_each_day_curve() {
        let days = [
            SolarDay::Cycle(SolarOffsets::new(2.0, 5.0, 8.0).unwrap()),
            SolarDay::MidnightSun,
        ];
        let m = matrix_only(&days, 10, Rounding::Truncate).unwrap();
        assert_eq!(m.get(0, FrameIndex(1)).unwrap(), Intensity(0));
        assert_eq!(m.get(0, FrameIndex(5)).unwrap(), Intensity(255));
        assert_eq!(m.get(0, FrameIndex(8)).unwrap(), Intensity(0));
        assert!(m.column(1).unwrap().iter().all(|&v| v == 255));
    }

    #[test]
    fn hard_link_errors_other_than_unsupported_are_not_papered_over_with_a_copy() {
        let dir = std::env::temp_dir().join(format!("sunlapse_link_err_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let entry = SequenceEntry {
            date: d(2018, 1, 1),
            frame: FrameIndex(0),
            name: "2018-01-01-000000.png".to_string(),
            target: dir.join("missing-frame.png"),
        };
        let assembler = SequenceAssembler::new(&dir, 10, Rounding::Truncate, PublishMode::HardLink);
        let err = assembler.publish_entry(&entry).unwrap_err();
        assert!(err.to_string().contains("link frame into"), "{err}");
        assert!(!dir.join(&entry.name).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
