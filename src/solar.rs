use chrono::{DateTime, Datelike as _, Duration, NaiveDate, NaiveTime, TimeZone as _, Utc};
use chrono_tz::Tz;

use crate::{
    core::{FrameIndex, Intensity},
    curve::{Rounding, SolarOffsets, intensity},
    error::{SunlapseError, SunlapseResult},
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Raw answer of an astronomical lookup for one query date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolarLookup {
    Regular {
        dawn: DateTime<Utc>,
        noon: DateTime<Utc>,
        dusk: DateTime<Utc>,
    },
    /// The sun never drops below the twilight horizon.
    AllDay,
    /// The sun never climbs above the twilight horizon.
    AllNight,
}

/// Boundary to the astronomy library.
///
/// Events are reported for the *UTC* day named by `date`; mapping them onto a
/// location's local calendar day is [`SolarTimingAdapter`]'s job.
pub trait SolarEventSource {
    fn events(&self, date: NaiveDate, latitude: f64, longitude: f64)
    -> SunlapseResult<SolarLookup>;
}

/// NREL SPA via `solar-positioning`, with the civil-twilight (-6°) horizon.
#[derive(Clone, Copy, Debug)]
pub struct SpaEventSource {
    /// TT - UT in seconds.
    pub delta_t: f64,
}

impl Default for SpaEventSource {
    fn default() -> Self {
        Self { delta_t: 69.0 }
    }
}

impl SolarEventSource for SpaEventSource {
    fn events(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> SunlapseResult<SolarLookup> {
        use solar_positioning::{Horizon, SunriseResult, spa};

        let result = spa::sunrise_sunset_utc_for_horizon(
            date.year(),
            date.month(),
            date.day(),
            latitude,
            longitude,
            self.delta_t,
            Horizon::CivilTwilight,
        )
        .map_err(|e| SunlapseError::solar_unavailable(date, format!("SPA lookup failed: {e}")))?;

        // SPA reports hours wrapped into the UTC day of `date`.
        let utc_midnight = date.and_time(NaiveTime::MIN).and_utc();
        let at = |hours: f64| {
            utc_midnight + Duration::milliseconds((hours * 3_600_000.0).round() as i64)
        };

        Ok(match result {
            SunriseResult::RegularDay {
                sunrise,
                transit,
                sunset,
            } => {
                let (dawn, noon, dusk) =
                    around_transit(at(sunrise.hours()), at(transit.hours()), at(sunset.hours()));
                SolarLookup::Regular { dawn, noon, dusk }
            }
            SunriseResult::AllDay { .. } => SolarLookup::AllDay,
            SunriseResult::AllNight { .. } => SolarLookup::AllNight,
        })
    }
}

/// Undo the day wrap: dawn precedes the transit and dusk follows it.
fn around_transit(
    dawn: DateTime<Utc>,
    noon: DateTime<Utc>,
    dusk: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let dawn = if dawn > noon {
        dawn - Duration::days(1)
    } else {
        dawn
    };
    let dusk = if dusk < noon {
        dusk + Duration::days(1)
    } else {
        dusk
    };
    (dawn, noon, dusk)
}

/// What to do with dates that have no dawn or dusk at the configured location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarPolicy {
    /// Surface `SolarDataUnavailable`.
    #[default]
    Fail,
    /// Midnight sun is white all day, polar night is black all day.
    Constant,
}

/// One date's light curve input, in frame-domain units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolarDay {
    Cycle(SolarOffsets),
    MidnightSun,
    PolarNight,
}

impl SolarDay {
    pub fn intensity(&self, frame: FrameIndex, rounding: Rounding) -> Intensity {
        match self {
            Self::Cycle(offsets) => intensity(frame, offsets, rounding),
            Self::MidnightSun => Intensity::WHITE,
            Self::PolarNight => Intensity::BLACK,
        }
    }
}

/// Turns absolute solar events into frame-domain offsets for one location.
#[derive(Clone, Debug)]
pub struct SolarTimingAdapter<S> {
    source: S,
    latitude: f64,
    longitude: f64,
    tz: Tz,
    frames_per_day: u64,
    polar: PolarPolicy,
}

impl<S: SolarEventSource> SolarTimingAdapter<S> {
    pub fn new(
        source: S,
        latitude: f64,
        longitude: f64,
        tz: Tz,
        frames_per_day: u64,
        polar: PolarPolicy,
    ) -> Self {
        Self {
            source,
            latitude,
            longitude,
            tz,
            frames_per_day,
            polar,
        }
    }

    /// Dawn/noon/dusk of local calendar day `date`, scaled into `[0, frames_per_day)`.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn compute(&self, date: NaiveDate) -> SunlapseResult<SolarDay> {
        let start = local_midnight(self.tz, date)?;
        let next = date
            .succ_opt()
            .ok_or_else(|| SunlapseError::validation(format!("date {date} has no successor")))?;
        let end = local_midnight(self.tz, next)?;

        // The lookup's day is a UTC day; the local day may straddle two of them.
        let mut polar = None;
        for query in [date.pred_opt(), Some(date), date.succ_opt()]
            .into_iter()
            .flatten()
        {
            match self.source.events(query, self.latitude, self.longitude)? {
                SolarLookup::Regular { dawn, noon, dusk } => {
                    if noon >= start && noon < end {
                        let offsets = SolarOffsets::new(
                            self.scale(dawn - start),
                            self.scale(noon - start),
                            self.scale(dusk - start),
                        )?;
                        tracing::debug!(
                            dawn = offsets.dawn,
                            noon = offsets.noon,
                            dusk = offsets.dusk,
                            "solar offsets"
                        );
                        return Ok(SolarDay::Cycle(offsets));
                    }
                }
                SolarLookup::AllDay if query == date || polar.is_none() => {
                    polar = Some(SolarDay::MidnightSun);
                }
                SolarLookup::AllNight if query == date || polar.is_none() => {
                    polar = Some(SolarDay::PolarNight);
                }
                SolarLookup::AllDay | SolarLookup::AllNight => {}
            }
        }

        match (polar, self.polar) {
            (Some(day), PolarPolicy::Constant) => {
                tracing::warn!(%date, ?day, "no dawn/dusk, using constant brightness");
                Ok(day)
            }
            (Some(SolarDay::MidnightSun), PolarPolicy::Fail) => Err(
                SunlapseError::solar_unavailable(date, "sun stays above the twilight horizon"),
            ),
            (Some(_), PolarPolicy::Fail) => Err(SunlapseError::solar_unavailable(
                date,
                "sun stays below the twilight horizon",
            )),
            (None, _) => Err(SunlapseError::solar_unavailable(
                date,
                format!("no solar noon falls inside the local day in {}", self.tz.name()),
            )),
        }
    }

    /// [`Self::compute`] for every date, failing on the first unavailable one.
    pub fn compute_all(&self, dates: &[NaiveDate]) -> SunlapseResult<Vec<SolarDay>> {
        dates.iter().map(|&date| self.compute(date)).collect()
    }

    fn scale(&self, since_midnight: Duration) -> f64 {
        let secs = since_midnight.num_milliseconds() as f64 / 1000.0;
        secs * self.frames_per_day as f64 / SECONDS_PER_DAY
    }
}

/// First valid local instant of `date` in `tz`, skipping a DST gap at midnight.
fn local_midnight(tz: Tz, date: NaiveDate) -> SunlapseResult<DateTime<Utc>> {
    for hour in 0..4 {
        let naive = date.and_time(NaiveTime::MIN) + Duration::hours(hour);
        if let Some(t) = tz.from_local_datetime(&naive).earliest() {
            return Ok(t.with_timezone(&Utc));
        }
    }
    Err(SunlapseError::validation(format!(
        "could not resolve local midnight of {date} in {}",
        tz.name()
    )))
}
