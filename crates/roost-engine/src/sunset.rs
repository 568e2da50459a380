//! Sunset times for "sunset" tasks
//!
//! Uses the sunrise equation (NOAA low-precision solar position), good to a
//! couple of minutes at household latitudes.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use roost_core::{config::CalendarConfig, TaskTime};

/// Julian date of the J2000 epoch (2000-01-01 12:00 UTC)
const J2000: f64 = 2_451_545.0;

/// Julian date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Solar altitude at apparent sunset (refraction plus solar radius)
const SUNSET_ALTITUDE_DEG: f64 = -0.833;

const OBLIQUITY_DEG: f64 = 23.4397;

/// Used when the sun does not set (or rise) at the configured latitude
const FALLBACK_TIME: (u32, u32) = (18, 0);

/// Sunset in UTC for `date` at latitude/longitude (degrees, east positive)
///
/// Returns `None` during polar day or night.
pub fn sunset_utc(date: NaiveDate, latitude: f64, longitude: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1)?;
    let days = (date - epoch).num_days() as f64;
    let mean_solar_noon = days + 0.0008 - longitude / 360.0;

    let anomaly = (357.5291 + 0.985_600_28 * mean_solar_noon).rem_euclid(360.0);
    let m = anomaly.to_radians();
    let center = 1.9148 * m.sin() + 0.0200 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
    let ecliptic = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0).to_radians();
    let transit = J2000 + mean_solar_noon + 0.0053 * m.sin() - 0.0069 * (2.0 * ecliptic).sin();

    let sin_decl = ecliptic.sin() * OBLIQUITY_DEG.to_radians().sin();
    let cos_decl = sin_decl.asin().cos();
    let lat = latitude.to_radians();
    let cos_hour_angle =
        (SUNSET_ALTITUDE_DEG.to_radians().sin() - lat.sin() * sin_decl) / (lat.cos() * cos_decl);
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let set_jd = transit + cos_hour_angle.acos().to_degrees() / 360.0;
    let unix_secs = ((set_jd - UNIX_EPOCH_JD) * 86_400.0).round() as i64;
    DateTime::from_timestamp(unix_secs, 0).map(|dt| dt.naive_utc())
}

/// Resolves a task's preferred time to a clock time on a given date
#[derive(Debug, Clone)]
pub struct TaskClock {
    latitude: f64,
    longitude: f64,
    sunset_offset: Duration,
    utc_offset: Option<FixedOffset>,
}

impl TaskClock {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            sunset_offset: Duration::zero(),
            utc_offset: None,
        }
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.latitude, config.longitude)
            .with_sunset_offset(Duration::minutes(config.sunset_offset_minutes))
            .with_utc_offset(
                config
                    .utc_offset_minutes
                    .and_then(|m| FixedOffset::east_opt(m * 60)),
            )
    }

    pub fn with_sunset_offset(mut self, offset: Duration) -> Self {
        self.sunset_offset = offset;
        self
    }

    /// Household offset from UTC; `None` uses the process local zone
    pub fn with_utc_offset(mut self, offset: Option<FixedOffset>) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn time_for(&self, time: TaskTime, date: NaiveDate) -> NaiveTime {
        match time {
            TaskTime::At(at) => at,
            TaskTime::Sunset => self.sunset_local(date),
        }
    }

    fn sunset_local(&self, date: NaiveDate) -> NaiveTime {
        let fallback = NaiveTime::from_hms_opt(FALLBACK_TIME.0, FALLBACK_TIME.1, 0)
            .unwrap_or(NaiveTime::MIN);
        let Some(utc) = sunset_utc(date, self.latitude, self.longitude) else {
            return fallback;
        };
        let local = match self.utc_offset {
            Some(offset) => offset.from_utc_datetime(&utc).naive_local(),
            None => Local.from_utc_datetime(&utc).naive_local(),
        };
        let adjusted = local + self.sunset_offset;
        // Whole minutes read better in prompts
        adjusted.time().with_second(0).unwrap_or(fallback)
    }
}
