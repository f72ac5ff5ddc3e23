//! # Prayer Time Engine
//!
//! Turns a date, a location and the user's calculation choices into a [`PrayerTimeSet`].
//!
//! ## Definitions
//!
//! | Entry   | Sun position                                                |
//! |---------|-------------------------------------------------------------|
//! | Fajr    | `fajr_angle` below the horizon, before noon                 |
//! | Sunrise | −0.833° (upper limb on the refracted horizon), before noon  |
//! | Dhuhr   | solar noon + 2 minutes                                      |
//! | Asr     | shadow = factor × object + noon shadow (1 Standard, 2 Hanafi)|
//! | Maghrib | sunset + 3 minutes                                          |
//! | Isha    | `isha_angle` below the horizon, or Maghrib + 90 min (Mecca) |
//!
//! ## High Latitudes
//!
//! When the sun never reaches an entry's altitude on the requested day, the engine walks
//! back day by day (up to a year) to the most recent day on which it did, and applies
//! that day's hour angle to today's solar noon. Successive days therefore stay continuous
//! through the polar season. If no such day exists the hour angle is clamped. Either way
//! the entry is listed in [`PrayerTimeSet::approximated`].
//!
//! ## Caching
//!
//! [`PrayerTimeCache`] holds the set for one (date, settings fingerprint) key. The run
//! loop asks it every tick; it recomputes only after midnight or a committed settings
//! change.

use crate::config::{CalculationMethod, IshaRule, Location, Madhab, Settings};
use crate::solar::{self, SolarPosition, UnsolvableGeometry, MAX_LATITUDE};
use crate::{Prayer, PrayerTimeSet};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use log::{debug, info, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Sunrise and sunset altitude: solar radius plus standard refraction
pub const HORIZON_ALTITUDE: f64 = -0.833;
pub const DHUHR_DELAY_MINUTES: f64 = 2.0;
pub const MAGHRIB_DELAY_MINUTES: f64 = 3.0;

/// How far back the polar fallback looks for a solvable day
const FALLBACK_SEARCH_DAYS: i64 = 366;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrayerError {
    #[error("invalid location: {0}")]
    InvalidLocation(String),
    #[error("solar geometry failed: {0}")]
    Geometry(#[from] UnsolvableGeometry),
}

/// Compute one day of prayer times.
///
/// Never fails for a valid location: polar geometry degrades to approximated entries
/// instead of an error.
///
/// # Errors
/// - [`PrayerError::InvalidLocation`] for non-finite or out-of-range coordinates or offsets
pub fn compute(
    date: NaiveDate,
    location: &Location,
    method: CalculationMethod,
    madhab: Madhab,
) -> Result<PrayerTimeSet, PrayerError> {
    location.validate().map_err(PrayerError::InvalidLocation)?;
    let midnight = location
        .offset_on(date)
        .and_then(|offset| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|naive| offset.from_local_datetime(&naive).single())
        })
        .ok_or_else(|| {
            PrayerError::InvalidLocation(format!("no local midnight for {date} at {}", location.name))
        })?;

    let polar = location.latitude.abs() > MAX_LATITUDE;
    let effective = if polar {
        warn!(
            "Latitude {:.3} is polar; clamping to ±{} and approximating all times",
            location.latitude, MAX_LATITUDE
        );
        Location {
            latitude: location.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            ..location.clone()
        }
    } else {
        location.clone()
    };

    let position = solar::solar_position(date, &effective)?;
    let solver = HourAngleSolver {
        date,
        location: &effective,
    };
    let latitude = effective.latitude;
    let factor = madhab.shadow_factor();
    let noon = position.solar_noon;

    let (horizon, horizon_approx) = solver.solve(&position, |_| Some(HORIZON_ALTITUDE));
    let (fajr, fajr_approx) = solver.solve(&position, |_| Some(-method.fajr_angle()));
    let (asr, asr_approx) =
        solver.solve(&position, |dec| solar::asr_altitude(latitude, dec, factor));

    let maghrib = noon + horizon + MAGHRIB_DELAY_MINUTES / 60.0;
    let (isha, isha_approx) = match method.isha_rule() {
        IshaRule::Angle(angle) => {
            let (h, approx) = solver.solve(&position, |_| Some(-angle));
            (noon + h, approx)
        }
        IshaRule::MinutesAfterMaghrib(minutes) => (maghrib + minutes as f64 / 60.0, horizon_approx),
    };

    let hours = [
        noon - fajr,
        noon - horizon,
        noon + DHUHR_DELAY_MINUTES / 60.0,
        noon + asr,
        maghrib,
        isha,
    ];
    let flags = [
        fajr_approx,
        horizon_approx,
        false,
        asr_approx,
        horizon_approx,
        isha_approx,
    ];

    let approximated: Vec<Prayer> = Prayer::ALL
        .iter()
        .zip(flags)
        .filter(|(_, approx)| polar || *approx)
        .map(|(prayer, _)| *prayer)
        .collect();
    if !approximated.is_empty() {
        debug!("{date}: approximated {approximated:?} at latitude {latitude:.3}");
    }

    Ok(PrayerTimeSet {
        date,
        times: hours.map(|h| at_local_hours(midnight, h)),
        approximated,
    })
}

fn at_local_hours(midnight: DateTime<FixedOffset>, hours: f64) -> DateTime<FixedOffset> {
    midnight + Duration::seconds((hours * 3600.0).round() as i64)
}

struct HourAngleSolver<'a> {
    date: NaiveDate,
    location: &'a Location,
}

impl HourAngleSolver<'_> {
    /// Hour angle for the altitude produced by `altitude(declination)`, and whether it
    /// had to come from the polar fallback. An altitude of `None` is never reached.
    fn solve(
        &self,
        position: &SolarPosition,
        altitude: impl Fn(f64) -> Option<f64>,
    ) -> (f64, bool) {
        let latitude = self.location.latitude;
        let reached = |dec: f64| {
            altitude(dec).and_then(|alt| solar::hour_angle(latitude, dec, alt).ok())
        };
        let dec = position.declination;
        if let Some(h) = reached(dec) {
            return (h, false);
        }

        for back in 1..=FALLBACK_SEARCH_DAYS {
            let day = self.date - Duration::days(back);
            let Ok(earlier) = solar::solar_position(day, self.location) else {
                continue;
            };
            if let Some(h) = reached(earlier.declination) {
                debug!("{}: using hour angle from {day} ({back} days back)", self.date);
                return (h, true);
            }
        }

        // Sun below the horizon all day clamps toward noon
        let target = altitude(dec).unwrap_or(0.0);
        (solar::clamped_hour_angle(latitude, dec, target), true)
    }
}

/// Hash of every setting that affects prayer times. The location name and display
/// preferences are left out.
pub fn fingerprint(settings: &Settings) -> u64 {
    let mut hasher = DefaultHasher::new();
    let location = &settings.location;
    location.latitude.to_bits().hash(&mut hasher);
    location.longitude.to_bits().hash(&mut hasher);
    location.utc_offset_hours.to_bits().hash(&mut hasher);
    location.dst.hash(&mut hasher);
    settings.method.hash(&mut hasher);
    settings.madhab.hash(&mut hasher);
    hasher.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheKey {
    pub date: NaiveDate,
    pub fingerprint: u64,
}

/// Single-entry memo of the current day's prayer times.
#[derive(Debug, Default)]
pub struct PrayerTimeCache {
    entry: Option<(CacheKey, PrayerTimeSet)>,
    computations: u64,
}

impl PrayerTimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached set for `date` under `settings`, computing it on a miss.
    pub fn get_or_compute(
        &mut self,
        date: NaiveDate,
        settings: &Settings,
    ) -> Result<&PrayerTimeSet, PrayerError> {
        let key = CacheKey {
            date,
            fingerprint: fingerprint(settings),
        };
        let entry = match self.entry.take() {
            Some((cached, set)) if cached == key => (cached, set),
            _ => {
                let set = compute(date, &settings.location, settings.method, settings.madhab)?;
                self.computations += 1;
                info!(
                    "Computed prayer times for {} on {}{}",
                    settings.location.name,
                    date,
                    if set.is_degraded() { " (approximated)" } else { "" }
                );
                (key, set)
            }
        };
        Ok(&self.entry.insert(entry).1)
    }

    /// The most recently computed set, if any.
    pub fn current(&self) -> Option<&PrayerTimeSet> {
        self.entry.as_ref().map(|(_, set)| set)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of times the engine actually ran.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}
