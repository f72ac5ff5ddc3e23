//! # Prayer Companion Core Library
//!
//! This library holds everything the prayer companion device computes and decides. It has
//! no hardware in it: touch panels, joysticks, buzzers and displays are reached through
//! the collaborator traits in [`device`] and [`input`], and are chosen at startup.
//!
//! ## Design Philosophy
//!
//! ### Offline First
//! Every value on screen is derived locally from the configured location and the system
//! clock. Nothing is fetched; the only inputs are the [`config::Settings`] and the time.
//!
//! ### Degrade, Never Fail
//! Polar geometry, dates far from the Hijri reference table, malformed input and broken
//! storage all have a local fallback. Affected values carry an "approximate" flag for the
//! renderer instead of aborting the run loop.
//!
//! ### Data Flow
//! 1. **Prayer times**: location + date → [`solar`] → [`prayer_times`] → cached [`PrayerTimeSet`]
//! 2. **Calendar**: date → [`hijri`] → [`HijriDate`] → [`events`] → countdowns
//! 3. **Interaction**: normalized [`input::InputEvent`]s → [`navigation`] → effects
//! 4. **Orchestration**: [`app::App::tick`] runs one cooperative loop iteration
//!
//! ## Core Types
//!
//! - [`Prayer`]: the six daily instants shown on the prayer tab
//! - [`PrayerTimeSet`]: one day of prayer instants with approximation flags
//! - [`HijriDate`]: a validated date in the tabular Hijri calendar

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod app;
pub mod config;
pub mod device;
pub mod display;
pub mod events;
pub mod hijri;
pub mod input;
pub mod locations;
pub mod navigation;
pub mod prayer_times;
pub mod renderer;
pub mod solar;

/// The daily instants computed by the prayer-time engine, in chronological order.
///
/// Sunrise is not a prayer but marks the end of the Fajr window, so it is displayed
/// alongside the five prayers and never triggers an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All entries in display (and chronological) order.
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Whether reaching this instant should sound the buzzer.
    pub fn is_alertable(self) -> bool {
        self != Prayer::Sunrise
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One calendar day of prayer instants for a fixed location and configuration.
///
/// Instants carry the location's effective UTC offset for that date, so comparisons
/// against "now" are absolute and unaffected by how the clock is displayed.
///
/// # Degraded Results
/// At high latitudes the sun may never reach the altitude that defines an entry
/// (midnight sun, polar night, or twilight that never ends). Those entries are filled
/// from the last solvable day and listed in `approximated`; the renderer marks them
/// with an "approximate" badge.
///
/// # Example
/// ```
/// use chrono::{FixedOffset, NaiveDate, TimeZone};
/// use prayer_clock_lib::{Prayer, PrayerTimeSet};
///
/// let tz = FixedOffset::west_opt(5 * 3600).unwrap();
/// let at = |h, m| tz.with_ymd_and_hms(2025, 6, 21, h, m, 0).unwrap();
/// let set = PrayerTimeSet {
///     date: NaiveDate::from_ymd_opt(2025, 6, 21).unwrap(),
///     times: [at(4, 10), at(5, 35), at(12, 34), at(16, 10), at(19, 28), at(20, 54)],
///     approximated: vec![],
/// };
///
/// assert!(set.is_strictly_ordered());
/// assert_eq!(set.next_after(at(13, 0)).map(|(p, _)| p), Some(Prayer::Asr));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrayerTimeSet {
    /// Local calendar date these instants belong to
    pub date: NaiveDate,
    /// Instants indexed by [`Prayer::index`]
    pub times: [DateTime<FixedOffset>; 6],
    /// Entries filled in by the polar fallback
    pub approximated: Vec<Prayer>,
}

impl PrayerTimeSet {
    pub fn time(&self, prayer: Prayer) -> DateTime<FixedOffset> {
        self.times[prayer.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prayer, DateTime<FixedOffset>)> + '_ {
        Prayer::ALL.iter().map(move |&p| (p, self.time(p)))
    }

    pub fn is_degraded(&self) -> bool {
        !self.approximated.is_empty()
    }

    pub fn is_approximate(&self, prayer: Prayer) -> bool {
        self.approximated.contains(&prayer)
    }

    /// Fajr < Sunrise < Dhuhr < Asr < Maghrib < Isha.
    pub fn is_strictly_ordered(&self) -> bool {
        self.times.windows(2).all(|w| w[0] < w[1])
    }

    /// The first alertable prayer strictly after `instant`.
    ///
    /// Returns `None` once Isha has passed; the next prayer is then tomorrow's Fajr,
    /// which belongs to a different set.
    pub fn next_after(
        &self,
        instant: DateTime<FixedOffset>,
    ) -> Option<(Prayer, DateTime<FixedOffset>)> {
        self.iter()
            .filter(|(p, _)| p.is_alertable())
            .find(|(_, at)| *at > instant)
    }
}

/// A date in the tabular Hijri calendar.
///
/// Fields are ordered so the derived `Ord` compares chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HijriDate {
    pub year: i32,
    /// 1 = Muharram … 12 = Dhu al-Hijjah
    pub month: u8,
    /// 1 – 29 or 30 depending on the month
    pub day: u8,
}

const HIJRI_MONTH_NAMES: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi' al-awwal",
    "Rabi' al-thani",
    "Jumada al-awwal",
    "Jumada al-thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

impl HijriDate {
    /// Build a date, rejecting months outside 1–12 and days past the month's length.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, hijri::HijriError> {
        if !(1..=12).contains(&month) || day == 0 || day > hijri::month_length(year, month) {
            return Err(hijri::HijriError::InvalidDate { year, month, day });
        }
        Ok(Self { year, month, day })
    }

    pub fn month_name(&self) -> &'static str {
        HIJRI_MONTH_NAMES
            .get(usize::from(self.month).wrapping_sub(1))
            .copied()
            .unwrap_or("")
    }

    pub fn is_ramadan(&self) -> bool {
        self.month == 9
    }

    /// Day of Ramadan, if the date falls in it.
    pub fn ramadan_day(&self) -> Option<u8> {
        self.is_ramadan().then_some(self.day)
    }
}

impl fmt::Display for HijriDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.day, self.month_name(), self.year)
    }
}
