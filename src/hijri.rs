//! # Hijri Calendar Conversion
//!
//! Converts between Gregorian and Hijri dates using a small table of reference anchors
//! (known Gregorian ↔ Hijri correspondences) and the 30-year tabular month lengths.
//!
//! ## Why Anchors
//!
//! The civil Hijri calendar starts months on sighting or on the Umm al-Qura table, which
//! drifts a day or so from any arithmetic rule. Walking month lengths from a nearby
//! known date keeps the result exact at the anchors and accurate to about a day within
//! a few years of them.
//!
//! ## Month Lengths
//!
//! Odd months have 30 days and even months 29. Dhu al-Hijjah gains a 30th day in the
//! 11 leap years of each 30-year cycle: years where `(14 + 11·y) mod 30 < 11`.
//!
//! ## Range
//!
//! Conversions farther than `max_anchor_distance_years` from every anchor return
//! [`HijriError::OutOfAnchorRange`]. Callers pick a policy: show the unchecked walk with
//! an approximate marker, or hide the date.

use crate::HijriDate;
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HijriError {
    #[error("date is {distance_days} days from the nearest reference anchor (limit {max_days})")]
    OutOfAnchorRange { distance_days: i64, max_days: i64 },
    #[error("invalid Hijri date {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u8, day: u8 },
    #[error("reference anchors must be non-empty and increase in both calendars")]
    InvalidAnchors,
}

/// A known Gregorian ↔ Hijri correspondence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReferenceAnchor {
    pub gregorian: NaiveDate,
    pub hijri: HijriDate,
}

/// Umm al-Qura correspondences (Gregorian y/m/d, Hijri y/m/d).
const DEFAULT_ANCHORS: [(i32, u32, u32, i32, u8, u8); 5] = [
    (2024, 1, 1, 1445, 6, 20),
    (2024, 7, 7, 1446, 1, 1),
    (2024, 9, 15, 1446, 3, 12),
    (2025, 6, 26, 1447, 1, 1),
    (2025, 9, 4, 1447, 3, 12),
];

pub fn default_anchors() -> Vec<ReferenceAnchor> {
    DEFAULT_ANCHORS
        .iter()
        .filter_map(|&(gy, gm, gd, hy, hm, hd)| {
            Some(ReferenceAnchor {
                gregorian: NaiveDate::from_ymd_opt(gy, gm, gd)?,
                hijri: HijriDate::new(hy, hm, hd).ok()?,
            })
        })
        .collect()
}

/// Dhu al-Hijjah has 30 days in these years.
pub fn is_leap_year(year: i32) -> bool {
    (14 + 11 * i64::from(year)).rem_euclid(30) < 11
}

/// Days in `month` (1–12) of `year`.
pub fn month_length(year: i32, month: u8) -> u8 {
    if month % 2 == 1 || (month == 12 && is_leap_year(year)) {
        30
    } else {
        29
    }
}

fn next_month(year: i32, month: u8) -> (i32, u8) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn previous_month(year: i32, month: u8) -> (i32, u8) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Move `days` forward (or backward when negative) from `from` using tabular lengths.
pub fn add_days(from: HijriDate, days: i64) -> HijriDate {
    let (mut year, mut month) = (from.year, from.month);
    let day = i64::from(from.day);

    if days >= 0 {
        let mut remaining = days;
        let left_in_month = i64::from(month_length(year, month)) - day;
        if remaining <= left_in_month {
            return HijriDate {
                year,
                month,
                day: (day + remaining) as u8,
            };
        }
        remaining -= left_in_month + 1;
        (year, month) = next_month(year, month);
        while remaining >= i64::from(month_length(year, month)) {
            remaining -= i64::from(month_length(year, month));
            (year, month) = next_month(year, month);
        }
        HijriDate {
            year,
            month,
            day: (1 + remaining) as u8,
        }
    } else {
        let mut remaining = -days;
        if remaining < day {
            return HijriDate {
                year,
                month,
                day: (day - remaining) as u8,
            };
        }
        remaining -= day;
        (year, month) = previous_month(year, month);
        while remaining >= i64::from(month_length(year, month)) {
            remaining -= i64::from(month_length(year, month));
            (year, month) = previous_month(year, month);
        }
        HijriDate {
            year,
            month,
            day: (i64::from(month_length(year, month)) - remaining) as u8,
        }
    }
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: HijriDate, to: HijriDate) -> i64 {
    if to < from {
        return -days_between(to, from);
    }
    let (mut year, mut month) = (from.year, from.month);
    let mut days = -i64::from(from.day);
    while (year, month) != (to.year, to.month) {
        days += i64::from(month_length(year, month));
        (year, month) = next_month(year, month);
    }
    days + i64::from(to.day)
}

/// Anchor-based converter between the two calendars.
#[derive(Debug, Clone)]
pub struct HijriConverter {
    /// Sorted ascending in both calendars
    anchors: Vec<ReferenceAnchor>,
    max_distance_days: i64,
}

impl HijriConverter {
    /// # Errors
    /// [`HijriError::InvalidAnchors`] if `anchors` is empty or the two calendars
    /// disagree on their order.
    pub fn new(
        mut anchors: Vec<ReferenceAnchor>,
        max_anchor_distance_years: u32,
    ) -> Result<Self, HijriError> {
        anchors.sort_by_key(|a| a.gregorian);
        let ordered = anchors
            .windows(2)
            .all(|w| w[0].gregorian < w[1].gregorian && w[0].hijri < w[1].hijri);
        if anchors.is_empty() || !ordered {
            return Err(HijriError::InvalidAnchors);
        }
        Ok(Self {
            anchors,
            max_distance_days: i64::from(max_anchor_distance_years) * 365,
        })
    }

    /// Converter over the built-in anchor table.
    pub fn with_default_anchors(max_anchor_distance_years: u32) -> Self {
        Self {
            anchors: default_anchors(),
            max_distance_days: i64::from(max_anchor_distance_years) * 365,
        }
    }

    pub fn anchors(&self) -> &[ReferenceAnchor] {
        &self.anchors
    }

    /// Days from `date` to the closest anchor.
    pub fn distance_to_nearest_anchor(&self, date: NaiveDate) -> i64 {
        self.anchors
            .iter()
            .map(|a| (date - a.gregorian).num_days().abs())
            .min()
            .unwrap_or(i64::MAX)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.distance_to_nearest_anchor(date) <= self.max_distance_days
    }

    fn check_range(&self, date: NaiveDate) -> Result<(), HijriError> {
        let distance_days = self.distance_to_nearest_anchor(date);
        if distance_days > self.max_distance_days {
            debug!("{date} is {distance_days} days from the nearest Hijri anchor");
            return Err(HijriError::OutOfAnchorRange {
                distance_days,
                max_days: self.max_distance_days,
            });
        }
        Ok(())
    }

    /// The anchor at or before `date`, or the earliest anchor for dates before the table.
    fn anchor_for_gregorian(&self, date: NaiveDate) -> Option<&ReferenceAnchor> {
        let after = self.anchors.partition_point(|a| a.gregorian <= date);
        self.anchors.get(after.saturating_sub(1))
    }

    fn anchor_for_hijri(&self, date: HijriDate) -> Option<&ReferenceAnchor> {
        let after = self.anchors.partition_point(|a| a.hijri <= date);
        self.anchors.get(after.saturating_sub(1))
    }

    /// Gregorian → Hijri.
    ///
    /// # Errors
    /// [`HijriError::OutOfAnchorRange`] when `date` is too far from every anchor.
    pub fn to_hijri(&self, date: NaiveDate) -> Result<HijriDate, HijriError> {
        self.check_range(date)?;
        self.to_hijri_unchecked(date)
    }

    /// Gregorian → Hijri without the range check.
    pub fn to_hijri_unchecked(&self, date: NaiveDate) -> Result<HijriDate, HijriError> {
        let anchor = self
            .anchor_for_gregorian(date)
            .ok_or(HijriError::InvalidAnchors)?;
        Ok(add_days(anchor.hijri, (date - anchor.gregorian).num_days()))
    }

    /// Hijri → Gregorian.
    ///
    /// # Errors
    /// - [`HijriError::InvalidDate`] for impossible dates (e.g. 30 Safar)
    /// - [`HijriError::OutOfAnchorRange`] when the result is too far from every anchor
    pub fn to_gregorian(&self, date: HijriDate) -> Result<NaiveDate, HijriError> {
        let gregorian = self.to_gregorian_unchecked(date)?;
        self.check_range(gregorian)?;
        Ok(gregorian)
    }

    /// Hijri → Gregorian without the range check. Still rejects invalid dates.
    pub fn to_gregorian_unchecked(&self, date: HijriDate) -> Result<NaiveDate, HijriError> {
        let date = HijriDate::new(date.year, date.month, date.day)?;
        let anchor = self.anchor_for_hijri(date).ok_or(HijriError::InvalidAnchors)?;
        let offset = days_between(anchor.hijri, date);
        anchor
            .gregorian
            .checked_add_signed(chrono::Duration::days(offset))
            .ok_or(HijriError::InvalidDate {
                year: date.year,
                month: date.month,
                day: date.day,
            })
    }
}

impl Default for HijriConverter {
    fn default() -> Self {
        Self::with_default_anchors(5)
    }
}
