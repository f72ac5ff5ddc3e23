//! # Islamic Event Scheduler
//!
//! Finds the next occurrence of each yearly observance and how many days remain until it.
//! Occurrences are computed in Hijri space (this year's date, or next year's if it has
//! passed) and mapped back to Gregorian through the [`HijriConverter`].

use crate::hijri::{month_length, HijriConverter, HijriError};
use crate::HijriDate;
use chrono::NaiveDate;
use log::warn;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewYear,
    Observance,
    Fasting,
    Celebration,
    Pilgrimage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IslamicEvent {
    pub name: &'static str,
    pub month: u8,
    pub day: u8,
    pub kind: EventKind,
    pub recurs_yearly: bool,
}

const fn yearly(name: &'static str, month: u8, day: u8, kind: EventKind) -> IslamicEvent {
    IslamicEvent {
        name,
        month,
        day,
        kind,
        recurs_yearly: true,
    }
}

pub const ISLAMIC_EVENTS: [IslamicEvent; 10] = [
    yearly("Islamic New Year", 1, 1, EventKind::NewYear),
    yearly("Ashura", 1, 10, EventKind::Observance),
    yearly("Mawlid al-Nabi", 3, 12, EventKind::Celebration),
    yearly("Isra and Mi'raj", 7, 27, EventKind::Observance),
    yearly("Ramadan Begins", 9, 1, EventKind::Fasting),
    yearly("Laylat al-Qadr", 9, 27, EventKind::Fasting),
    yearly("Eid al-Fitr", 10, 1, EventKind::Celebration),
    yearly("Hajj Season", 12, 8, EventKind::Pilgrimage),
    yearly("Day of Arafah", 12, 9, EventKind::Pilgrimage),
    yearly("Eid al-Adha", 12, 10, EventKind::Celebration),
];

/// The next occurrence of one event relative to "today".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventOccurrence {
    pub event: IslamicEvent,
    pub hijri: HijriDate,
    pub gregorian: NaiveDate,
    /// 0 on the day itself
    pub days_remaining: i64,
    /// The Gregorian date came from an out-of-range walk
    pub approximate: bool,
}

#[derive(Debug, Clone)]
pub struct EventScheduler {
    events: Vec<IslamicEvent>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new(ISLAMIC_EVENTS.to_vec())
    }
}

impl EventScheduler {
    pub fn new(events: Vec<IslamicEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[IslamicEvent] {
        &self.events
    }

    /// Next occurrence of every event, nearest first.
    ///
    /// `current` is today's Hijri date as shown on screen and `today` the Gregorian date
    /// it was derived from. Events falling today report zero days remaining. A day past
    /// the month's length (e.g. the 30th of a 29-day month) is clamped to its last day.
    pub fn upcoming(
        &self,
        converter: &HijriConverter,
        current: HijriDate,
        today: NaiveDate,
    ) -> Vec<EventOccurrence> {
        let mut upcoming: Vec<EventOccurrence> = self
            .events
            .iter()
            .filter_map(|event| next_occurrence(converter, event, current, today))
            .collect();
        // Stable: events on the same day keep table order
        upcoming.sort_by_key(|o| o.days_remaining);
        upcoming
    }

    /// The single nearest event.
    pub fn next_event(
        &self,
        converter: &HijriConverter,
        current: HijriDate,
        today: NaiveDate,
    ) -> Option<EventOccurrence> {
        self.upcoming(converter, current, today).into_iter().next()
    }
}

fn next_occurrence(
    converter: &HijriConverter,
    event: &IslamicEvent,
    current: HijriDate,
    today: NaiveDate,
) -> Option<EventOccurrence> {
    // Two years covers an occurrence that maps to a Gregorian date already behind us
    for year in current.year..=current.year + 2 {
        if year > current.year && !event.recurs_yearly {
            break;
        }
        let day = event.day.min(month_length(year, event.month));
        let hijri = match HijriDate::new(year, event.month, day) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping {}: {}", event.name, e);
                return None;
            }
        };
        if hijri < current {
            continue;
        }

        let (gregorian, approximate) = match converter.to_gregorian(hijri) {
            Ok(date) => (date, false),
            Err(HijriError::OutOfAnchorRange { .. }) => {
                (converter.to_gregorian_unchecked(hijri).ok()?, true)
            }
            Err(e) => {
                warn!("Skipping {}: {}", event.name, e);
                return None;
            }
        };

        let days_remaining = (gregorian - today).num_days();
        if days_remaining < 0 {
            continue;
        }
        return Some(EventOccurrence {
            event: *event,
            hijri,
            gregorian,
            days_remaining,
            approximate,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdate(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hdate(y: i32, m: u8, d: u8) -> HijriDate {
        HijriDate::new(y, m, d).unwrap()
    }

    fn find<'a>(list: &'a [EventOccurrence], name: &str) -> &'a EventOccurrence {
        list.iter().find(|o| o.event.name == name).unwrap()
    }

    #[test]
    fn test_event_on_today_has_zero_days() {
        let converter = HijriConverter::default();
        let upcoming =
            EventScheduler::default().upcoming(&converter, hdate(1447, 3, 12), gdate(2025, 9, 4));

        assert_eq!(upcoming.len(), ISLAMIC_EVENTS.len());
        assert_eq!(upcoming[0].event.name, "Mawlid al-Nabi");
        assert_eq!(upcoming[0].days_remaining, 0);
    }

    #[test]
    fn test_passed_events_roll_to_next_year() {
        let converter = HijriConverter::default();
        let today = gdate(2025, 9, 4);
        let upcoming = EventScheduler::default().upcoming(&converter, hdate(1447, 3, 12), today);

        let new_year = find(&upcoming, "Islamic New Year");
        assert_eq!(new_year.hijri, hdate(1448, 1, 1));
        assert_eq!(new_year.days_remaining, 285);
        assert_eq!(new_year.gregorian, gdate(2026, 6, 16));

        let ashura = find(&upcoming, "Ashura");
        assert_eq!(ashura.days_remaining, 294);

        let ramadan = find(&upcoming, "Ramadan Begins");
        assert_eq!(ramadan.hijri, hdate(1447, 9, 1));
        assert!(!ramadan.approximate);
    }

    #[test]
    fn test_sorted_nearest_first() {
        let converter = HijriConverter::default();
        let today = gdate(2025, 1, 31);
        let current = converter.to_hijri(today).unwrap();
        let upcoming = EventScheduler::default().upcoming(&converter, current, today);
        assert!(upcoming
            .windows(2)
            .all(|w| w[0].days_remaining <= w[1].days_remaining));
        assert_eq!(upcoming[0].event.name, "Ramadan Begins");
        // Hajj Season, Day of Arafah, Eid al-Adha fall on consecutive days in order
        let pilgrimage: Vec<&str> = upcoming
            .iter()
            .filter(|o| o.event.month == 12)
            .map(|o| o.event.name)
            .collect();
        assert_eq!(pilgrimage, ["Hajj Season", "Day of Arafah", "Eid al-Adha"]);
    }

    #[test]
    fn test_countdown_decreases_by_one_each_day() {
        let converter = HijriConverter::default();
        let scheduler = EventScheduler::default();
        let mut today = gdate(2025, 1, 1);
        let mut previous = None;
        for _ in 0..60 {
            let current = converter.to_hijri(today).unwrap();
            let remaining =
                find(&scheduler.upcoming(&converter, current, today), "Eid al-Fitr").days_remaining;
            if let Some(prev) = previous {
                assert_eq!(remaining, prev - 1);
            }
            previous = Some(remaining);
            today = today.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_day_clamped_to_month_length() {
        let converter = HijriConverter::default();
        let scheduler = EventScheduler::new(vec![yearly("Last of Safar", 2, 30, EventKind::Observance)]);
        let next = scheduler
            .next_event(&converter, hdate(1447, 1, 1), gdate(2025, 6, 26))
            .unwrap();
        assert_eq!(next.hijri, hdate(1447, 2, 29));
    }

    #[test]
    fn test_one_off_events_do_not_roll_over() {
        let converter = HijriConverter::default();
        let one_off = |month| IslamicEvent {
            name: "Community Iftar",
            month,
            day: 1,
            kind: EventKind::Fasting,
            recurs_yearly: false,
        };
        let scheduler = EventScheduler::new(vec![one_off(1), one_off(9)]);
        let upcoming = scheduler.upcoming(&converter, hdate(1447, 3, 12), gdate(2025, 9, 4));
        assert_eq!(upcoming.len(), 1, "the month 1 date has already passed");
        assert_eq!(upcoming[0].hijri, hdate(1447, 9, 1));
    }

    #[test]
    fn test_far_dates_are_approximate() {
        let converter = HijriConverter::with_default_anchors(1);
        let today = gdate(2027, 6, 1);
        let current = converter.to_hijri_unchecked(today).unwrap();
        let upcoming = EventScheduler::default().upcoming(&converter, current, today);
        assert!(!upcoming.is_empty());
        assert!(upcoming.iter().all(|o| o.approximate));
        assert!(upcoming.iter().all(|o| o.days_remaining >= 0));
    }
}
