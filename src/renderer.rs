//! # Text Rendering
//!
//! Host renderers for development and integration:
//!
//! - [`AsciiRenderer`] prints a text frame per redraw, laid out like the device screen
//!   (header, list rows for the active tab, tab bar, status line)
//! - [`JsonLinesRenderer`] writes each [`RedrawRequest`] as one JSON object per line
//!
//! Values derived from approximations (polar fallback, out-of-range Hijri walk) are
//! prefixed with `~`.

use crate::config::{DateFormat, Settings, TimeFormat};
use crate::device::{RedrawRequest, RenderError, Renderer};
use crate::navigation::{SettingsField, Tab};
use crate::Prayer;
use chrono::{DateTime, Duration, FixedOffset};
use std::io::Write;

const FRAME_WIDTH: usize = 40;
const APPROXIMATE: &str = "~";

/// Clock time in the user's chosen format, e.g. `1:34 PM` or `13:34`.
pub fn format_time(at: DateTime<FixedOffset>, format: TimeFormat) -> String {
    match format {
        TimeFormat::TwelveHour => at.format("%-I:%M %p").to_string(),
        TimeFormat::TwentyFourHour => at.format("%H:%M").to_string(),
    }
}

/// Weekday plus the Gregorian date in the user's chosen format, e.g. `Thu 09/04/2025`.
pub fn format_date(at: DateTime<FixedOffset>, format: DateFormat) -> String {
    format!("{} {}", at.format("%a"), format.format(at.date_naive()))
}

/// Day countdown for the events tab.
pub fn format_countdown(days: i64) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// Hours and minutes until an instant, e.g. `2h 05m` or `12m`.
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

fn marker(approximate: bool) -> &'static str {
    if approximate {
        APPROXIMATE
    } else {
        ""
    }
}

/// Build the text frame for a redraw request.
pub fn ascii_frame(request: &RedrawRequest<'_>) -> Vec<String> {
    let settings = request.settings;
    let format = settings.time_format;
    let rule = "-".repeat(FRAME_WIDTH);
    let mut lines = Vec::new();

    if let Some(prayer) = request.alert {
        lines.push(format!("*** {} time ***", prayer));
    }

    let clock = format_time(request.now, format);
    let name_width = FRAME_WIDTH.saturating_sub(clock.len());
    lines.push(format!(
        "{:<width$}{}",
        settings.location.name,
        clock,
        width = name_width
    ));

    let gregorian = format_date(request.now, settings.date_format);
    match request.hijri {
        Some(view) => {
            lines.push(format!("{}{} | {}", marker(view.approximate), view.date, gregorian));
            if let Some(day) = view.date.ramadan_day() {
                lines.push(format!("Ramadan day {day}"));
            }
        }
        None => lines.push(gregorian),
    }
    lines.push(rule.clone());

    let focus = request.state.focus;
    let row = |index: usize, text: String| {
        let cursor = if index == focus { '>' } else { ' ' };
        format!("{cursor} {text}")
    };

    match request.state.tab {
        Tab::Prayer => match request.prayers {
            Some(set) => {
                let next = request.next_prayer.map(|(p, _)| p);
                for (index, (prayer, at)) in set.iter().enumerate() {
                    let flag = if Some(prayer) == next { '*' } else { ' ' };
                    lines.push(row(
                        index,
                        format!(
                            "{:<9}{}{}{}",
                            prayer.name(),
                            flag,
                            marker(set.is_approximate(prayer)),
                            format_time(at, format)
                        ),
                    ));
                }
                match request.next_prayer {
                    Some((prayer, at)) => lines.push(format!(
                        "Next: {} in {}",
                        prayer,
                        format_remaining(at - request.now)
                    )),
                    None => lines.push(format!("Next: {} tomorrow", Prayer::Fajr)),
                }
            }
            None => lines.push("Prayer times unavailable".to_string()),
        },
        Tab::Events => {
            if request.events.is_empty() {
                lines.push("No upcoming events".to_string());
            }
            for (index, occurrence) in request.events.iter().enumerate() {
                lines.push(row(
                    index,
                    format!(
                        "{:<18}{}{}",
                        occurrence.event.name,
                        marker(occurrence.approximate),
                        format_countdown(occurrence.days_remaining)
                    ),
                ));
            }
        }
        Tab::Settings => {
            let shown: &Settings = request.shown_settings();
            for (index, field) in SettingsField::ALL.iter().enumerate() {
                let value = field.value_label(shown);
                let value = if request.state.editing == Some(*field) {
                    format!("< {value} >")
                } else {
                    value
                };
                lines.push(row(index, format!("{:<10}{}", field.label(), value)));
            }
        }
    }

    lines.push(rule);
    let tabs: Vec<String> = Tab::ALL
        .iter()
        .map(|tab| {
            if *tab == request.state.tab {
                format!("[{}]", tab.label())
            } else {
                format!(" {} ", tab.label())
            }
        })
        .collect();
    lines.push(tabs.join("  "));

    if let Some(notice) = request.notice {
        lines.push(format!("! {notice}"));
    }
    lines
}

/// Prints frames to any writer (stdout on the host).
pub struct AsciiRenderer<W: Write> {
    out: W,
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for AsciiRenderer<W> {
    fn render(&mut self, request: &RedrawRequest<'_>) -> Result<(), RenderError> {
        for line in ascii_frame(request) {
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes one JSON object per frame.
pub struct JsonLinesRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn render(&mut self, request: &RedrawRequest<'_>) -> Result<(), RenderError> {
        serde_json::to_writer(&mut self.out, request)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HijriView;
    use crate::events::{EventOccurrence, EventScheduler};
    use crate::hijri::HijriConverter;
    use crate::navigation::NavigationState;
    use crate::prayer_times;
    use crate::{HijriDate, PrayerTimeSet};
    use chrono::{NaiveDate, TimeZone};

    struct Fixture {
        settings: Settings,
        state: NavigationState,
        prayers: PrayerTimeSet,
        events: Vec<EventOccurrence>,
        now: DateTime<FixedOffset>,
    }

    fn fixture() -> Fixture {
        let settings = Settings::default();
        let date = NaiveDate::from_ymd_opt(2025, 9, 4).unwrap();
        let prayers =
            prayer_times::compute(date, &settings.location, settings.method, settings.madhab)
                .unwrap();
        let converter = HijriConverter::default();
        let events = EventScheduler::default().upcoming(
            &converter,
            HijriDate::new(1447, 3, 12).unwrap(),
            date,
        );
        let now = FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 9, 4, 12, 0, 0)
            .unwrap();
        Fixture {
            settings,
            state: NavigationState::default(),
            prayers,
            events,
            now,
        }
    }

    fn request(f: &Fixture) -> RedrawRequest<'_> {
        RedrawRequest {
            now: f.now,
            state: &f.state,
            settings: &f.settings,
            staged: None,
            prayers: Some(&f.prayers),
            next_prayer: f.prayers.next_after(f.now),
            hijri: Some(HijriView {
                date: HijriDate::new(1447, 3, 12).unwrap(),
                approximate: false,
            }),
            events: &f.events,
            notice: None,
            alert: None,
        }
    }

    #[test]
    fn test_format_time_both_styles() {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 13, 4, 0)
            .unwrap();
        assert_eq!(format_time(at, TimeFormat::TwelveHour), "1:04 PM");
        assert_eq!(format_time(at, TimeFormat::TwentyFourHour), "13:04");
    }

    #[test]
    fn test_countdown_and_remaining() {
        assert_eq!(format_countdown(0), "Today");
        assert_eq!(format_countdown(1), "Tomorrow");
        assert_eq!(format_countdown(12), "in 12 days");
        assert_eq!(format_remaining(Duration::minutes(125)), "2h 05m");
        assert_eq!(format_remaining(Duration::minutes(7)), "7m");
    }

    #[test]
    fn test_prayer_tab_frame() {
        let f = fixture();
        let frame = ascii_frame(&request(&f));
        let text = frame.join("\n");

        assert!(frame[0].starts_with("Tampa"));
        assert!(frame[0].ends_with("12:00 PM"));
        assert!(text.contains("12 Rabi' al-awwal 1447"));
        assert!(text.contains("> Fajr"), "focus starts on the first row");
        assert!(text.contains("Next: Dhuhr in"));
        assert!(text.contains("[Prayer]"));
        assert!(!text.contains('~'), "nothing approximated in Tampa");
        assert!(text.contains("| Thu 09/04/2025"), "{text}");
    }

    #[test]
    fn test_gregorian_date_follows_setting() {
        let mut f = fixture();
        f.settings.date_format = DateFormat::YearMonthDay;
        let text = ascii_frame(&request(&f)).join("\n");
        assert!(text.contains("Thu 2025-09-04"), "{text}");
        assert_eq!(format_date(f.now, DateFormat::DayMonthYear), "Thu 04/09/2025");
    }

    #[test]
    fn test_events_tab_frame() {
        let mut f = fixture();
        f.state.tab = Tab::Events;
        let text = ascii_frame(&request(&f)).join("\n");
        assert!(text.contains("Mawlid al-Nabi"));
        assert!(text.contains("Today"));
        assert!(text.contains("[Events]"));
    }

    #[test]
    fn test_settings_tab_shows_staged_value() {
        let mut f = fixture();
        f.state.tab = Tab::Settings;
        f.state.editing = Some(SettingsField::BuzzerEnabled);
        let mut staged = f.settings.clone();
        staged.buzzer_enabled = false;

        let mut req = request(&f);
        req.staged = Some(&staged);
        let text = ascii_frame(&req).join("\n");
        assert!(text.contains("Buzzer    < Off >"), "{text}");
    }

    #[test]
    fn test_notice_banner_and_approximate_hijri() {
        let f = fixture();
        let mut req = request(&f);
        req.notice = Some("Settings not saved");
        req.alert = Some(Prayer::Dhuhr);
        req.hijri = req.hijri.map(|view| HijriView {
            approximate: true,
            ..view
        });
        let frame = ascii_frame(&req);
        assert_eq!(frame[0], "*** Dhuhr time ***");
        assert!(frame.iter().any(|l| l.starts_with("~12 Rabi' al-awwal")));
        assert_eq!(frame.last().map(String::as_str), Some("! Settings not saved"));
    }

    #[test]
    fn test_ascii_renderer_writes_frame() {
        let f = fixture();
        let mut renderer = AsciiRenderer::new(Vec::new());
        renderer.render(&request(&f)).unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("Maghrib"));
    }

    #[test]
    fn test_json_renderer_writes_one_object_per_line() {
        let f = fixture();
        let mut renderer = JsonLinesRenderer::new(Vec::new());
        renderer.render(&request(&f)).unwrap();
        renderer.render(&request(&f)).unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["state"]["tab"], "prayer");
        assert_eq!(value["hijri"]["date"]["month"], 3);
        assert_eq!(value["settings"]["location"]["name"], "Tampa");
    }
}
