//! # Navigation State Machine
//!
//! Owns which tab is showing, which row is focused, the settings edit session, and the
//! per-day prayer alert marker. It is driven by two inputs:
//!
//! - [`NavigationStateMachine::handle`] for each normalized [`InputEvent`]
//! - [`NavigationStateMachine::tick`] once per loop iteration with the current time
//!
//! Both return a list of [`Effect`]s. The machine never touches devices or storage
//! itself; the run loop performs the effects.
//!
//! ## States
//!
//! ```text
//!  PrayerTab ◀──TabLeft/TabRight/TabSelect──▶ EventsTab ◀──▶ SettingsTab
//!      ▲                                                        │ Confirm
//!      └──────────── Back (from any tab) ──────────             ▼
//!                                                          SettingsEdit
//!                                      Confirm: commit ◀──┘   │ Back: discard
//! ```
//!
//! ## Editing
//!
//! Entering edit mode takes a staged copy of the settings. Up/Down change the staged
//! copy only; Confirm replaces the committed settings with it in one step and emits
//! [`Effect::Commit`]; Back (or switching tabs) drops it. Committed settings are never
//! partially updated.

use crate::config::{DstRule, Settings, ALERT_DURATION_RANGE, ALERT_LEAD_RANGE};
use crate::device::AudioRequest;
use crate::input::InputEvent;
use crate::locations;
use crate::{Prayer, PrayerTimeSet};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// How long after its start an alert may still fire on a late tick
pub const ALERT_CATCH_UP_SECS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Prayer,
    Events,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Prayer, Tab::Events, Tab::Settings];

    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Prayer => "Prayer",
            Tab::Events => "Events",
            Tab::Settings => "Settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.label().eq_ignore_ascii_case(name))
    }
}

/// Flattened view of where the user is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NavState {
    PrayerTab,
    EventsTab,
    SettingsTab,
    SettingsEdit,
}

/// Rows of the settings tab, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingsField {
    Location,
    Method,
    Madhab,
    TimeFormat,
    BuzzerEnabled,
    AlertDuration,
    DaylightSaving,
    AlertLead,
    DateFormat,
}

impl SettingsField {
    pub const ALL: [SettingsField; 9] = [
        SettingsField::Location,
        SettingsField::Method,
        SettingsField::Madhab,
        SettingsField::TimeFormat,
        SettingsField::BuzzerEnabled,
        SettingsField::AlertDuration,
        SettingsField::DaylightSaving,
        SettingsField::AlertLead,
        SettingsField::DateFormat,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Location => "Location",
            SettingsField::Method => "Method",
            SettingsField::Madhab => "Asr",
            SettingsField::TimeFormat => "Clock",
            SettingsField::BuzzerEnabled => "Buzzer",
            SettingsField::AlertDuration => "Alert",
            SettingsField::DaylightSaving => "DST",
            SettingsField::AlertLead => "Early",
            SettingsField::DateFormat => "Date",
        }
    }

    pub fn value_label(self, settings: &Settings) -> String {
        match self {
            SettingsField::Location => settings.location.name.clone(),
            SettingsField::Method => settings.method.label().to_string(),
            SettingsField::Madhab => settings.madhab.label().to_string(),
            SettingsField::TimeFormat => settings.time_format.label().to_string(),
            SettingsField::BuzzerEnabled => on_off(settings.buzzer_enabled).to_string(),
            SettingsField::AlertDuration => format!("{}s", settings.alert_duration_secs),
            SettingsField::DaylightSaving => on_off(settings.location.dst != DstRule::None).to_string(),
            SettingsField::AlertLead => match settings.alert_minutes_before {
                0 => "On time".to_string(),
                minutes => format!("{minutes} min"),
            },
            SettingsField::DateFormat => settings.date_format.label().to_string(),
        }
    }

    /// Step the value one notch. Returns whether anything changed.
    pub fn step(self, settings: &mut Settings, forward: bool) -> bool {
        match self {
            SettingsField::Location => {
                let city = if forward {
                    locations::next_after(&settings.location.name)
                } else {
                    locations::previous_before(&settings.location.name)
                };
                settings.location = city.to_location();
            }
            SettingsField::Method => {
                settings.method = if forward {
                    settings.method.next()
                } else {
                    settings.method.previous()
                };
            }
            SettingsField::Madhab => settings.madhab = settings.madhab.toggled(),
            SettingsField::TimeFormat => settings.time_format = settings.time_format.toggled(),
            SettingsField::BuzzerEnabled => settings.buzzer_enabled = !settings.buzzer_enabled,
            SettingsField::AlertDuration => {
                let (min, max) = ALERT_DURATION_RANGE;
                let before = settings.alert_duration_secs;
                settings.alert_duration_secs = if forward {
                    before.saturating_add(1).min(max)
                } else {
                    before.saturating_sub(1).max(min)
                };
                return settings.alert_duration_secs != before;
            }
            SettingsField::AlertLead => {
                let (min, max) = ALERT_LEAD_RANGE;
                let before = settings.alert_minutes_before;
                settings.alert_minutes_before = if forward {
                    before.saturating_add(1).min(max)
                } else {
                    before.saturating_sub(1).max(min)
                };
                return settings.alert_minutes_before != before;
            }
            SettingsField::DateFormat => {
                settings.date_format = if forward {
                    settings.date_format.next()
                } else {
                    settings.date_format.previous()
                };
            }
            SettingsField::DaylightSaving => {
                settings.location.dst = match settings.location.dst {
                    DstRule::None => DstRule::UnitedStates,
                    DstRule::UnitedStates => DstRule::None,
                };
            }
        }
        true
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}

/// Which alertable prayers already fired today.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlertMarker {
    pub date: Option<NaiveDate>,
    alerted: [bool; 6],
}

impl AlertMarker {
    pub fn is_alerted(&self, prayer: Prayer) -> bool {
        self.alerted[prayer.index()]
    }

    fn mark(&mut self, prayer: Prayer) {
        self.alerted[prayer.index()] = true;
    }

    fn roll_to(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.date = Some(date);
            self.alerted = [false; 6];
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavigationState {
    pub tab: Tab,
    /// Focused row within the active tab
    pub focus: usize,
    /// Field being edited; `Some` only in [`NavState::SettingsEdit`]
    pub editing: Option<SettingsField>,
    pub alerts: AlertMarker,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            tab: Tab::Prayer,
            focus: 0,
            editing: None,
            alerts: AlertMarker::default(),
        }
    }
}

/// Side effects requested by the state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Play(AudioRequest),
    /// Show the alert banner for this prayer
    Banner(Prayer),
    Redraw,
    /// Settings were committed and should be persisted
    Commit(Settings),
}

#[derive(Debug, Clone)]
pub struct NavigationStateMachine {
    state: NavigationState,
    settings: Settings,
    staged: Option<Settings>,
    event_count: usize,
}

impl NavigationStateMachine {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: NavigationState::default(),
            settings,
            staged: None,
            event_count: 0,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn nav_state(&self) -> NavState {
        match (self.state.tab, self.state.editing) {
            (_, Some(_)) => NavState::SettingsEdit,
            (Tab::Prayer, None) => NavState::PrayerTab,
            (Tab::Events, None) => NavState::EventsTab,
            (Tab::Settings, None) => NavState::SettingsTab,
        }
    }

    /// Committed settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The edit session's working copy.
    pub fn staged(&self) -> Option<&Settings> {
        self.staged.as_ref()
    }

    /// Number of rows on the events tab; focus is clamped to it.
    pub fn set_event_count(&mut self, count: usize) {
        self.event_count = count;
        if self.state.tab == Tab::Events {
            self.state.focus = self.state.focus.min(count.saturating_sub(1));
        }
    }

    fn item_count(&self) -> usize {
        match self.state.tab {
            Tab::Prayer => Prayer::ALL.len(),
            Tab::Events => self.event_count,
            Tab::Settings => SettingsField::ALL.len(),
        }
    }

    /// Apply one input event.
    ///
    /// Every accepted transition plays the confirm tone and requests a redraw. Events
    /// that mean nothing in the current state return no effects.
    pub fn handle(&mut self, event: InputEvent) -> Vec<Effect> {
        let mut effects = vec![Effect::Play(AudioRequest::confirm_tone())];
        let accepted = if self.staged.is_some() {
            self.handle_editing(event, &mut effects)
        } else {
            self.handle_browsing(event)
        };

        if !accepted {
            debug!("Ignored {:?} in {:?}", event, self.nav_state());
            return Vec::new();
        }
        debug!("{:?} -> {:?} focus {}", event, self.nav_state(), self.state.focus);
        effects.push(Effect::Redraw);
        effects
    }

    fn handle_browsing(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::TabLeft => self.switch_tab(self.state.tab.previous()),
            InputEvent::TabRight => self.switch_tab(self.state.tab.next()),
            InputEvent::TabSelect(tab) => tab != self.state.tab && self.switch_tab(tab),
            InputEvent::FocusUp => self.move_focus(false),
            InputEvent::FocusDown => self.move_focus(true),
            InputEvent::DirectSelect(index) => {
                if index < self.item_count() {
                    self.state.focus = index;
                    true
                } else {
                    false
                }
            }
            InputEvent::Confirm => match self.state.tab {
                Tab::Settings => match SettingsField::from_index(self.state.focus) {
                    Some(field) => {
                        self.staged = Some(self.settings.clone());
                        self.state.editing = Some(field);
                        true
                    }
                    None => false,
                },
                Tab::Prayer | Tab::Events => false,
            },
            InputEvent::Back => self.state.tab != Tab::Prayer && self.switch_tab(Tab::Prayer),
        }
    }

    fn handle_editing(&mut self, event: InputEvent, effects: &mut Vec<Effect>) -> bool {
        let Some(field) = self.state.editing else {
            self.staged = None;
            return false;
        };
        match event {
            InputEvent::FocusUp | InputEvent::FocusDown => match self.staged.as_mut() {
                Some(staged) => field.step(staged, event == InputEvent::FocusUp),
                None => false,
            },
            InputEvent::Confirm => {
                if let Some(staged) = self.staged.take() {
                    info!("Settings committed ({} changed)", field.label());
                    self.settings = staged;
                    effects.push(Effect::Commit(self.settings.clone()));
                }
                self.state.editing = None;
                true
            }
            InputEvent::Back => {
                self.cancel_edit();
                true
            }
            InputEvent::TabLeft | InputEvent::TabRight | InputEvent::TabSelect(_) => {
                self.cancel_edit();
                self.handle_browsing(event)
            }
            InputEvent::DirectSelect(_) => false,
        }
    }

    fn cancel_edit(&mut self) {
        debug!("Discarding staged settings");
        self.staged = None;
        self.state.editing = None;
    }

    fn switch_tab(&mut self, tab: Tab) -> bool {
        self.state.tab = tab;
        self.state.focus = 0;
        true
    }

    fn move_focus(&mut self, down: bool) -> bool {
        let count = self.item_count();
        if count == 0 {
            return false;
        }
        let focus = self.state.focus.min(count - 1);
        self.state.focus = if down {
            (focus + 1) % count
        } else {
            (focus + count - 1) % count
        };
        true
    }

    /// Check prayer alerts at `now`.
    ///
    /// Each alertable prayer fires at most once per calendar day, on the first tick inside
    /// `[start, start + ALERT_CATCH_UP_SECS)` where `start` is the prayer time less the
    /// configured lead. A late tick still fires within that minute. The marker is set even
    /// with the buzzer off so turning it on mid-window does not replay a missed alert. A
    /// set for a different date than `now` is ignored.
    pub fn tick(
        &mut self,
        now: DateTime<FixedOffset>,
        prayers: Option<&PrayerTimeSet>,
    ) -> Vec<Effect> {
        let today = now.date_naive();
        self.state.alerts.roll_to(today);

        let Some(prayers) = prayers.filter(|set| set.date == today) else {
            return Vec::new();
        };

        let lead = Duration::minutes(i64::from(self.settings.alert_minutes_before));
        let window = Duration::seconds(ALERT_CATCH_UP_SECS);
        let mut effects = Vec::new();
        for (prayer, at) in prayers.iter() {
            if !prayer.is_alertable() || self.state.alerts.is_alerted(prayer) {
                continue;
            }
            let start = at - lead;
            if now >= start && now < start + window {
                self.state.alerts.mark(prayer);
                info!("{} time ({})", prayer, at.format("%H:%M"));
                if self.settings.buzzer_enabled {
                    effects.push(Effect::Play(AudioRequest::Alert {
                        prayer,
                        duration: std::time::Duration::from_secs(u64::from(
                            self.settings.alert_duration_secs,
                        )),
                    }));
                }
                effects.push(Effect::Banner(prayer));
                effects.push(Effect::Redraw);
            }
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Madhab, TimeFormat};
    use chrono::TimeZone;

    fn machine() -> NavigationStateMachine {
        NavigationStateMachine::new(Settings::default())
    }

    fn drive(machine: &mut NavigationStateMachine, events: &[InputEvent]) {
        for &event in events {
            machine.handle(event);
        }
    }

    #[test]
    fn test_starts_on_prayer_tab() {
        let m = machine();
        assert_eq!(m.nav_state(), NavState::PrayerTab);
        assert_eq!(m.state().focus, 0);
    }

    #[test]
    fn test_tabs_wrap_and_reset_focus() {
        let mut m = machine();
        drive(&mut m, &[InputEvent::FocusDown, InputEvent::FocusDown]);
        assert_eq!(m.state().focus, 2);

        m.handle(InputEvent::TabLeft);
        assert_eq!(m.nav_state(), NavState::SettingsTab);
        assert_eq!(m.state().focus, 0);

        m.handle(InputEvent::TabRight);
        assert_eq!(m.nav_state(), NavState::PrayerTab);
    }

    #[test]
    fn test_accepted_events_emit_tone_and_redraw() {
        let mut m = machine();
        let effects = m.handle(InputEvent::TabRight);
        assert_eq!(
            effects,
            vec![Effect::Play(AudioRequest::confirm_tone()), Effect::Redraw]
        );
    }

    #[test]
    fn test_noops_emit_nothing() {
        let mut m = machine();
        assert!(m.handle(InputEvent::Confirm).is_empty(), "confirm on prayer tab");
        assert!(m.handle(InputEvent::Back).is_empty(), "back on prayer tab");
        assert!(m.handle(InputEvent::TabSelect(Tab::Prayer)).is_empty());
        assert!(m.handle(InputEvent::DirectSelect(6)).is_empty(), "past the last row");
        m.handle(InputEvent::TabSelect(Tab::Settings));
        assert!(m.handle(InputEvent::DirectSelect(SettingsField::ALL.len())).is_empty());
    }

    #[test]
    fn test_focus_wraps() {
        let mut m = machine();
        m.handle(InputEvent::FocusUp);
        assert_eq!(m.state().focus, Prayer::ALL.len() - 1);
        m.handle(InputEvent::FocusDown);
        assert_eq!(m.state().focus, 0);
    }

    #[test]
    fn test_empty_events_tab_ignores_focus() {
        let mut m = machine();
        m.handle(InputEvent::TabSelect(Tab::Events));
        assert!(m.handle(InputEvent::FocusDown).is_empty());
        m.set_event_count(3);
        m.handle(InputEvent::FocusUp);
        assert_eq!(m.state().focus, 2);
    }

    #[test]
    fn test_back_returns_to_prayer_tab() {
        let mut m = machine();
        m.handle(InputEvent::TabSelect(Tab::Events));
        m.handle(InputEvent::Back);
        assert_eq!(m.nav_state(), NavState::PrayerTab);
    }

    #[test]
    fn test_edit_then_back_discards() {
        let mut m = machine();
        let original = m.settings().clone();
        drive(
            &mut m,
            &[
                InputEvent::TabSelect(Tab::Settings),
                InputEvent::DirectSelect(2),
                InputEvent::Confirm,
            ],
        );
        assert_eq!(m.nav_state(), NavState::SettingsEdit);

        m.handle(InputEvent::FocusDown);
        assert_eq!(m.staged().map(|s| s.madhab), Some(Madhab::Hanafi));
        assert_eq!(m.settings().madhab, Madhab::Standard, "committed copy untouched");

        m.handle(InputEvent::Back);
        assert_eq!(m.nav_state(), NavState::SettingsTab);
        assert_eq!(m.settings(), &original);
        assert!(m.staged().is_none());
    }

    #[test]
    fn test_edit_then_confirm_commits() {
        let mut m = machine();
        drive(
            &mut m,
            &[
                InputEvent::TabSelect(Tab::Settings),
                InputEvent::DirectSelect(3),
                InputEvent::Confirm,
                InputEvent::FocusUp,
            ],
        );
        let effects = m.handle(InputEvent::Confirm);

        assert_eq!(m.settings().time_format, TimeFormat::TwentyFourHour);
        assert_eq!(m.nav_state(), NavState::SettingsTab);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Commit(s) if s.time_format == TimeFormat::TwentyFourHour)));
    }

    #[test]
    fn test_tab_switch_while_editing_discards() {
        let mut m = machine();
        drive(
            &mut m,
            &[
                InputEvent::TabSelect(Tab::Settings),
                InputEvent::Confirm,
                InputEvent::FocusDown,
                InputEvent::TabSelect(Tab::Events),
            ],
        );
        assert_eq!(m.nav_state(), NavState::EventsTab);
        assert_eq!(m.settings().location.name, "Tampa");
    }

    #[test]
    fn test_alert_duration_clamps() {
        let mut settings = Settings::default();
        settings.alert_duration_secs = 60;
        assert!(!SettingsField::AlertDuration.step(&mut settings, true));
        assert_eq!(settings.alert_duration_secs, 60);
        settings.alert_duration_secs = 1;
        assert!(!SettingsField::AlertDuration.step(&mut settings, false));
        assert!(SettingsField::AlertDuration.step(&mut settings, true));
        assert_eq!(settings.alert_duration_secs, 2);
    }

    #[test]
    fn test_alert_lead_and_date_format_fields() {
        let mut settings = Settings::default();
        assert_eq!(SettingsField::AlertLead.value_label(&settings), "On time");
        assert!(!SettingsField::AlertLead.step(&mut settings, false));
        assert!(SettingsField::AlertLead.step(&mut settings, true));
        assert_eq!(SettingsField::AlertLead.value_label(&settings), "1 min");
        settings.alert_minutes_before = ALERT_LEAD_RANGE.1;
        assert!(!SettingsField::AlertLead.step(&mut settings, true));

        assert_eq!(SettingsField::DateFormat.value_label(&settings), "MM/DD/YYYY");
        assert!(SettingsField::DateFormat.step(&mut settings, false));
        assert_eq!(SettingsField::DateFormat.value_label(&settings), "YYYY-MM-DD");
    }

    #[test]
    fn test_location_field_cycles_cities() {
        let mut settings = Settings::default();
        SettingsField::Location.step(&mut settings, true);
        assert_eq!(settings.location.name, "New York");
        SettingsField::Location.step(&mut settings, false);
        assert_eq!(settings.location.name, "Tampa");
    }

    fn alert_fixture() -> (PrayerTimeSet, DateTime<FixedOffset>) {
        let tz = FixedOffset::west_opt(4 * 3600).unwrap();
        let at = |h, m| tz.with_ymd_and_hms(2025, 6, 21, h, m, 0).unwrap();
        let set = PrayerTimeSet {
            date: NaiveDate::from_ymd_opt(2025, 6, 21).unwrap(),
            times: [at(5, 5), at(6, 34), at(13, 34), at(17, 12), at(20, 32), at(21, 50)],
            approximated: vec![],
        };
        (set, at(13, 34))
    }

    #[test]
    fn test_alert_fires_once_in_window() {
        let mut m = machine();
        let (set, dhuhr) = alert_fixture();

        assert!(m.tick(dhuhr - Duration::seconds(1), Some(&set)).is_empty());

        let effects = m.tick(dhuhr, Some(&set));
        assert!(effects.contains(&Effect::Banner(Prayer::Dhuhr)));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Play(AudioRequest::Alert { prayer: Prayer::Dhuhr, .. }))));

        assert!(m.tick(dhuhr + Duration::seconds(5), Some(&set)).is_empty());
        assert!(m.state().alerts.is_alerted(Prayer::Dhuhr));
    }

    #[test]
    fn test_alert_missed_after_window() {
        let mut m = machine();
        let (set, dhuhr) = alert_fixture();
        assert!(m
            .tick(dhuhr + Duration::seconds(ALERT_CATCH_UP_SECS), Some(&set))
            .is_empty());
        assert!(!m.state().alerts.is_alerted(Prayer::Dhuhr));
    }

    #[test]
    fn test_late_tick_still_alerts() {
        let mut settings = Settings::default();
        settings.alert_duration_secs = 1;
        let mut m = NavigationStateMachine::new(settings);
        let (set, dhuhr) = alert_fixture();

        // Ticks two seconds apart straddle a one second tone
        assert!(m.tick(dhuhr - Duration::seconds(1), Some(&set)).is_empty());
        let effects = m.tick(dhuhr + Duration::seconds(1), Some(&set));
        assert!(effects.contains(&Effect::Banner(Prayer::Dhuhr)));
        assert!(effects.contains(&Effect::Play(AudioRequest::Alert {
            prayer: Prayer::Dhuhr,
            duration: std::time::Duration::from_secs(1),
        })));

        // A stalled loop that wakes up half a minute late still catches Asr
        let asr = set.time(Prayer::Asr);
        let effects = m.tick(asr + Duration::seconds(30), Some(&set));
        assert!(effects.contains(&Effect::Banner(Prayer::Asr)));
    }

    #[test]
    fn test_alert_lead_fires_early() {
        let mut settings = Settings::default();
        settings.alert_minutes_before = 5;
        let mut m = NavigationStateMachine::new(settings);
        let (set, dhuhr) = alert_fixture();

        assert!(m.tick(dhuhr - Duration::minutes(6), Some(&set)).is_empty());
        let effects = m.tick(dhuhr - Duration::minutes(5), Some(&set));
        assert!(effects.contains(&Effect::Banner(Prayer::Dhuhr)));
        assert!(m.tick(dhuhr, Some(&set)).is_empty(), "no second alert on time");
    }

    #[test]
    fn test_sunrise_never_alerts() {
        let mut m = machine();
        let (set, _) = alert_fixture();
        assert!(m.tick(set.time(Prayer::Sunrise), Some(&set)).is_empty());
    }

    #[test]
    fn test_buzzer_off_still_marks() {
        let mut settings = Settings::default();
        settings.buzzer_enabled = false;
        let mut m = NavigationStateMachine::new(settings);
        let (set, dhuhr) = alert_fixture();

        let effects = m.tick(dhuhr, Some(&set));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Play(_))));
        assert!(effects.contains(&Effect::Banner(Prayer::Dhuhr)));
        assert!(m.state().alerts.is_alerted(Prayer::Dhuhr));
    }

    #[test]
    fn test_marker_resets_at_midnight_and_ignores_stale_sets() {
        let mut m = machine();
        let (set, dhuhr) = alert_fixture();
        m.tick(dhuhr, Some(&set));

        let tomorrow = dhuhr + Duration::days(1);
        assert!(m.tick(tomorrow, Some(&set)).is_empty(), "yesterday's set");
        assert!(!m.state().alerts.is_alerted(Prayer::Dhuhr));
        assert_eq!(m.state().alerts.date, Some(tomorrow.date_naive()));
    }
}
