//! # Application Loop
//!
//! [`App`] wires the calculators, the navigation state machine and the device
//! collaborators together. [`App::tick`] runs one cooperative iteration:
//!
//! 1. Refresh derived data on date rollover (prayer times, Hijri date, event countdowns)
//! 2. Poll input and feed each event to the state machine, performing its effects
//! 3. Check prayer alerts
//! 4. Redraw if anything changed or the displayed minute rolled over
//!
//! A tick never fails. Calculation, storage and rendering problems are logged and shown
//! on the status line while the loop keeps running.

use crate::config::{DeviceConfig, OutOfRangePolicy, Settings, SettingsStore};
use crate::device::{Devices, HijriView, RedrawRequest};
use crate::events::{EventOccurrence, EventScheduler};
use crate::hijri::{HijriConverter, HijriError};
use crate::navigation::{Effect, NavigationStateMachine};
use crate::prayer_times::PrayerTimeCache;
use crate::{Prayer, PrayerTimeSet};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use log::{debug, error, info, warn};

pub const NOTICE_DEFAULT_SETTINGS: &str = "Settings unreadable, using defaults";
pub const NOTICE_MEMORY_ONLY: &str = "Settings not saved (kept in memory)";
pub const NOTICE_NO_PRAYER_TIMES: &str = "Prayer times unavailable";

/// Save attempts before falling back to memory-only settings
const SAVE_ATTEMPTS: u32 = 2;

pub struct App {
    machine: NavigationStateMachine,
    cache: PrayerTimeCache,
    converter: HijriConverter,
    scheduler: EventScheduler,
    hijri_policy: OutOfRangePolicy,
    devices: Devices,
    store: Box<dyn SettingsStore>,
    in_memory_only: bool,
    current_date: Option<NaiveDate>,
    hijri: Option<HijriView>,
    events: Vec<EventOccurrence>,
    notice: Option<String>,
    banner: Option<(Prayer, DateTime<FixedOffset>)>,
    last_minute: Option<(NaiveDate, u32, u32)>,
    needs_redraw: bool,
}

impl App {
    /// Load settings from `store` (defaults if unreadable) and build the app.
    pub fn new(config: &DeviceConfig, devices: Devices, mut store: Box<dyn SettingsStore>) -> Self {
        let (settings, notice) = match store.load() {
            Ok(settings) => (settings, None),
            Err(e) if e.is_missing() => {
                info!("No saved settings yet; using defaults");
                (Settings::default(), None)
            }
            Err(e) => {
                warn!("Could not load settings: {e}; using defaults");
                (Settings::default(), Some(NOTICE_DEFAULT_SETTINGS.to_string()))
            }
        };
        info!(
            "Starting for {} ({:.4}, {:.4}), {} / {}",
            settings.location.name,
            settings.location.latitude,
            settings.location.longitude,
            settings.method.label(),
            settings.madhab.label()
        );

        Self {
            machine: NavigationStateMachine::new(settings),
            cache: PrayerTimeCache::new(),
            converter: HijriConverter::with_default_anchors(config.hijri.max_anchor_distance_years),
            scheduler: EventScheduler::default(),
            hijri_policy: config.hijri.out_of_range,
            devices,
            store,
            in_memory_only: false,
            current_date: None,
            hijri: None,
            events: Vec::new(),
            notice,
            banner: None,
            last_minute: None,
            needs_redraw: true,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.machine.settings()
    }

    pub fn machine(&self) -> &NavigationStateMachine {
        &self.machine
    }

    /// Today's prayer times, if they could be computed.
    pub fn prayers(&self) -> Option<&PrayerTimeSet> {
        self.cache
            .current()
            .filter(|set| Some(set.date) == self.current_date)
    }

    pub fn hijri(&self) -> Option<HijriView> {
        self.hijri
    }

    pub fn events(&self) -> &[EventOccurrence] {
        &self.events
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_in_memory_only(&self) -> bool {
        self.in_memory_only
    }

    /// Convert a UTC instant to the configured location's civil time.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        let offset = self
            .settings()
            .location
            .offset_at(now)
            .unwrap_or_else(|| Utc.fix());
        now.with_timezone(&offset)
    }

    /// Run one loop iteration at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let local = self.local_time(now);
        let today = local.date_naive();
        if self.current_date != Some(today) {
            if let Some(previous) = self.current_date {
                info!("Date rolled over from {previous} to {today}");
            }
            self.refresh(today);
        }

        for event in self.devices.input.poll() {
            let effects = self.machine.handle(event);
            self.apply(effects, local);
        }

        let effects = self.machine.tick(local, self.cache.current());
        self.apply(effects, local);

        if let Some((prayer, until)) = self.banner {
            if local >= until {
                debug!("{prayer} alert banner cleared");
                self.banner = None;
                self.needs_redraw = true;
            }
        }

        let minute = (today, local.hour(), local.minute());
        if self.last_minute != Some(minute) {
            self.last_minute = Some(minute);
            self.needs_redraw = true;
        }

        if self.needs_redraw {
            self.redraw(local);
        }
    }

    /// Recompute everything derived from the date and committed settings.
    fn refresh(&mut self, date: NaiveDate) {
        let settings = self.machine.settings().clone();
        match self.cache.get_or_compute(date, &settings) {
            Ok(set) => {
                if set.is_degraded() {
                    warn!("Approximated prayer times: {:?}", set.approximated);
                }
                if self.notice.as_deref() == Some(NOTICE_NO_PRAYER_TIMES) {
                    self.notice = None;
                }
            }
            Err(e) => {
                error!("Prayer times unavailable for {date}: {e}");
                self.notice = Some(NOTICE_NO_PRAYER_TIMES.to_string());
            }
        }

        self.hijri = match self.converter.to_hijri(date) {
            Ok(hijri) => Some(HijriView {
                date: hijri,
                approximate: false,
            }),
            Err(e @ HijriError::OutOfAnchorRange { .. }) => match self.hijri_policy {
                OutOfRangePolicy::Approximate => {
                    warn!("{e}; showing approximate Hijri date");
                    self.converter
                        .to_hijri_unchecked(date)
                        .ok()
                        .map(|hijri| HijriView {
                            date: hijri,
                            approximate: true,
                        })
                }
                OutOfRangePolicy::Hide => {
                    warn!("{e}; hiding Hijri date");
                    None
                }
            },
            Err(e) => {
                error!("Hijri conversion failed: {e}");
                None
            }
        };

        self.events = match self.hijri {
            Some(view) => self.scheduler.upcoming(&self.converter, view.date, date),
            None => Vec::new(),
        };
        self.machine.set_event_count(self.events.len());
        self.current_date = Some(date);
        self.needs_redraw = true;
    }

    fn apply(&mut self, effects: Vec<Effect>, now: DateTime<FixedOffset>) {
        for effect in effects {
            match effect {
                Effect::Play(request) => self.devices.audio.play(request),
                Effect::Banner(prayer) => {
                    let window =
                        Duration::seconds(i64::from(self.settings().alert_duration_secs));
                    self.banner = Some((prayer, now + window));
                }
                Effect::Redraw => self.needs_redraw = true,
                Effect::Commit(settings) => {
                    self.persist(&settings);
                    self.cache.invalidate();
                    self.refresh(now.date_naive());
                }
            }
        }
    }

    /// Save committed settings, retrying once, then continue memory-only.
    fn persist(&mut self, settings: &Settings) {
        if self.in_memory_only {
            debug!("Persistence disabled; keeping settings in memory");
            return;
        }
        for attempt in 1..=SAVE_ATTEMPTS {
            match self.store.save(settings) {
                Ok(()) => return,
                Err(e) => warn!("Saving settings failed (attempt {attempt}/{SAVE_ATTEMPTS}): {e}"),
            }
        }
        error!("Settings storage unavailable; continuing with in-memory settings");
        self.in_memory_only = true;
        self.notice = Some(NOTICE_MEMORY_ONLY.to_string());
        self.needs_redraw = true;
    }

    fn redraw(&mut self, now: DateTime<FixedOffset>) {
        let prayers = self
            .cache
            .current()
            .filter(|set| set.date == now.date_naive());
        let request = RedrawRequest {
            now,
            state: self.machine.state(),
            settings: self.machine.settings(),
            staged: self.machine.staged(),
            prayers,
            next_prayer: prayers.and_then(|set| set.next_after(now)),
            hijri: self.hijri,
            events: &self.events,
            notice: self.notice.as_deref(),
            alert: self.banner.map(|(prayer, _)| prayer),
        };
        if let Err(e) = self.devices.renderer.render(&request) {
            warn!("Redraw failed: {e}");
        }
        self.needs_redraw = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Madhab, PersistenceError};
    use crate::device::{AudioRequest, AudioSink, RenderError, Renderer};
    use crate::input::{InputEvent, ScriptedInput};
    use crate::navigation::{NavState, Tab};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        frames: Vec<serde_json::Value>,
        sounds: Vec<AudioRequest>,
        saves: u32,
    }

    type Shared = Rc<RefCell<Recorded>>;

    struct RecordingRenderer(Shared);

    impl Renderer for RecordingRenderer {
        fn render(&mut self, request: &RedrawRequest<'_>) -> Result<(), RenderError> {
            let frame = serde_json::to_value(request)?;
            self.0.borrow_mut().frames.push(frame);
            Ok(())
        }
    }

    struct RecordingAudio(Shared);

    impl AudioSink for RecordingAudio {
        fn play(&mut self, request: AudioRequest) {
            self.0.borrow_mut().sounds.push(request);
        }
    }

    struct MemoryStore {
        saved: Option<Settings>,
        fail: bool,
        log: Shared,
    }

    impl SettingsStore for MemoryStore {
        fn load(&mut self) -> Result<Settings, PersistenceError> {
            self.saved
                .clone()
                .ok_or_else(|| PersistenceError::Invalid("empty".to_string()))
        }

        fn save(&mut self, settings: &Settings) -> Result<(), PersistenceError> {
            self.log.borrow_mut().saves += 1;
            if self.fail {
                return Err(PersistenceError::Io(std::io::Error::other("disk full")));
            }
            self.saved = Some(settings.clone());
            Ok(())
        }
    }

    fn app(events: Vec<InputEvent>, fail_saves: bool) -> (App, Shared) {
        let shared: Shared = Rc::default();
        let devices = Devices {
            input: Box::new(ScriptedInput::new(events)),
            renderer: Box::new(RecordingRenderer(shared.clone())),
            audio: Box::new(RecordingAudio(shared.clone())),
        };
        let store = MemoryStore {
            saved: Some(Settings::default()),
            fail: fail_saves,
            log: shared.clone(),
        };
        let app = App::new(&DeviceConfig::default(), devices, Box::new(store));
        (app, shared)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_first_tick_computes_and_draws() {
        let (mut app, shared) = app(vec![], false);
        app.tick(utc(2025, 9, 4, 16, 0, 0));

        assert_eq!(app.prayers().map(|p| p.date), NaiveDate::from_ymd_opt(2025, 9, 4));
        assert_eq!(app.hijri().map(|h| h.date.to_string()).as_deref(), Some("12 Rabi' al-awwal 1447"));
        assert_eq!(app.events().len(), 10);
        assert_eq!(shared.borrow().frames.len(), 1);
    }

    #[test]
    fn test_redraws_only_on_change_or_new_minute() {
        let (mut app, shared) = app(vec![], false);
        app.tick(utc(2025, 9, 4, 16, 0, 0));
        app.tick(utc(2025, 9, 4, 16, 0, 20));
        assert_eq!(shared.borrow().frames.len(), 1);
        app.tick(utc(2025, 9, 4, 16, 1, 0));
        assert_eq!(shared.borrow().frames.len(), 2);
    }

    #[test]
    fn test_local_date_follows_location_offset() {
        let (mut app, _) = app(vec![], false);
        // 02:00 UTC on the 5th is still the 4th in Tampa (UTC-4)
        app.tick(utc(2025, 9, 5, 2, 0, 0));
        assert_eq!(app.prayers().map(|p| p.date), NaiveDate::from_ymd_opt(2025, 9, 4));
    }

    #[test]
    fn test_changeover_eve_keeps_standard_time() {
        let (mut app, _) = app(vec![], false);
        let now = utc(2025, 3, 9, 0, 30, 0);
        let local = app.local_time(now);
        assert_eq!(local.offset(), &FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(local.to_rfc3339(), "2025-03-08T19:30:00-05:00");

        app.tick(now);
        assert_eq!(app.prayers().map(|p| p.date), NaiveDate::from_ymd_opt(2025, 3, 8));
    }

    #[test]
    fn test_input_plays_tone_and_redraws() {
        let (mut app, shared) = app(vec![InputEvent::TabRight], false);
        app.tick(utc(2025, 9, 4, 16, 0, 0));
        assert_eq!(app.machine().nav_state(), NavState::EventsTab);
        assert_eq!(shared.borrow().sounds, vec![AudioRequest::confirm_tone()]);
        let last = shared.borrow().frames.last().cloned().unwrap();
        assert_eq!(last["state"]["tab"], "events");
    }

    #[test]
    fn test_commit_persists_and_recomputes() {
        let (mut app, shared) = app(
            vec![
                InputEvent::TabSelect(Tab::Settings),
                InputEvent::DirectSelect(2),
                InputEvent::Confirm,
                InputEvent::FocusDown,
                InputEvent::Confirm,
            ],
            false,
        );
        let before = {
            app.tick(utc(2025, 9, 4, 16, 0, 0));
            app.prayers().map(|p| p.time(Prayer::Asr))
        };
        for s in 1..5 {
            app.tick(utc(2025, 9, 4, 16, 0, s));
        }

        assert_eq!(app.settings().madhab, Madhab::Hanafi);
        assert_eq!(shared.borrow().saves, 1);
        assert!(app.prayers().map(|p| p.time(Prayer::Asr)) > before);
        assert!(!app.is_in_memory_only());
    }

    #[test]
    fn test_failed_saves_fall_back_to_memory() {
        let (mut app, shared) = app(
            vec![
                InputEvent::TabSelect(Tab::Settings),
                InputEvent::DirectSelect(4),
                InputEvent::Confirm,
                InputEvent::FocusUp,
                InputEvent::Confirm,
            ],
            true,
        );
        for s in 0..5 {
            app.tick(utc(2025, 9, 4, 16, 0, s));
        }

        assert_eq!(shared.borrow().saves, 2, "one retry");
        assert!(app.is_in_memory_only());
        assert_eq!(app.notice(), Some(NOTICE_MEMORY_ONLY));
        assert!(!app.settings().buzzer_enabled, "committed in memory anyway");
    }

    #[test]
    fn test_unreadable_settings_use_defaults() {
        let shared: Shared = Rc::default();
        let devices = Devices {
            input: Box::new(ScriptedInput::default()),
            renderer: Box::new(RecordingRenderer(shared.clone())),
            audio: Box::new(RecordingAudio(shared.clone())),
        };
        let store = MemoryStore {
            saved: None,
            fail: false,
            log: shared,
        };
        let app = App::new(&DeviceConfig::default(), devices, Box::new(store));
        assert_eq!(app.settings(), &Settings::default());
        assert_eq!(app.notice(), Some(NOTICE_DEFAULT_SETTINGS));
    }

    #[test]
    fn test_alert_fires_once_and_banner_clears() {
        let (mut app, shared) = app(vec![], false);
        app.tick(utc(2025, 9, 4, 12, 0, 0));
        let dhuhr = app.prayers().unwrap().time(Prayer::Dhuhr).with_timezone(&Utc);

        app.tick(dhuhr);
        app.tick(dhuhr + Duration::seconds(1));
        let alerts = shared
            .borrow()
            .sounds
            .iter()
            .filter(|s| matches!(s, AudioRequest::Alert { .. }))
            .count();
        assert_eq!(alerts, 1);
        let last = shared.borrow().frames.last().cloned().unwrap();
        assert_eq!(last["alert"], "Dhuhr");

        app.tick(dhuhr + Duration::seconds(11));
        let last = shared.borrow().frames.last().cloned().unwrap();
        assert!(last["alert"].is_null());
    }

    #[test]
    fn test_far_future_hijri_is_approximate_or_hidden() {
        let (mut app, _) = app(vec![], false);
        app.tick(utc(2035, 1, 1, 16, 0, 0));
        assert!(app.hijri().map(|h| h.approximate).unwrap_or(false));
        assert!(app.events().iter().all(|o| o.approximate));

        let shared: Shared = Rc::default();
        let devices = Devices {
            input: Box::new(ScriptedInput::default()),
            renderer: Box::new(RecordingRenderer(shared.clone())),
            audio: Box::new(RecordingAudio(shared.clone())),
        };
        let mut config = DeviceConfig::default();
        config.hijri.out_of_range = OutOfRangePolicy::Hide;
        let store = MemoryStore {
            saved: Some(Settings::default()),
            fail: false,
            log: shared,
        };
        let mut hidden = App::new(&config, devices, Box::new(store));
        hidden.tick(utc(2035, 1, 1, 16, 0, 0));
        assert!(hidden.hijri().is_none());
        assert!(hidden.events().is_empty());
    }
}
