//! # Configuration Management
//!
//! Two files configure the device:
//!
//! - **`prayer-config.toml`** holds [`DeviceConfig`]: tick rate, which renderer to use,
//!   where settings live, and the Hijri out-of-range policy. It is read once at startup
//!   and falls back to defaults when missing or malformed.
//! - **`prayer-settings.toml`** holds the user's [`Settings`]: location, calculation
//!   method, madhab and alert preferences. The settings tab edits it and every committed
//!   edit is written back through a [`SettingsStore`].

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default path for the device configuration file
pub const CONFIG_FILE: &str = "prayer-config.toml";
/// Default path for persisted user settings
pub const SETTINGS_FILE: &str = "prayer-settings.toml";

/// Inclusive bounds for the alert tone length, in seconds
pub const ALERT_DURATION_RANGE: (u32, u32) = (1, 60);
/// Inclusive bounds for how early the alert sounds, in minutes
pub const ALERT_LEAD_RANGE: (u32, u32) = (0, 30);
/// Inclusive bounds for the main loop period, in milliseconds
pub const TICK_INTERVAL_RANGE_MS: (u64, u64) = (10, 1_000);

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("settings storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("settings file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("settings could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("settings rejected: {0}")]
    Invalid(String),
}

impl PersistenceError {
    /// Nothing has been saved yet (first boot).
    pub fn is_missing(&self) -> bool {
        matches!(self, PersistenceError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Twilight-angle convention used for Fajr and Isha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationMethod {
    /// Islamic Society of North America: 15° / 15°
    #[serde(rename = "ISNA")]
    Isna,
    /// Muslim World League: 18° / 17°
    #[serde(rename = "MWL")]
    Mwl,
    /// Umm al-Qura, Mecca: 18.5° Fajr, Isha 90 minutes after Maghrib
    #[serde(rename = "Mecca")]
    Mecca,
}

/// How Isha is derived for a [`CalculationMethod`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IshaRule {
    /// Sun depression angle below the horizon, in degrees
    Angle(f64),
    /// Fixed interval after Maghrib
    MinutesAfterMaghrib(i64),
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 3] = [
        CalculationMethod::Isna,
        CalculationMethod::Mwl,
        CalculationMethod::Mecca,
    ];

    /// Sun depression angle for Fajr, in degrees below the horizon.
    pub fn fajr_angle(self) -> f64 {
        match self {
            CalculationMethod::Isna => 15.0,
            CalculationMethod::Mwl => 18.0,
            CalculationMethod::Mecca => 18.5,
        }
    }

    pub fn isha_rule(self) -> IshaRule {
        match self {
            CalculationMethod::Isna => IshaRule::Angle(15.0),
            CalculationMethod::Mwl => IshaRule::Angle(17.0),
            CalculationMethod::Mecca => IshaRule::MinutesAfterMaghrib(90),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalculationMethod::Isna => "ISNA",
            CalculationMethod::Mwl => "MWL",
            CalculationMethod::Mecca => "Mecca",
        }
    }

    /// Cycle forward through [`CalculationMethod::ALL`].
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Juristic school for the Asr shadow length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Madhab {
    /// Shadow equals object length (Shafi'i, Maliki, Hanbali)
    Standard,
    /// Shadow equals twice the object length
    Hanafi,
}

impl Madhab {
    pub fn shadow_factor(self) -> f64 {
        match self {
            Madhab::Standard => 1.0,
            Madhab::Hanafi => 2.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Madhab::Standard => Madhab::Hanafi,
            Madhab::Hanafi => Madhab::Standard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Madhab::Standard => "Standard",
            Madhab::Hanafi => "Hanafi",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl TimeFormat {
    pub fn toggled(self) -> Self {
        match self {
            TimeFormat::TwelveHour => TimeFormat::TwentyFourHour,
            TimeFormat::TwentyFourHour => TimeFormat::TwelveHour,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "12h",
            TimeFormat::TwentyFourHour => "24h",
        }
    }
}

/// How the Gregorian date is written on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
}

impl DateFormat {
    pub const ALL: [DateFormat; 3] = [
        DateFormat::MonthDayYear,
        DateFormat::DayMonthYear,
        DateFormat::YearMonthDay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateFormat::MonthDayYear => "MM/DD/YYYY",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::YearMonthDay => "YYYY-MM-DD",
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        let pattern = match self {
            DateFormat::MonthDayYear => "%m/%d/%Y",
            DateFormat::DayMonthYear => "%d/%m/%Y",
            DateFormat::YearMonthDay => "%Y-%m-%d",
        };
        date.format(pattern).to_string()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Daylight-saving schedule attached to a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstRule {
    /// Standard time all year
    None,
    /// Second Sunday of March up to (not including) the first Sunday of November
    UnitedStates,
}

impl DstRule {
    pub fn is_active(self, date: NaiveDate) -> bool {
        match self {
            DstRule::None => false,
            DstRule::UnitedStates => {
                let year = date.year();
                match (
                    nth_sunday(year, 3, 2),
                    nth_sunday(year, 11, 1),
                ) {
                    (Some(start), Some(end)) => date >= start && date < end,
                    _ => false,
                }
            }
        }
    }
}

/// The `n`th Sunday (1-based) of a month.
fn nth_sunday(year: i32, month: u32, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_sunday = (7 - first.weekday().num_days_from_sunday()) % 7;
    let sunday = first + Duration::days(i64::from(to_sunday + 7 * (n - 1)));
    debug_assert_eq!(sunday.weekday(), Weekday::Sun);
    (sunday.month() == month).then_some(sunday)
}

fn hours_to_offset(hours: f64) -> Option<FixedOffset> {
    let seconds = (hours * 3600.0).round();
    if !seconds.is_finite() {
        return None;
    }
    FixedOffset::east_opt(seconds as i32)
}

/// Observer position plus the civil-time rule for that place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Display name (e.g. "Tampa")
    pub name: String,
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Standard-time offset from UTC in hours (e.g. -5.0 for US Eastern)
    pub utc_offset_hours: f64,
    /// Daylight-saving schedule; `none` keeps standard time all year
    #[serde(default = "default_dst_rule")]
    pub dst: DstRule,
}

fn default_dst_rule() -> DstRule {
    DstRule::None
}

impl Location {
    /// Effective offset in hours on `date`, including daylight saving.
    pub fn offset_hours_on(&self, date: NaiveDate) -> f64 {
        if self.dst.is_active(date) {
            self.utc_offset_hours + 1.0
        } else {
            self.utc_offset_hours
        }
    }

    /// Effective offset on `date`, or `None` if it is outside ±24 h.
    pub fn offset_on(&self, date: NaiveDate) -> Option<FixedOffset> {
        hours_to_offset(self.offset_hours_on(date))
    }

    /// Effective offset at `instant`.
    ///
    /// Daylight saving is decided on the local calendar date, read at standard time, so a
    /// US evening whose UTC date is already tomorrow keeps today's offset.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> Option<FixedOffset> {
        let standard = hours_to_offset(self.utc_offset_hours)?;
        self.offset_on(instant.with_timezone(&standard).date_naive())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(format!("latitude {} outside -90..=90", self.latitude));
        }
        if !self.longitude.is_finite() || self.longitude.abs() > 180.0 {
            return Err(format!("longitude {} outside -180..=180", self.longitude));
        }
        if !self.utc_offset_hours.is_finite() || self.utc_offset_hours.abs() > 14.0 {
            return Err(format!(
                "UTC offset {} outside -14..=14 hours",
                self.utc_offset_hours
            ));
        }
        Ok(())
    }
}

/// User-editable settings, persisted to `prayer-settings.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub location: Location,
    pub method: CalculationMethod,
    pub madhab: Madhab,
    pub time_format: TimeFormat,
    /// Whether reaching a prayer time sounds the buzzer
    pub buzzer_enabled: bool,
    /// Length of the buzzer tone in seconds
    pub alert_duration_secs: u32,
    /// Minutes before each prayer that its alert fires; 0 alerts on time
    #[serde(default)]
    pub alert_minutes_before: u32,
    #[serde(default)]
    pub date_format: DateFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            location: Location {
                name: "Tampa".to_string(),
                latitude: 27.9506,
                longitude: -82.4572,
                utc_offset_hours: -5.0,
                dst: DstRule::UnitedStates,
            },
            method: CalculationMethod::Isna,
            madhab: Madhab::Standard,
            time_format: TimeFormat::TwelveHour,
            buzzer_enabled: true,
            alert_duration_secs: 10,
            alert_minutes_before: 0,
            date_format: DateFormat::MonthDayYear,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), PersistenceError> {
        self.location.validate().map_err(PersistenceError::Invalid)?;
        let (min, max) = ALERT_DURATION_RANGE;
        if !(min..=max).contains(&self.alert_duration_secs) {
            return Err(PersistenceError::Invalid(format!(
                "alert duration {}s outside {}..={}",
                self.alert_duration_secs, min, max
            )));
        }
        let (min, max) = ALERT_LEAD_RANGE;
        if !(min..=max).contains(&self.alert_minutes_before) {
            return Err(PersistenceError::Invalid(format!(
                "alert lead {} min outside {}..={}",
                self.alert_minutes_before, min, max
            )));
        }
        Ok(())
    }
}

/// Where committed settings are written.
///
/// The device keeps working if the store fails; see [`crate::app::App`] for the
/// retry-then-memory-only policy.
pub trait SettingsStore {
    fn load(&mut self) -> Result<Settings, PersistenceError>;
    fn save(&mut self, settings: &Settings) -> Result<(), PersistenceError>;
}

/// TOML file store. Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&mut self) -> Result<Settings, PersistenceError> {
        let contents = fs::read_to_string(&self.path)?;
        let settings: Settings = toml::from_str(&contents)?;
        settings.validate()?;
        info!(
            "Loaded settings for {} from {}",
            settings.location.name,
            self.path.display()
        );
        Ok(settings)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), PersistenceError> {
        settings.validate()?;
        let contents = toml::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Which renderer the device draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Text frames on stdout
    Ascii,
    /// One JSON object per frame on stdout
    Json,
    /// embedded-graphics frame buffer
    Framebuffer,
}

/// What to do when a date is too far from every Hijri reference anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Show the tabular walk with an approximate marker
    Approximate,
    /// Hide the Hijri date and event countdowns
    Hide,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HijriConfig {
    /// Maximum distance from the nearest anchor before a conversion is out of range
    pub max_anchor_distance_years: u32,
    pub out_of_range: OutOfRangePolicy,
}

impl Default for HijriConfig {
    fn default() -> Self {
        Self {
            max_anchor_distance_years: 5,
            out_of_range: OutOfRangePolicy::Approximate,
        }
    }
}

/// Device configuration loaded from prayer-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Main loop period in milliseconds
    pub tick_interval_ms: u64,
    /// Where committed settings are persisted
    pub settings_path: PathBuf,
    pub renderer: RendererKind,
    pub hijri: HijriConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            tick_interval_ms: 100,
            settings_path: PathBuf::from(SETTINGS_FILE),
            renderer: RendererKind::Ascii,
            hijri: HijriConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Load configuration from prayer-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Keep the loop period inside [`TICK_INTERVAL_RANGE_MS`] so alerts are checked at
    /// least once a second.
    pub fn clamped(mut self) -> Self {
        let (min, max) = TICK_INTERVAL_RANGE_MS;
        let clamped = self.tick_interval_ms.clamp(min, max);
        if clamped != self.tick_interval_ms {
            warn!(
                "tick_interval_ms {} outside {}..={}, using {}",
                self.tick_interval_ms, min, max, clamped
            );
            self.tick_interval_ms = clamped;
        }
        self
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<DeviceConfig>(&contents) {
                Ok(config) => {
                    info!(
                        "Loaded device configuration from {}",
                        path.as_ref().display()
                    );
                    config.clamped()
                }
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default device configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found, using default device configuration");
                Self::default()
            }
        }
    }
}
