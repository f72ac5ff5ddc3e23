//! # Device Collaborators
//!
//! The run loop talks to hardware only through three traits: [`crate::input::InputSource`],
//! [`Renderer`] and [`AudioSink`]. [`Devices`] bundles one of each, chosen at startup
//! from [`crate::config::DeviceConfig`], so the same loop drives a terminal, a JSON
//! consumer, or an embedded-graphics frame buffer.

use crate::config::{RendererKind, Settings};
use crate::display::{Framebuffer, FramebufferRenderer};
use crate::events::EventOccurrence;
use crate::input::{InputSource, TouchLayout};
use crate::navigation::NavigationState;
use crate::renderer::{AsciiRenderer, JsonLinesRenderer};
use crate::{HijriDate, Prayer, PrayerTimeSet};
use chrono::{DateTime, FixedOffset};
use log::info;
use serde::Serialize;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Length of the tone played for every accepted input
pub const CONFIRM_TONE: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioRequest {
    ConfirmTone { duration: Duration },
    Alert { prayer: Prayer, duration: Duration },
}

impl AudioRequest {
    pub fn confirm_tone() -> Self {
        AudioRequest::ConfirmTone {
            duration: CONFIRM_TONE,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            AudioRequest::ConfirmTone { duration } | AudioRequest::Alert { duration, .. } => {
                *duration
            }
        }
    }
}

pub trait AudioSink {
    fn play(&mut self, request: AudioRequest);
}

/// Host stand-in for the buzzer.
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, request: AudioRequest) {
        match request {
            AudioRequest::ConfirmTone { duration } => {
                log::debug!("beep ({} ms)", duration.as_millis())
            }
            AudioRequest::Alert { prayer, duration } => {
                info!("buzzer: {} alert for {} s", prayer, duration.as_secs())
            }
        }
    }
}

/// Today's Hijri date and whether it came from an out-of-range walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HijriView {
    pub date: HijriDate,
    pub approximate: bool,
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Serialize)]
pub struct RedrawRequest<'a> {
    pub now: DateTime<FixedOffset>,
    pub state: &'a NavigationState,
    /// Committed settings
    pub settings: &'a Settings,
    /// Working copy while editing
    pub staged: Option<&'a Settings>,
    pub prayers: Option<&'a PrayerTimeSet>,
    pub next_prayer: Option<(Prayer, DateTime<FixedOffset>)>,
    pub hijri: Option<HijriView>,
    pub events: &'a [EventOccurrence],
    /// One-line status message (e.g. storage failures)
    pub notice: Option<&'a str>,
    /// Prayer whose alert banner is showing
    pub alert: Option<Prayer>,
}

impl RedrawRequest<'_> {
    /// Settings to show on the settings tab: the staged copy while editing.
    pub fn shown_settings(&self) -> &Settings {
        self.staged.unwrap_or(self.settings)
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render output failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("drawing failed: {0}")]
    Draw(String),
}

pub trait Renderer {
    fn render(&mut self, request: &RedrawRequest<'_>) -> Result<(), RenderError>;
}

/// The three collaborators the run loop owns.
pub struct Devices {
    pub input: Box<dyn InputSource>,
    pub renderer: Box<dyn Renderer>,
    pub audio: Box<dyn AudioSink>,
}

pub fn select_renderer(kind: RendererKind, layout: TouchLayout) -> Box<dyn Renderer> {
    info!("Using {:?} renderer", kind);
    match kind {
        RendererKind::Ascii => Box::new(AsciiRenderer::new(io::stdout())),
        RendererKind::Json => Box::new(JsonLinesRenderer::new(io::stdout())),
        RendererKind::Framebuffer => Box::new(FramebufferRenderer::new(
            Framebuffer::new(layout.width as u32, layout.height as u32),
            layout,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_tone_is_100ms() {
        assert_eq!(
            AudioRequest::confirm_tone().duration(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_shown_settings_prefers_staged() {
        let committed = Settings::default();
        let mut staged = committed.clone();
        staged.buzzer_enabled = false;
        let state = NavigationState::default();
        let now = chrono::Utc::now().fixed_offset();

        let mut request = RedrawRequest {
            now,
            state: &state,
            settings: &committed,
            staged: None,
            prayers: None,
            next_prayer: None,
            hijri: None,
            events: &[],
            notice: None,
            alert: None,
        };
        assert!(request.shown_settings().buzzer_enabled);
        request.staged = Some(&staged);
        assert!(!request.shown_settings().buzzer_enabled);
    }
}
