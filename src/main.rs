//! # Prayer Companion Entry Point
//!
//! Loads the device configuration, wires the collaborators, and runs the cooperative
//! tick loop until interrupted (or for `--ticks N` iterations).
//!
//! ## Usage
//! ```text
//! prayer-companion [--stdout | --json] [--config <path>] [--ticks <n>]
//! ```
//!
//! - `--stdout`: text frames on stdout (development mode, the default renderer)
//! - `--json`: one JSON object per redraw on stdout
//! - `--config`: device configuration file (default `prayer-config.toml`)
//! - `--ticks`: stop after this many loop iterations
//!
//! Input is read from stdin, one command per line (`left`, `right`, `up`, `down`, `ok`,
//! `back`, `tab <name>`, `select <n>`, `touch <x> <y>`). Set `RUST_LOG` to change the
//! log level; logs go to stderr so they never interleave with frames.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::Utc;
use log::info;
use prayer_clock_lib::app::App;
use prayer_clock_lib::config::{DeviceConfig, RendererKind, TomlSettingsStore, CONFIG_FILE};
use prayer_clock_lib::device::{select_renderer, Devices, LogAudio};
use prayer_clock_lib::input::{StdinInput, TouchLayout};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    /// Overrides the configured renderer
    pub renderer: Option<RendererKind>,
    pub ticks: Option<u64>,
}

pub fn parse_args<I>(args: I) -> anyhow::Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout" => options.renderer = Some(RendererKind::Ascii),
            "--json" => options.renderer = Some(RendererKind::Json),
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--ticks" => {
                let value = args.next().context("--ticks needs a count")?;
                let ticks = value
                    .parse()
                    .with_context(|| format!("invalid tick count: {value}"))?;
                options.ticks = Some(ticks);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(options)
}

/// Main application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args(env::args().skip(1))?;
    let mut config = match &options.config_path {
        Some(path) => DeviceConfig::load_from_path(path),
        None => DeviceConfig::load_from_path(CONFIG_FILE),
    };
    if let Some(renderer) = options.renderer {
        config.renderer = renderer;
    }

    let layout = TouchLayout::default();
    let devices = Devices {
        input: Box::new(StdinInput::spawn(layout)),
        renderer: select_renderer(config.renderer, layout),
        audio: Box::new(LogAudio),
    };
    let store = TomlSettingsStore::new(&config.settings_path);
    let mut app = App::new(&config, devices, Box::new(store));

    let interval = Duration::from_millis(config.tick_interval_ms.max(1));
    let mut ticks = 0u64;
    loop {
        app.tick(Utc::now());
        ticks += 1;
        if options.ticks.is_some_and(|limit| ticks >= limit) {
            info!("Stopping after {ticks} ticks");
            break;
        }
        tokio::time::sleep(interval).await;
    }
    Ok(())
}
