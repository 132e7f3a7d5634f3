use std::io::{self, IsTerminal};
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::ValueEnum;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

impl LogsConfig {
    /// Installs the global logger writing to stderr, so command output on
    /// stdout stays machine readable.
    pub fn init(&self) -> Result<()> {
        let is_terminal = io::stderr().is_terminal();

        let colors = ColoredLevelConfig::new()
            .info(Color::Green)
            .debug(Color::Magenta);

        fern::Dispatch::new()
            .format(move |out, message, record| {
                let now = humantime::format_rfc3339_millis(SystemTime::now());
                if is_terminal {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        now,
                        colors.color(record.level()),
                        message
                    ))
                } else {
                    out.finish(format_args!("{} [{}] {}", now, record.level(), message))
                }
            })
            .level(self.level.filter())
            .chain(io::stderr())
            .apply()
            .context("init logger")?;

        Ok(())
    }
}
