mod cani;
mod config;
mod show;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roleguard::config::Config;
use roleguard::logs::LogLevel;
use serde::Serialize;

pub trait RunCommand {
    fn run(&self, cfg: &Config) -> Result<ExitCode>;
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct App {
    /// Path to the config file. Defaults to $ROLEGUARD_CONFIG, then
    /// ~/.config/roleguard.toml.
    #[arg(long, short, global = true)]
    pub config: Option<String>,

    /// Override the log level from the config file.
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Cani(cani::CaniArgs),
    Config(config::ShowConfigArgs),
    Show(show::ShowArgs),
}

impl App {
    pub fn run(&self) -> Result<ExitCode> {
        let mut cfg = Config::load(self.config.as_deref())?;
        if let Some(level) = self.log_level {
            cfg.logs.level = level;
        }
        cfg.logs.init()?;

        match &self.command {
            Commands::Cani(args) => args.run(&cfg),
            Commands::Config(args) => args.run(&cfg),
            Commands::Show(args) => args.run(&cfg),
        }
    }
}

pub fn display_json<T: Serialize>(o: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&o)?);
    Ok(())
}
