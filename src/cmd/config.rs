use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use roleguard::config::Config;

use super::{display_json, RunCommand};

/// Display the parsed configuration in JSON format.
#[derive(Args)]
pub struct ShowConfigArgs {}

impl RunCommand for ShowConfigArgs {
    fn run(&self, cfg: &Config) -> Result<ExitCode> {
        display_json(cfg)?;
        Ok(ExitCode::SUCCESS)
    }
}
