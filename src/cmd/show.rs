use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use roleguard::config::Config;

use super::{display_json, RunCommand};

/// Compile the view permissions and print the rule lists in evaluation order.
#[derive(Args)]
pub struct ShowArgs {
    /// Only show this view.
    pub view: Option<String>,
}

impl RunCommand for ShowArgs {
    fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let table = cfg.build_table()?;
        let mut summary = table.summary();
        if let Some(view) = self.view.as_ref() {
            summary.retain(|s| &s.view == view);
            if summary.is_empty() {
                eprintln!("No rules for view '{view}'");
                return Ok(ExitCode::FAILURE);
            }
        }

        display_json(summary)?;
        Ok(ExitCode::SUCCESS)
    }
}
