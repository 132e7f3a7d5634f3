use std::path::PathBuf;
use std::{env, fs};

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use toml::Table;

use crate::compiler::{self, LookupTable, ViewPermissions};
use crate::evaluator::NoOpinionPolicy;
use crate::guard::Guard;
use crate::logs::LogsConfig;
use crate::request::Request;
use crate::roles::{Roles, DEFAULT_COST};
use crate::settings::{self, Presets};

pub trait CommonConfig {
    fn complete(&mut self) -> Result<()>;
}

/// Configuration file layout. `settings` and `views` are kept as raw tables:
/// they are validated and compiled when the engine is built.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub settings: Table,

    #[serde(default)]
    pub views: Table,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Cost given to role checkers declared without one.
    #[serde(default = "PolicyConfig::default_cost")]
    pub default_cost: u32,

    /// Verdict for requests no rule matched.
    #[serde(default)]
    pub no_opinion: NoOpinionPolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_cost: Self::default_cost(),
            no_opinion: NoOpinionPolicy::default(),
        }
    }
}

impl PolicyConfig {
    fn default_cost() -> u32 {
        DEFAULT_COST
    }
}

impl CommonConfig for Config {
    fn complete(&mut self) -> Result<()> {
        settings::validate(&self.settings).context("settings")?;
        settings::load_roles(&self.settings, &Presets).context("settings")?;
        ViewPermissions::from_table(&self.views).context("views")?;
        Ok(())
    }
}

impl Config {
    const CONFIG_ENV: &'static str = "ROLEGUARD_CONFIG";
    const DEFAULT_PATH: &'static str = "~/.config/roleguard.toml";

    /// Config path from the command line, then `ROLEGUARD_CONFIG`, then the
    /// default location. Shell variables and `~` are expanded.
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_string(),
            None => env::var(Self::CONFIG_ENV).unwrap_or_else(|_| Self::DEFAULT_PATH.to_string()),
        };
        let expanded = shellexpand::full(&path)
            .with_context(|| format!("expand env value for config path '{path}'"))?;
        if expanded.is_empty() {
            bail!("config path cannot be empty");
        }
        Ok(PathBuf::from(expanded.into_owned()))
    }

    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        debug!("Load config from '{}'", path.display());

        let data = fs::read_to_string(&path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        Self::parse(&data).with_context(|| format!("load config file '{}'", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(s).context("parse config toml")?;
        cfg.complete().context("validate config")?;
        Ok(cfg)
    }

    pub fn build_roles(&self) -> Result<Roles<Request>> {
        let roles = settings::load_roles(&self.settings, &Presets).context("load roles")?;
        Ok(roles)
    }

    pub fn build_table(&self) -> Result<LookupTable<Request>> {
        let roles = self.build_roles()?;
        let views = ViewPermissions::from_table(&self.views).context("views")?;
        let table = compiler::compile(&views, &roles, self.policy.default_cost)
            .context("compile view permissions")?;
        Ok(table)
    }

    pub fn build_guard(&self) -> Result<Guard<Request>> {
        let table = self.build_table()?;
        Ok(Guard::new(table, self.policy.no_opinion))
    }
}
