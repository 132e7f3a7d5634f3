use log::debug;
use toml::{Table, Value};

use crate::errors::Misconfigured;
use crate::request::Request;
use crate::roles::builtin::{self, CheckerSpec};
use crate::roles::Roles;

/// Key holding the role definitions.
pub const ROLES: &str = "ROLES";

const VALID_SETTINGS: [&str; 1] = [ROLES];
const REQUIRED_SETTINGS: [&str; 1] = [ROLES];

/// Checks the raw settings table for unknown and missing keys.
pub fn validate(settings: &Table) -> Result<(), Misconfigured> {
    for key in settings.keys() {
        if !VALID_SETTINGS.contains(&key.as_str()) {
            return Err(Misconfigured::UnknownSetting(key.clone()));
        }
    }
    for required in REQUIRED_SETTINGS {
        if !settings.contains_key(required) {
            return Err(Misconfigured::MissingSetting(required.to_string()));
        }
    }
    Ok(())
}

/// Resolves a string `ROLES` reference to a concrete role mapping.
pub trait RoleResolver<R> {
    fn resolve(&self, name: &str) -> Option<Roles<R>>;
}

/// Resolver for the role sets shipped with the crate.
pub struct Presets;

impl RoleResolver<Request> for Presets {
    fn resolve(&self, name: &str) -> Option<Roles<Request>> {
        builtin::preset(name)
    }
}

/// Validates `settings` and builds the roles it declares, either inline or
/// through `resolver`.
pub fn load_roles(
    settings: &Table,
    resolver: &dyn RoleResolver<Request>,
) -> Result<Roles<Request>, Misconfigured> {
    validate(settings)?;

    match settings.get(ROLES) {
        Some(Value::String(name)) => {
            debug!("Resolve ROLES from preset '{name}'");
            resolver
                .resolve(name)
                .ok_or_else(|| Misconfigured::UnknownPreset(name.clone()))
        }
        Some(Value::Table(table)) => {
            let mut roles = Roles::new();
            for (name, value) in table.iter() {
                let spec: CheckerSpec = value.clone().try_into().map_err(|err: toml::de::Error| {
                    Misconfigured::InvalidChecker {
                        role: name.clone(),
                        reason: err.message().trim().to_string(),
                    }
                })?;
                roles.insert(name.clone(), spec.build(name)?);
            }
            Ok(roles)
        }
        Some(other) => Err(Misconfigured::InvalidRoles(other.type_str().to_string())),
        None => Err(Misconfigured::MissingSetting(ROLES.to_string())),
    }
}
