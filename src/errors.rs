use thiserror::Error;

/// Errors raised while validating settings, registering roles or compiling
/// view permissions. All of them are fatal: no lookup table is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Misconfigured {
    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("Missing required setting '{0}'")]
    MissingSetting(String),

    #[error("Role '{0}' found in view_permissions but such role not defined in ROLES")]
    UndefinedRole(String),

    #[error("ROLES must be a table of role checkers or a preset name, got {0}")]
    InvalidRoles(String),

    #[error("Unknown roles preset '{0}'")]
    UnknownPreset(String),

    #[error("Invalid checker for role '{role}': {reason}")]
    InvalidChecker { role: String, reason: String },

    #[error("Permission of role '{role}' in view '{view}' must be a boolean")]
    InvalidGrant { view: String, role: String },

    #[error("Permissions of view '{0}' must be a table of role names")]
    InvalidView(String),

    #[error("View '{0}' declared more than once")]
    DuplicateView(String),

    #[error("Role '{role}' declared more than once for view '{view}'")]
    DuplicateRule { view: String, role: String },
}
