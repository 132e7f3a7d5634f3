use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Action names recognized on class-style views. Function-style views have
/// no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Get,
        Action::Post,
        Action::Put,
        Action::Patch,
        Action::Delete,
        Action::Head,
        Action::Options,
        Action::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Post => "post",
            Action::Put => "put",
            Action::Patch => "patch",
            Action::Delete => "delete",
            Action::Head => "head",
            Action::Options => "options",
            Action::Trace => "trace",
        }
    }

    /// Safe actions do not modify server state.
    pub fn is_safe(self) -> bool {
        matches!(
            self,
            Action::Get | Action::Head | Action::Options | Action::Trace
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        for action in Action::ALL {
            if action.as_str() == lower {
                return Ok(action);
            }
        }
        bail!("unknown action '{s}'")
    }
}

/// Identity attached to a request by the authentication layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// User identifier
    pub name: String,
    /// Whether the user has administrator privileges
    #[serde(default)]
    pub is_admin: bool,
    /// Whether this is an anonymous user
    #[serde(default)]
    pub is_anonymous: bool,
    /// Groups the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn anonymous() -> Self {
        Self {
            name: String::from("anonymous"),
            is_admin: false,
            is_anonymous: true,
            groups: vec![],
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The request type understood by the built-in role checkers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user: UserInfo,
    pub method: Action,
}

impl Request {
    pub fn new(user: UserInfo, method: Action) -> Self {
        Self { user, method }
    }
}

/// The view being invoked, passed to every role checker next to the request.
#[derive(Debug, Clone, Copy)]
pub struct ViewCall<'a> {
    /// Identifier of the view (without the action suffix)
    pub view: &'a str,
    /// Action on a class-style view, `None` for function-style views
    pub action: Option<Action>,
    /// Extra positional arguments captured by the router
    pub args: &'a [String],
}

impl<'a> ViewCall<'a> {
    pub fn new(view: &'a str) -> Self {
        Self {
            view,
            action: None,
            args: &[],
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_args(mut self, args: &'a [String]) -> Self {
        self.args = args;
        self
    }
}
