use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use roleguard::config::Config;
use roleguard::guard::GuardError;
use roleguard::request::{Action, Request, UserInfo, ViewCall};

use super::RunCommand;

/// Check whether a request would be allowed to run a view. Prints "allow" or
/// "deny"; the exit code is 1 when denied.
#[derive(Args)]
pub struct CaniArgs {
    /// View identifier to check.
    pub view: String,

    /// Action on a class-style view.
    #[arg(long, short)]
    pub action: Option<Action>,

    /// Request method. Defaults to the action, or get.
    #[arg(long, short)]
    pub method: Option<Action>,

    /// Authenticated user name. Without it the request is anonymous.
    #[arg(long, short)]
    pub user: Option<String>,

    /// Mark the user as administrator.
    #[arg(long)]
    pub admin: bool,

    /// Groups of the user, can be repeated.
    #[arg(long, short)]
    pub group: Vec<String>,

    /// Extra arguments passed to the role checkers.
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl CaniArgs {
    fn build_request(&self) -> Request {
        let user = match self.user.as_ref() {
            Some(name) => UserInfo {
                name: name.clone(),
                is_admin: self.admin,
                is_anonymous: false,
                groups: self.group.clone(),
            },
            None => UserInfo::anonymous(),
        };
        let method = self.method.or(self.action).unwrap_or(Action::Get);
        Request::new(user, method)
    }
}

impl RunCommand for CaniArgs {
    fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let guard = cfg.build_guard()?;
        let req = self.build_request();

        let mut call = ViewCall::new(&self.view).with_args(&self.args);
        if let Some(action) = self.action {
            call = call.with_action(action);
        }

        match guard.check(&req, &call) {
            Ok(()) => {
                println!("allow");
                Ok(ExitCode::SUCCESS)
            }
            Err(GuardError::Denied { .. }) => {
                println!("deny");
                Ok(ExitCode::FAILURE)
            }
            Err(GuardError::Checker(err)) => Err(err.context("evaluate role checkers")),
        }
    }
}
