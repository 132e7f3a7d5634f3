pub mod table;

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::compiler::LookupTable;
use crate::evaluator::NoOpinionPolicy;
use crate::request::{Action, ViewCall};

use table::SharedTable;

/// How a routed view handles requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    /// One handler per implemented action
    Class(Vec<Action>),
    /// A single handler for every request
    Function,
}

/// A view as enumerated by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub view: String,
    pub kind: ViewKind,
}

impl Route {
    pub fn function(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            kind: ViewKind::Function,
        }
    }

    /// Builds a class-style route from the method names the view implements.
    /// Names that are not recognized actions are not intercepted.
    pub fn class<I, S>(view: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let view = view.into();
        let mut actions = Vec::new();
        for method in methods {
            let method = method.as_ref();
            match method.parse::<Action>() {
                Ok(action) if !actions.contains(&action) => actions.push(action),
                Ok(_) => {}
                Err(_) => debug!("Skip method '{method}' of view '{view}', not an action"),
            }
        }
        Self {
            view,
            kind: ViewKind::Class(actions),
        }
    }
}

/// Errors returned by a guarded call instead of running the handler.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("permission denied for view '{view}'{}", describe_action(.action))]
    Denied {
        view: String,
        action: Option<Action>,
    },

    /// A role checker failed; the request could not be authorized.
    #[error(transparent)]
    Checker(#[from] anyhow::Error),
}

fn describe_action(action: &Option<Action>) -> String {
    match action {
        Some(action) => format!(" (action '{action}')"),
        None => String::new(),
    }
}

/// Runs the authorization check before view handlers.
///
/// The guard owns the current lookup table; [`Guard::reload`] swaps it
/// without disturbing checks already in progress.
pub struct Guard<R> {
    table: SharedTable<R>,
    policy: NoOpinionPolicy,
}

impl<R> Guard<R> {
    pub fn new(table: LookupTable<R>, policy: NoOpinionPolicy) -> Self {
        Self {
            table: SharedTable::new(table),
            policy,
        }
    }

    pub fn policy(&self) -> NoOpinionPolicy {
        self.policy
    }

    /// Snapshot of the current lookup table.
    pub fn table(&self) -> Arc<LookupTable<R>> {
        self.table.load()
    }

    pub fn reload(&self, table: LookupTable<R>) {
        let views = table.len();
        self.table.swap(table);
        info!("Reloaded lookup table with {views} view(s)");
    }

    /// Table key for a call: `<view>.<action>` when the table has rules for
    /// that action, the bare view identifier otherwise.
    pub fn lookup_key(table: &LookupTable<R>, view: &str, action: Option<Action>) -> String {
        if let Some(action) = action {
            let key = format!("{view}.{action}");
            if table.contains(&key) {
                return key;
            }
        }
        view.to_string()
    }

    /// Authorizes `req` for `call`, resolving "no opinion" with the guard's
    /// policy.
    pub fn check(&self, req: &R, call: &ViewCall<'_>) -> Result<(), GuardError> {
        let table = self.table.load();
        let key = Self::lookup_key(&table, call.view, call.action);

        let decision = table.decide(&key, req, call)?;
        if decision.resolve(self.policy) {
            return Ok(());
        }

        warn!("Permission denied for '{key}', decision: {decision:?}");
        Err(GuardError::Denied {
            view: call.view.to_string(),
            action: call.action,
        })
    }

    /// Builds one hook per interceptable entry point: every action of a
    /// class-style view, or the single handler of a function-style view.
    pub fn hooks(&self, routes: &[Route]) -> Vec<Hook> {
        let mut hooks = Vec::new();
        for route in routes {
            match &route.kind {
                ViewKind::Function => hooks.push(Hook {
                    view: route.view.clone(),
                    action: None,
                }),
                ViewKind::Class(actions) => {
                    if actions.is_empty() {
                        warn!("View '{}' has no action to guard", route.view);
                    }
                    for action in actions {
                        hooks.push(Hook {
                            view: route.view.clone(),
                            action: Some(*action),
                        });
                    }
                }
            }
        }
        debug!("Built {} hook(s) for {} route(s)", hooks.len(), routes.len());
        hooks
    }
}

/// Pre-call hook for one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    view: String,
    action: Option<Action>,
}

impl Hook {
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    /// Checks `req` against the guard, then runs `handler`. The handler is not
    /// invoked when the request is denied or a checker fails.
    pub fn run<R, T, F>(
        &self,
        guard: &Guard<R>,
        req: &R,
        args: &[String],
        handler: F,
    ) -> Result<T, GuardError>
    where
        F: FnOnce(&R, &[String]) -> T,
    {
        let call = ViewCall {
            view: &self.view,
            action: self.action,
            args,
        };
        guard.check(req, &call)?;
        Ok(handler(req, args))
    }
}
