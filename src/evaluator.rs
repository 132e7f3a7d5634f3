use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::compiler::LookupTable;
use crate::request::ViewCall;

/// Outcome of evaluating the rules of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A matching rule granted access
    Allow,
    /// A matching rule denied access
    Deny,
    /// No rule matched, or the view has no rules at all
    NoOpinion,
}

impl Decision {
    /// Turns the decision into a final verdict, applying `policy` when no rule
    /// matched.
    pub fn resolve(self, policy: NoOpinionPolicy) -> bool {
        match self {
            Decision::Allow => true,
            Decision::Deny => false,
            Decision::NoOpinion => matches!(policy, NoOpinionPolicy::Allow),
        }
    }
}

impl From<bool> for Decision {
    fn from(granted: bool) -> Self {
        if granted {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// What to do with requests no rule has an opinion about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoOpinionPolicy {
    #[default]
    Deny,
    Allow,
}

/// Evaluates the rules compiled for `view_id` in cost order.
///
/// The first checker returning true ends the evaluation with its rule's
/// polarity. Checker errors are returned as they are; they never count as a
/// match or a miss.
pub fn decide<R>(
    lookup: &LookupTable<R>,
    view_id: &str,
    req: &R,
    call: &ViewCall<'_>,
) -> Result<Decision> {
    let Some(rules) = lookup.get(view_id) else {
        return Ok(Decision::NoOpinion);
    };

    for rule in rules {
        if rule.checker.check(req, call)? {
            debug!(
                "Role '{}' matched view '{view_id}', granted: {}",
                rule.role, rule.granted
            );
            return Ok(Decision::from(rule.granted));
        }
    }

    Ok(Decision::NoOpinion)
}

impl<R> LookupTable<R> {
    /// See [`decide`].
    pub fn decide(&self, view_id: &str, req: &R, call: &ViewCall<'_>) -> Result<Decision> {
        decide(self, view_id, req, call)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::bail;

    use crate::compiler::{compile, Permissions, ViewPermissions};
    use crate::roles::{Checker, Roles};

    use super::*;

    struct Req {
        anonymous: bool,
        admin: bool,
    }

    fn table(roles: Roles<Req>, permissions: Permissions) -> LookupTable<Req> {
        let views = ViewPermissions::new().view("v1", permissions);
        compile(&views, &roles, 50).unwrap()
    }

    #[test]
    fn test_unknown_view() {
        let lookup = LookupTable::<Req>::empty();
        let req = Req {
            anonymous: true,
            admin: false,
        };
        let result = decide(&lookup, "v2", &req, &ViewCall::new("v2")).unwrap();
        assert_eq!(result, Decision::NoOpinion);
    }

    #[test]
    fn test_no_match() {
        let roles = Roles::new()
            .with("anon", Checker::predicate(|r: &Req| r.anonymous))
            .with("admin", Checker::predicate(|r: &Req| r.admin));
        let lookup = table(roles, Permissions::new().grant("admin", true).grant("anon", false));

        let req = Req {
            anonymous: false,
            admin: false,
        };
        let result = lookup.decide("v1", &req, &ViewCall::new("v1")).unwrap();
        assert_eq!(result, Decision::NoOpinion);
    }

    #[test]
    fn test_first_match_wins() {
        let roles = Roles::new()
            .with("anon", Checker::predicate(|r: &Req| r.anonymous).with_cost(5))
            .with("admin", Checker::predicate(|r: &Req| r.admin).with_cost(10));
        let lookup = table(roles, Permissions::new().grant("admin", true).grant("anon", false));

        // Both roles match, the cheaper deny rule is evaluated first.
        let req = Req {
            anonymous: true,
            admin: true,
        };
        let result = lookup.decide("v1", &req, &ViewCall::new("v1")).unwrap();
        assert_eq!(result, Decision::Deny);

        let req = Req {
            anonymous: false,
            admin: true,
        };
        let result = lookup.decide("v1", &req, &ViewCall::new("v1")).unwrap();
        assert_eq!(result, Decision::Allow);
    }

    #[test]
    fn test_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expensive = Checker::from_fn(move |_: &Req, _: &ViewCall<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
        .with_cost(100);
        let roles = Roles::new()
            .with("cheap", Checker::predicate(|r: &Req| r.admin).with_cost(1))
            .with("expensive", expensive);
        let lookup = table(
            roles,
            Permissions::new().grant("expensive", false).grant("cheap", true),
        );

        let admin = Req {
            anonymous: false,
            admin: true,
        };
        assert_eq!(
            lookup.decide("v1", &admin, &ViewCall::new("v1")).unwrap(),
            Decision::Allow
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0, "Expensive checker skipped");

        let user = Req {
            anonymous: false,
            admin: false,
        };
        assert_eq!(
            lookup.decide("v1", &user, &ViewCall::new("v1")).unwrap(),
            Decision::Deny
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_checker_error() {
        let broken = Checker::from_fn(|_: &Req, _: &ViewCall<'_>| -> Result<bool> {
            bail!("database unavailable")
        })
        .with_cost(1);
        let roles = Roles::new()
            .with("broken", broken)
            .with("anon", Checker::predicate(|r: &Req| r.anonymous).with_cost(2));
        let lookup = table(roles, Permissions::new().grant("anon", true).grant("broken", true));

        let req = Req {
            anonymous: true,
            admin: false,
        };
        let err = lookup.decide("v1", &req, &ViewCall::new("v1")).unwrap_err();
        assert_eq!(err.to_string(), "database unavailable");
    }

    #[test]
    fn test_checker_sees_call() {
        let owner = Checker::from_fn(|_: &Req, call: &ViewCall<'_>| {
            Ok(call.view == "v1" && call.args.first().map(String::as_str) == Some("42"))
        });
        let lookup = table(Roles::new().with("owner", owner), Permissions::new().grant("owner", true));

        let req = Req {
            anonymous: false,
            admin: false,
        };
        let args = vec!["42".to_string()];
        let call = ViewCall::new("v1").with_args(&args);
        assert_eq!(lookup.decide("v1", &req, &call).unwrap(), Decision::Allow);
        assert_eq!(
            lookup.decide("v1", &req, &ViewCall::new("v1")).unwrap(),
            Decision::NoOpinion
        );
    }

    #[test]
    fn test_resolve() {
        assert!(Decision::Allow.resolve(NoOpinionPolicy::Deny));
        assert!(!Decision::Deny.resolve(NoOpinionPolicy::Allow));
        assert!(!Decision::NoOpinion.resolve(NoOpinionPolicy::Deny));
        assert!(Decision::NoOpinion.resolve(NoOpinionPolicy::Allow));
        assert_eq!(NoOpinionPolicy::default(), NoOpinionPolicy::Deny);
    }
}
