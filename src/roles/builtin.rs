use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::Misconfigured;
use crate::request::{Action, Request, ViewCall};

use super::{Checker, RoleChecker, Roles};

/// Kinds of checkers that can be declared in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerKind {
    /// Matches unauthenticated requests
    Anonymous,
    /// Matches any authenticated request
    Authenticated,
    /// Matches administrators
    Admin,
    /// Matches users listed in `names`
    User,
    /// Matches users belonging to one of `groups`
    Group,
    /// Matches requests whose method is listed in `methods`
    Method,
    /// Matches get, head, options and trace requests
    SafeMethod,
}

/// Declarative role checker, as found under `[settings.ROLES.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerSpec {
    pub kind: CheckerKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Action>,

    /// Explicit evaluation cost. Checkers without one get the default cost
    /// when registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
}

enum BuiltinChecker {
    Anonymous,
    Authenticated,
    Admin,
    User(Vec<String>),
    Group(Vec<String>),
    Method(Vec<Action>),
    SafeMethod,
}

impl RoleChecker<Request> for BuiltinChecker {
    fn check(&self, req: &Request, _call: &ViewCall<'_>) -> Result<bool> {
        let user = &req.user;
        Ok(match self {
            BuiltinChecker::Anonymous => user.is_anonymous,
            BuiltinChecker::Authenticated => !user.is_anonymous,
            BuiltinChecker::Admin => user.is_admin && !user.is_anonymous,
            BuiltinChecker::User(names) => !user.is_anonymous && names.contains(&user.name),
            BuiltinChecker::Group(groups) => {
                !user.is_anonymous && user.groups.iter().any(|g| groups.contains(g))
            }
            BuiltinChecker::Method(methods) => methods.contains(&req.method),
            BuiltinChecker::SafeMethod => req.method.is_safe(),
        })
    }
}

impl CheckerSpec {
    pub fn new(kind: CheckerKind) -> Self {
        Self {
            kind,
            names: vec![],
            groups: vec![],
            methods: vec![],
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Validates the declaration and turns it into a checker for `role`.
    pub fn build(&self, role: &str) -> Result<Checker<Request>, Misconfigured> {
        let invalid = |reason: String| Misconfigured::InvalidChecker {
            role: role.to_string(),
            reason,
        };

        let uses_names = matches!(self.kind, CheckerKind::User);
        let uses_groups = matches!(self.kind, CheckerKind::Group);
        let uses_methods = matches!(self.kind, CheckerKind::Method);
        for (field, set, used) in [
            ("names", !self.names.is_empty(), uses_names),
            ("groups", !self.groups.is_empty(), uses_groups),
            ("methods", !self.methods.is_empty(), uses_methods),
        ] {
            if used && !set {
                return Err(invalid(format!("kind '{}' requires '{field}'", self.kind_name())));
            }
            if set && !used {
                return Err(invalid(format!(
                    "field '{field}' is not used by kind '{}'",
                    self.kind_name()
                )));
            }
        }

        let builtin = match self.kind {
            CheckerKind::Anonymous => BuiltinChecker::Anonymous,
            CheckerKind::Authenticated => BuiltinChecker::Authenticated,
            CheckerKind::Admin => BuiltinChecker::Admin,
            CheckerKind::User => BuiltinChecker::User(self.names.clone()),
            CheckerKind::Group => BuiltinChecker::Group(self.groups.clone()),
            CheckerKind::Method => BuiltinChecker::Method(self.methods.clone()),
            CheckerKind::SafeMethod => BuiltinChecker::SafeMethod,
        };

        let checker = Checker::new(builtin);
        Ok(match self.cost {
            Some(cost) => checker.with_cost(cost),
            None => checker,
        })
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            CheckerKind::Anonymous => "anonymous",
            CheckerKind::Authenticated => "authenticated",
            CheckerKind::Admin => "admin",
            CheckerKind::User => "user",
            CheckerKind::Group => "group",
            CheckerKind::Method => "method",
            CheckerKind::SafeMethod => "safe_method",
        }
    }
}

/// Name of the preset used when `ROLES` is given as a string.
pub const DEFAULT_PRESET: &str = "default";

/// Built-in role sets that `ROLES` can refer to by name.
pub fn preset(name: &str) -> Option<Roles<Request>> {
    if name != DEFAULT_PRESET {
        return None;
    }

    let roles = [
        ("anonymous", BuiltinChecker::Anonymous),
        ("authenticated", BuiltinChecker::Authenticated),
        ("admin", BuiltinChecker::Admin),
        ("safe_method", BuiltinChecker::SafeMethod),
    ];
    Some(
        roles
            .into_iter()
            .map(|(name, checker)| (name, Checker::new(checker)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use crate::request::UserInfo;

    use super::*;

    fn check(spec: &CheckerSpec, req: &Request) -> bool {
        let checker = spec.build("test").unwrap();
        checker.check(req, &ViewCall::new("view")).unwrap()
    }

    #[test]
    fn test_identity_kinds() {
        let anon = Request::new(UserInfo::anonymous(), Action::Get);
        let mut admin_user = UserInfo::new("root");
        admin_user.is_admin = true;
        let admin = Request::new(admin_user, Action::Post);
        let alice = Request::new(UserInfo::new("alice"), Action::Delete);

        let spec = CheckerSpec::new(CheckerKind::Anonymous);
        assert!(check(&spec, &anon));
        assert!(!check(&spec, &alice));

        let spec = CheckerSpec::new(CheckerKind::Authenticated);
        assert!(!check(&spec, &anon));
        assert!(check(&spec, &alice));

        let spec = CheckerSpec::new(CheckerKind::Admin);
        assert!(check(&spec, &admin));
        assert!(!check(&spec, &alice));

        let mut spec = CheckerSpec::new(CheckerKind::User);
        spec.names = vec!["alice".to_string()];
        assert!(check(&spec, &alice));
        assert!(!check(&spec, &admin));
    }

    #[test]
    fn test_group_and_method_kinds() {
        let mut user = UserInfo::new("bob");
        user.groups = vec!["staff".to_string()];
        let staff_get = Request::new(user.clone(), Action::Get);
        let staff_put = Request::new(user, Action::Put);

        let mut spec = CheckerSpec::new(CheckerKind::Group);
        spec.groups = vec!["staff".to_string(), "ops".to_string()];
        assert!(check(&spec, &staff_get));

        let mut spec = CheckerSpec::new(CheckerKind::Method);
        spec.methods = vec![Action::Put, Action::Patch];
        assert!(check(&spec, &staff_put));
        assert!(!check(&spec, &staff_get));

        let spec = CheckerSpec::new(CheckerKind::SafeMethod);
        assert!(check(&spec, &staff_get));
        assert!(!check(&spec, &staff_put));
    }

    #[test]
    fn test_build_validation() {
        let err = CheckerSpec::new(CheckerKind::User).build("editors").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid checker for role 'editors': kind 'user' requires 'names'"
        );

        let mut spec = CheckerSpec::new(CheckerKind::Admin);
        spec.groups = vec!["staff".to_string()];
        let err = spec.build("admin").unwrap_err();
        assert!(matches!(err, Misconfigured::InvalidChecker { .. }));

        let checker = CheckerSpec::new(CheckerKind::Admin)
            .with_cost(3)
            .build("admin")
            .unwrap();
        assert_eq!(checker.cost(), Some(3));
    }

    #[test]
    fn test_parse_spec() {
        let spec: CheckerSpec = toml::from_str(
            r#"
            kind = "method"
            methods = ["get", "head"]
            cost = 1
            "#,
        )
        .unwrap();
        assert_eq!(spec.kind, CheckerKind::Method);
        assert_eq!(spec.methods, vec![Action::Get, Action::Head]);
        assert_eq!(spec.cost, Some(1));

        let result = toml::from_str::<CheckerSpec>("kind = \"admin\"\nlevel = 3");
        assert!(result.is_err(), "Unknown fields should be rejected");
    }

    #[test]
    fn test_preset() {
        let roles = preset(DEFAULT_PRESET).unwrap();
        let names: Vec<_> = roles.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["admin", "anonymous", "authenticated", "safe_method"]
        );
        assert!(preset("unknown").is_none());
    }
}
