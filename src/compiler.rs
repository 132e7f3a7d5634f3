use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;
use serde::Serialize;
use toml::{Table, Value};

use crate::errors::Misconfigured;
use crate::roles::registry::Registry;
use crate::roles::{Checker, Roles};

/// Role grants declared for one view, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    grants: Vec<(String, bool)>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `granted = true` allows the request when the role matches, `false`
    /// denies it.
    pub fn grant(mut self, role: impl Into<String>, granted: bool) -> Self {
        self.grants.push((role.into(), granted));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.grants.iter().map(|(role, granted)| (role.as_str(), *granted))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for Permissions {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().map(|(r, g)| (r.into(), g)).collect(),
        }
    }
}

/// Permissions of every view, keyed by view identifier.
#[derive(Debug, Clone, Default)]
pub struct ViewPermissions {
    views: Vec<(String, Permissions)>,
}

impl ViewPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: impl Into<String>, permissions: Permissions) {
        self.views.push((view.into(), permissions));
    }

    pub fn view(mut self, view: impl Into<String>, permissions: Permissions) -> Self {
        self.insert(view, permissions);
        self
    }

    /// Reads a `[views]` table: view identifier to a table of role name to
    /// boolean.
    pub fn from_table(table: &Table) -> Result<Self, Misconfigured> {
        let mut views = Self::new();
        for (view, value) in table.iter() {
            let Value::Table(grants) = value else {
                return Err(Misconfigured::InvalidView(view.clone()));
            };
            let mut permissions = Permissions::new();
            for (role, granted) in grants.iter() {
                let Value::Boolean(granted) = granted else {
                    return Err(Misconfigured::InvalidGrant {
                        view: view.clone(),
                        role: role.clone(),
                    });
                };
                permissions = permissions.grant(role.clone(), *granted);
            }
            views.insert(view.clone(), permissions);
        }
        Ok(views)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Permissions)> {
        self.views.iter().map(|(view, p)| (view.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// A compiled permission rule: when `checker` matches, the decision is
/// `granted`.
pub struct Rule<R> {
    pub granted: bool,
    /// Name of the role the rule came from, kept for diagnostics.
    pub role: String,
    pub cost: u32,
    pub checker: Checker<R>,
}

impl<R> fmt::Debug for Rule<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("granted", &self.granted)
            .field("role", &self.role)
            .field("cost", &self.cost)
            .finish()
    }
}

/// View identifier to rule list, each list sorted by ascending checker cost.
/// Read-only once compiled.
pub struct LookupTable<R> {
    views: HashMap<String, Vec<Rule<R>>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuleSummary {
    pub role: String,
    pub granted: bool,
    pub cost: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ViewSummary {
    pub view: String,
    pub rules: Vec<RuleSummary>,
}

impl<R> LookupTable<R> {
    pub fn empty() -> Self {
        Self {
            views: HashMap::new(),
        }
    }

    pub fn get(&self, view: &str) -> Option<&[Rule<R>]> {
        self.views.get(view).map(Vec::as_slice)
    }

    pub fn contains(&self, view: &str) -> bool {
        self.views.contains_key(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Serializable description of the table, sorted by view identifier.
    pub fn summary(&self) -> Vec<ViewSummary> {
        let mut views: Vec<_> = self
            .views
            .iter()
            .map(|(view, rules)| ViewSummary {
                view: view.clone(),
                rules: rules
                    .iter()
                    .map(|rule| RuleSummary {
                        role: rule.role.clone(),
                        granted: rule.granted,
                        cost: rule.cost,
                    })
                    .collect(),
            })
            .collect();
        views.sort_by(|a, b| a.view.cmp(&b.view));
        views
    }
}

impl<R> fmt::Debug for LookupTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.views.iter()).finish()
    }
}

/// Compiles view permissions into a lookup table.
///
/// Every role referenced by a view must be defined in `roles`; otherwise the
/// whole compilation fails, no table is produced and no checker cost is
/// touched. Rules of a view are
/// stable-sorted by checker cost, so equal costs keep declaration order.
/// Checkers without a cost are fixed to `default_cost`.
pub fn compile<R>(
    view_permissions: &ViewPermissions,
    roles: &Roles<R>,
    default_cost: u32,
) -> Result<LookupTable<R>, Misconfigured> {
    let mut seen_views = HashSet::new();
    for (view, permissions) in view_permissions.iter() {
        if !seen_views.insert(view) {
            return Err(Misconfigured::DuplicateView(view.to_string()));
        }
        let mut seen_roles = HashSet::new();
        for (role, _) in permissions.iter() {
            if !seen_roles.insert(role) {
                return Err(Misconfigured::DuplicateRule {
                    view: view.to_string(),
                    role: role.to_string(),
                });
            }
        }
    }

    for (_, permissions) in view_permissions.iter() {
        for (role, _) in permissions.iter() {
            if roles.get(role).is_none() {
                return Err(Misconfigured::UndefinedRole(role.to_string()));
            }
        }
    }

    let registry = Registry::register(roles, default_cost);

    let mut views = HashMap::with_capacity(view_permissions.len());
    for (view, permissions) in view_permissions.iter() {
        let mut rules = Vec::with_capacity(permissions.len());
        for (role, granted) in permissions.iter() {
            let Some(record) = registry.get(role) else {
                return Err(Misconfigured::UndefinedRole(role.to_string()));
            };
            rules.push(Rule {
                granted,
                role: record.role_name.clone(),
                cost: record.role_checker_cost,
                checker: record.role_checker.clone(),
            });
        }
        rules.sort_by_key(|rule| rule.cost);
        views.insert(view.to_string(), rules);
    }

    debug!(
        "Compiled {} view(s) against {} role(s)",
        views.len(),
        registry.len()
    );
    Ok(LookupTable { views })
}
