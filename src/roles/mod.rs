pub mod builtin;
pub mod registry;

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use log::warn;

use crate::request::ViewCall;

/// Cost assigned to checkers registered without an explicit one.
pub const DEFAULT_COST: u32 = 50;

/// A predicate deciding whether a request satisfies a role.
///
/// Checkers may perform blocking work (database lookups and the like), but must
/// not assume anything about the engine state. Errors are propagated to the
/// caller of the evaluation unchanged.
pub trait RoleChecker<R>: Send + Sync {
    fn check(&self, req: &R, call: &ViewCall<'_>) -> Result<bool>;
}

struct FnChecker<F>(F);

impl<R, F> RoleChecker<R> for FnChecker<F>
where
    F: Fn(&R, &ViewCall<'_>) -> Result<bool> + Send + Sync,
{
    fn check(&self, req: &R, call: &ViewCall<'_>) -> Result<bool> {
        (self.0)(req, call)
    }
}

/// Shared handle to a role checker together with its evaluation cost.
///
/// Clones share both the checker and the cost slot. The cost is fixed the
/// first time it is set, either explicitly with [`Checker::with_cost`] or by
/// the registry assigning its default; it never changes afterwards.
pub struct Checker<R> {
    inner: Arc<dyn RoleChecker<R>>,
    cost: Arc<OnceLock<u32>>,
}

impl<R> Checker<R> {
    pub fn new<C>(checker: C) -> Self
    where
        C: RoleChecker<R> + 'static,
    {
        Self {
            inner: Arc::new(checker),
            cost: Arc::new(OnceLock::new()),
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&R, &ViewCall<'_>) -> Result<bool> + Send + Sync + 'static,
        R: 'static,
    {
        Self::new(FnChecker(f))
    }

    /// Builds an infallible checker looking at the request only.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
        R: 'static,
    {
        Self::from_fn(move |req: &R, _call: &ViewCall<'_>| Ok(f(req)))
    }

    /// Tags the checker with an explicit cost. Lower costs are evaluated first.
    ///
    /// The cost slot is shared with every clone. A checker whose cost is
    /// already fixed keeps it and `cost` is ignored.
    pub fn with_cost(self, cost: u32) -> Self {
        if let Err(cost) = self.cost.set(cost) {
            if let Some(fixed) = self.cost() {
                warn!("Ignore cost {cost} for checker already fixed to {fixed}");
            }
        }
        self
    }

    /// The cost, if it has been fixed already.
    pub fn cost(&self) -> Option<u32> {
        self.cost.get().copied()
    }

    /// Fixes the cost to `default` unless it was set before, and returns the
    /// effective cost.
    pub(crate) fn assign_cost(&self, default: u32) -> u32 {
        *self.cost.get_or_init(|| default)
    }

    pub fn check(&self, req: &R, call: &ViewCall<'_>) -> Result<bool> {
        self.inner.check(req, call)
    }

    /// Whether both handles point to the same checker.
    pub fn same(&self, other: &Checker<R>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Clone for Checker<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cost: Arc::clone(&self.cost),
        }
    }
}

impl<R> fmt::Debug for Checker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("cost", &self.cost())
            .finish_non_exhaustive()
    }
}

/// Role name to checker mapping, as handed over by the configuration layer.
pub struct Roles<R> {
    checkers: BTreeMap<String, Checker<R>>,
}

impl<R> Roles<R> {
    pub fn new() -> Self {
        Self {
            checkers: BTreeMap::new(),
        }
    }

    /// Adds a role, replacing any previous checker with the same name.
    pub fn insert(&mut self, name: impl Into<String>, checker: Checker<R>) -> Option<Checker<R>> {
        self.checkers.insert(name.into(), checker)
    }

    pub fn with(mut self, name: impl Into<String>, checker: Checker<R>) -> Self {
        self.insert(name, checker);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Checker<R>> {
        self.checkers.get(name)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Checker<R>> {
        self.checkers.iter()
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl<R> Default for Roles<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Roles<R> {
    fn clone(&self) -> Self {
        Self {
            checkers: self.checkers.clone(),
        }
    }
}

impl<R, S: Into<String>> FromIterator<(S, Checker<R>)> for Roles<R> {
    fn from_iter<I: IntoIterator<Item = (S, Checker<R>)>>(iter: I) -> Self {
        let mut roles = Roles::new();
        for (name, checker) in iter {
            roles.insert(name, checker);
        }
        roles
    }
}

impl<R> fmt::Debug for Roles<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.checkers.iter()).finish()
    }
}
