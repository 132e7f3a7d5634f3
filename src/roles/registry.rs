use std::collections::BTreeMap;

use log::{debug, warn};

use super::{Checker, Roles};

/// A role resolved for compilation: its name, checker and effective cost.
#[derive(Debug)]
pub struct RoleRecord<R> {
    pub role_name: String,
    pub role_checker: Checker<R>,
    pub role_checker_cost: u32,
}

/// Normalized view of a [`Roles`] mapping. Only consulted while compiling
/// view permissions.
#[derive(Debug)]
pub struct Registry<R> {
    records: BTreeMap<String, RoleRecord<R>>,
}

impl<R> Registry<R> {
    /// Builds one record per role. Checkers without a cost get `default_cost`,
    /// and keep it for every later registration.
    pub fn register(roles: &Roles<R>, default_cost: u32) -> Self {
        if roles.is_empty() {
            warn!("No roles defined, every view permission will be rejected");
        }

        let mut records = BTreeMap::new();
        for (name, checker) in roles.iter() {
            let cost = checker.assign_cost(default_cost);
            debug!("Register role '{name}' with cost {cost}");
            records.insert(
                name.clone(),
                RoleRecord {
                    role_name: name.clone(),
                    role_checker: checker.clone(),
                    role_checker_cost: cost,
                },
            );
        }

        Self { records }
    }

    pub fn get(&self, name: &str) -> Option<&RoleRecord<R>> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::roles::DEFAULT_COST;

    use super::*;

    #[test]
    fn test_register() {
        let roles = Roles::new()
            .with("admin", Checker::predicate(|n: &u32| *n > 100).with_cost(10))
            .with("anyone", Checker::predicate(|_: &u32| true));

        let registry = Registry::register(&roles, DEFAULT_COST);
        assert_eq!(registry.len(), 2);

        let admin = registry.get("admin").unwrap();
        assert_eq!(admin.role_name, "admin");
        assert_eq!(admin.role_checker_cost, 10);

        let anyone = registry.get("anyone").unwrap();
        assert_eq!(anyone.role_checker_cost, DEFAULT_COST);
        assert_eq!(
            roles.get("anyone").unwrap().cost(),
            Some(DEFAULT_COST),
            "Default cost should stick to the checker"
        );

        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_register_idempotent() {
        let checker = Checker::predicate(|_: &u32| true);
        let roles = Roles::new().with("anyone", checker.clone());

        let first = Registry::register(&roles, 7);
        assert_eq!(first.get("anyone").unwrap().role_checker_cost, 7);

        // A changed default must not affect an already registered checker,
        // even when it shows up under another role name.
        let again = Roles::new().with("everyone", checker.clone());
        let second = Registry::register(&again, 99);
        assert_eq!(second.get("everyone").unwrap().role_checker_cost, 7);
        assert_eq!(checker.cost(), Some(7));
    }

    #[test]
    fn test_register_empty() {
        let registry = Registry::<u32>::register(&Roles::new(), DEFAULT_COST);
        assert!(registry.is_empty());
    }
}
