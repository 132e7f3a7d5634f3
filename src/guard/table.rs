use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::compiler::LookupTable;

/// Holds the current lookup table and replaces it atomically.
///
/// Readers take a snapshot ([`SharedTable::load`]) without locking and keep
/// evaluating against it even if the table is swapped while they run.
pub struct SharedTable<R> {
    current: ArcSwap<LookupTable<R>>,
}

impl<R> SharedTable<R> {
    pub fn new(table: LookupTable<R>) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    #[inline]
    pub fn load(&self) -> Arc<LookupTable<R>> {
        self.current.load_full()
    }

    /// Installs `table` and returns the previous one.
    pub fn swap(&self, table: LookupTable<R>) -> Arc<LookupTable<R>> {
        self.current.swap(Arc::new(table))
    }
}
