use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use crate::{ContractDescription, ContractError};

/// Memoized contract descriptions, keyed by root type.
///
/// Entries are built at most once and never evicted. Failed analyses are not
/// cached. The map lock is only held to find or insert a slot; building runs
/// under the slot's own lock, so readers of finished entries never wait on
/// an analysis in progress.
#[derive(Debug, Default)]
pub struct ContractCache {
    entries: RwLock<HashMap<String, Arc<Slot>>>,
}

#[derive(Debug, Default)]
struct Slot {
    value: OnceLock<Arc<ContractDescription>>,
    building: Mutex<()>,
}

impl ContractCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<ContractDescription>> {
        self.slot(key)?.value.get().cloned()
    }

    /// Return the entry for `key`, running `build` if it is missing.
    ///
    /// Concurrent callers for the same key wait for the first builder and
    /// receive its result; callers for other keys are not held up.
    pub fn get_or_try_insert_with(
        &self,
        key: &str,
        build: impl FnOnce() -> Result<ContractDescription, ContractError>,
    ) -> Result<Arc<ContractDescription>, ContractError> {
        if let Some(found) = self.get(key) {
            return Ok(found);
        }

        let slot = {
            let mut entries = self
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key.to_string()).or_default())
        };

        let _building = slot
            .building
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = slot.value.get() {
            return Ok(Arc::clone(found));
        }
        let built = Arc::new(build()?);
        Ok(Arc::clone(slot.value.get_or_init(|| built)))
    }

    /// Number of finished entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.value.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Option<Arc<Slot>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}
