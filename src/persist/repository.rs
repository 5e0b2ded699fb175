use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::{
    error::{Error::Persist, Result},
    fmt_err,
};

/// Hierarchical key/value store; keys are `/`-separated paths.
pub trait PersistRepository: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Names of the direct children of `key`, sorted.
    fn get_children_keys(&self, key: &str) -> Result<Vec<String>>;

    fn persist(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key` and everything below it.
    fn delete(&self, key: &str) -> Result<()>;

    fn close(&self);
}

/// Repository kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryPersistRepository {
    entries: RwLock<BTreeMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryPersistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While unavailable every call fails, as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Persist(fmt_err!("memory repository is unavailable")));
        }
        Ok(())
    }
}

impl PersistRepository for MemoryPersistRepository {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn get_children_keys(&self, key: &str) -> Result<Vec<String>> {
        self.check_available()?;
        let prefix = format!("{}/", key.trim_end_matches('/'));
        let children: BTreeSet<String> = self
            .entries
            .read()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .map(|child| child.to_owned())
            .collect();
        Ok(children.into_iter().collect())
    }

    fn persist(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_available()?;
        let prefix = format!("{}/", key.trim_end_matches('/'));
        self.entries
            .write()
            .retain(|k, _| k != key && !k.starts_with(&prefix));
        Ok(())
    }

    fn close(&self) {}
}
