use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::{
    catalog::resource::Resource,
    rule::transaction::{TransactionRule, TransactionType},
};

/// Transaction manager of one database, bound to the pools it was built over.
#[derive(Debug)]
pub struct TransactionManagerEngine {
    database_name: String,
    transaction_type: TransactionType,
    data_source_names: Vec<String>,
    closed: AtomicBool,
}

impl TransactionManagerEngine {
    pub fn new(database_name: &str, resource: &Resource, rule: Option<&TransactionRule>) -> Self {
        let transaction_type = rule
            .map(|rule| rule.default_type())
            .unwrap_or(TransactionType::Local);
        debug!(
            "init {:?} transaction engine of {database_name} over {:?}",
            transaction_type,
            resource.data_source_names()
        );
        Self {
            database_name: database_name.to_owned(),
            transaction_type,
            data_source_names: resource.data_source_names(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("close transaction engine of {}", self.database_name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Database name => live transaction engine.
#[derive(Debug, Clone, Default)]
pub struct TransactionContexts {
    engines: HashMap<String, Arc<TransactionManagerEngine>>,
}

impl TransactionContexts {
    pub fn get(&self, database_name: &str) -> Option<&Arc<TransactionManagerEngine>> {
        self.engines.get(&database_name.to_lowercase())
    }

    /// Returns the engine replaced, if any; the caller closes it.
    pub fn put(&mut self, engine: TransactionManagerEngine) -> Option<Arc<TransactionManagerEngine>> {
        self.engines
            .insert(engine.database_name.to_lowercase(), Arc::new(engine))
    }

    pub fn remove(&mut self, database_name: &str) -> Option<Arc<TransactionManagerEngine>> {
        self.engines.remove(&database_name.to_lowercase())
    }

    pub fn engines(&self) -> &HashMap<String, Arc<TransactionManagerEngine>> {
        &self.engines
    }

    pub fn close(&self) {
        for engine in self.engines.values() {
            engine.close();
        }
    }
}
