pub mod context;
pub mod federation;

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use self::{context::OptimizerPlannerContext, federation::FederationDatabaseMetaData};
use crate::{catalog::Database, error::Result};

/// Federation metadata and planner contexts of every database, keyed by lower-cased
/// database name. Cheap to clone; entries are shared between snapshots.
#[derive(Debug, Clone, Default)]
pub struct OptimizerContext {
    federation: HashMap<String, Arc<FederationDatabaseMetaData>>,
    planner_contexts: HashMap<String, Arc<OptimizerPlannerContext>>,
}

impl OptimizerContext {
    pub fn create<'a, I>(databases: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Database>,
    {
        let mut result = Self::default();
        for database in databases {
            result.put_database(FederationDatabaseMetaData::from_database(database))?;
        }
        Ok(result)
    }

    pub fn federation_databases(&self) -> &HashMap<String, Arc<FederationDatabaseMetaData>> {
        &self.federation
    }

    pub fn federation_database(&self, database_name: &str) -> Option<&Arc<FederationDatabaseMetaData>> {
        self.federation.get(&database_name.to_lowercase())
    }

    pub fn planner_context(&self, database_name: &str) -> Option<&Arc<OptimizerPlannerContext>> {
        self.planner_contexts.get(&database_name.to_lowercase())
    }

    /// Replace the federation metadata of one database and rebuild its planner context.
    pub fn put_database(&mut self, federation: FederationDatabaseMetaData) -> Result<()> {
        let key = federation.name.to_lowercase();
        let planner = OptimizerPlannerContext::new(&federation)?;
        debug!(
            "rebuild planner context of {} over {} schemas",
            federation.name,
            federation.schemas().len()
        );
        self.planner_contexts.insert(key.clone(), Arc::new(planner));
        self.federation.insert(key, Arc::new(federation));
        Ok(())
    }

    pub fn remove_database(&mut self, database_name: &str) {
        let key = database_name.to_lowercase();
        self.federation.remove(&key);
        self.planner_contexts.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatabaseType;

    #[test]
    fn test_put_and_remove_database() {
        let db = Database::create_system("information_schema", DatabaseType::MySQL);
        let mut ctx = OptimizerContext::create([&db]).unwrap();
        assert!(ctx.federation_database("INFORMATION_SCHEMA").is_some());
        assert!(ctx.planner_context("information_schema").is_some());
        ctx.remove_database("information_schema");
        assert!(ctx.federation_databases().is_empty());
    }
}
