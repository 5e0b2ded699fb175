use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    catalog::Database,
    config::props::ConfigurationProperties,
    error::Result,
    persist::MetaDataPersistService,
    planner::{federation::FederationDatabaseMetaData, OptimizerContext},
    rule::RuleMetaData,
    types::DatabaseType,
};

/// One published view of every database, the global rules and the properties.
///
/// Never mutated after publication. The `with_*` builders return a new snapshot
/// sharing every part they leave alone, so a reader holding the old one keeps a
/// consistent view for as long as it likes.
#[derive(Debug, Clone)]
pub struct MetaDataContexts {
    protocol_type: DatabaseType,
    // lower(database_name) => database
    databases: HashMap<String, Arc<Database>>,
    global_rule_meta_data: Arc<RuleMetaData>,
    optimizer_context: Arc<OptimizerContext>,
    props: Arc<ConfigurationProperties>,
    persist_service: Option<Arc<MetaDataPersistService>>,
}

impl MetaDataContexts {
    pub fn new(
        protocol_type: DatabaseType,
        databases: HashMap<String, Arc<Database>>,
        global_rule_meta_data: RuleMetaData,
        optimizer_context: OptimizerContext,
        props: ConfigurationProperties,
        persist_service: Option<Arc<MetaDataPersistService>>,
    ) -> Self {
        Self {
            protocol_type,
            databases: databases
                .into_iter()
                .map(|(name, db)| (name.to_lowercase(), db))
                .collect(),
            global_rule_meta_data: Arc::new(global_rule_meta_data),
            optimizer_context: Arc::new(optimizer_context),
            props: Arc::new(props),
            persist_service,
        }
    }

    pub fn protocol_type(&self) -> DatabaseType {
        self.protocol_type
    }

    pub fn databases(&self) -> &HashMap<String, Arc<Database>> {
        &self.databases
    }

    pub fn database(&self, database_name: &str) -> Option<&Arc<Database>> {
        self.databases.get(&database_name.to_lowercase())
    }

    pub fn contains_database(&self, database_name: &str) -> bool {
        self.databases.contains_key(&database_name.to_lowercase())
    }

    /// Names of every database, sorted.
    pub fn all_database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .values()
            .map(|db| db.name().to_owned())
            .collect();
        names.sort();
        names
    }

    pub fn global_rule_meta_data(&self) -> &Arc<RuleMetaData> {
        &self.global_rule_meta_data
    }

    pub fn optimizer_context(&self) -> &Arc<OptimizerContext> {
        &self.optimizer_context
    }

    pub fn props(&self) -> &Arc<ConfigurationProperties> {
        &self.props
    }

    pub fn persist_service(&self) -> Option<&Arc<MetaDataPersistService>> {
        self.persist_service.as_ref()
    }

    /// Snapshot with `database` put and its planner context rebuilt from `federation`.
    pub fn with_database(&self, database: Database, federation: FederationDatabaseMetaData) -> Result<Self> {
        let mut optimizer = OptimizerContext::clone(&self.optimizer_context);
        optimizer.put_database(federation)?;
        let mut databases = self.databases.clone();
        databases.insert(database.name().to_lowercase(), Arc::new(database));
        Ok(Self {
            databases,
            optimizer_context: Arc::new(optimizer),
            ..self.clone()
        })
    }

    pub fn without_database(&self, database_name: &str) -> Self {
        let mut optimizer = OptimizerContext::clone(&self.optimizer_context);
        optimizer.remove_database(database_name);
        let mut databases = self.databases.clone();
        databases.remove(&database_name.to_lowercase());
        Self {
            databases,
            optimizer_context: Arc::new(optimizer),
            ..self.clone()
        }
    }

    pub fn with_global_rule_meta_data(&self, global_rule_meta_data: RuleMetaData) -> Self {
        Self {
            global_rule_meta_data: Arc::new(global_rule_meta_data),
            ..self.clone()
        }
    }

    pub fn with_props(&self, props: ConfigurationProperties) -> Self {
        Self {
            props: Arc::new(props),
            ..self.clone()
        }
    }
}
