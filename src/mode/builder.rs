use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::info;

use super::contexts::MetaDataContexts;
use crate::{
    catalog::{resource::DataSourceFactory, Database},
    config::{
        props::{ConfigurationProperties, PropertyKey},
        BootstrapConfig, DatabaseConfiguration,
    },
    error::Result,
    persist::MetaDataPersistService,
    planner::OptimizerContext,
    rule::{build_global_rules, RuleConfiguration},
    types::DatabaseType,
};

/// Builds the first `MetaDataContexts` from configuration.
pub struct MetaDataContextsBuilder {
    protocol_type: DatabaseType,
    database_configs: BTreeMap<String, DatabaseConfiguration>,
    global_rule_configs: Vec<RuleConfiguration>,
    props: ConfigurationProperties,
}

impl MetaDataContextsBuilder {
    pub fn new(
        protocol_type: DatabaseType,
        database_configs: BTreeMap<String, DatabaseConfiguration>,
        global_rule_configs: Vec<RuleConfiguration>,
        props: ConfigurationProperties,
    ) -> Self {
        Self {
            protocol_type,
            database_configs,
            global_rule_configs,
            props,
        }
    }

    /// Create the data sources of every database in `config` through `factory`.
    /// The `proxy-frontend-database-protocol-type` property overrides the configured
    /// protocol when set.
    pub fn from_config(config: &BootstrapConfig, factory: &dyn DataSourceFactory) -> Result<Self> {
        let props = ConfigurationProperties::new(config.props.clone())?;
        let protocol_type = match props.value(PropertyKey::ProxyFrontendDatabaseProtocolType) {
            "" => config.protocol_type,
            name => DatabaseType::from_name(name)?,
        };
        let mut database_configs = BTreeMap::new();
        for (name, database) in &config.databases {
            database_configs.insert(
                name.clone(),
                DatabaseConfiguration::create(factory, &database.data_sources, database.rules.clone())?,
            );
        }
        Ok(Self::new(
            protocol_type,
            database_configs,
            config.global_rules.clone(),
            props,
        ))
    }

    pub fn build(self, persist_service: Option<Arc<MetaDataPersistService>>) -> Result<MetaDataContexts> {
        let mut databases = HashMap::new();
        for (name, config) in &self.database_configs {
            let database = Database::create(name, self.protocol_type, config, &self.props)?;
            databases.insert(name.to_lowercase(), Arc::new(database));
        }
        for name in self.protocol_type.system_database_schemas().keys() {
            if !databases.contains_key(*name) {
                let database = Database::create_system(name, self.protocol_type);
                databases.insert(name.to_string(), Arc::new(database));
            }
        }
        let optimizer = OptimizerContext::create(databases.values().map(|db| db.as_ref()))?;
        info!(
            "build {:?} meta data contexts with {} databases",
            self.protocol_type,
            databases.len()
        );

        Ok(MetaDataContexts::new(
            self.protocol_type,
            databases,
            build_global_rules(&self.global_rule_configs),
            optimizer,
            self.props,
            persist_service,
        ))
    }
}
