pub mod datasource;
pub mod props;

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde_derive::{Deserialize, Serialize};

use self::datasource::DataSourceProperties;
use crate::{
    catalog::{
        resource::{DataSourceFactory, DataSourceRef, MemoryDataSourceFactory},
        tableinfo::TableMetaData,
    },
    error::Result,
    rule::RuleConfiguration,
    types::DatabaseType,
};

/// Configuration of one logical database with its pools already created.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfiguration {
    pub data_sources: Vec<(String, DataSourceRef)>,
    pub data_source_props: BTreeMap<String, DataSourceProperties>,
    pub rule_configs: Vec<RuleConfiguration>,
}

impl DatabaseConfiguration {
    pub fn new(
        data_sources: Vec<(String, DataSourceRef)>,
        rule_configs: Vec<RuleConfiguration>,
    ) -> Self {
        let data_source_props = data_sources
            .iter()
            .map(|(name, ds)| (name.clone(), ds.properties().clone()))
            .collect();
        Self {
            data_sources,
            data_source_props,
            rule_configs,
        }
    }

    pub fn create(
        factory: &dyn DataSourceFactory,
        data_source_props: &BTreeMap<String, DataSourceProperties>,
        rule_configs: Vec<RuleConfiguration>,
    ) -> Result<Self> {
        Ok(Self::new(factory.create_all(data_source_props)?, rule_configs))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseBootstrap {
    #[serde(default)]
    pub data_sources: BTreeMap<String, DataSourceProperties>,
    #[serde(default)]
    pub rules: Vec<RuleConfiguration>,
}

/// On-disk startup configuration, JSON encoded.
///
/// `shards` pre-populates in-memory shards (url => schema => tables) and is only
/// meaningful together with `MemoryDataSourceFactory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub protocol_type: DatabaseType,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseBootstrap>,
    #[serde(default)]
    pub global_rules: Vec<RuleConfiguration>,
    #[serde(default)]
    pub shards: BTreeMap<String, BTreeMap<String, Vec<TableMetaData>>>,
}

impl BootstrapConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        info!("load bootstrap config from {}", path.as_ref().display());
        Self::from_json(&text)
    }

    /// Create every configured shard table on the memory factory's shards.
    pub fn seed(&self, factory: &MemoryDataSourceFactory) {
        for (url, schemas) in &self.shards {
            let shard = factory.shard(url);
            for (schema, tables) in schemas {
                shard.create_schema(schema);
                for table in tables {
                    shard.create_table(schema, table.clone());
                }
            }
        }
    }
}
