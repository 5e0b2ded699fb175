pub mod repository;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::debug;

use self::repository::PersistRepository;
use crate::{
    catalog::{schema::Schema, tableinfo::TableMetaData},
    config::{datasource::DataSourceProperties, props::ConfigurationProperties},
    error::Result,
    rule::RuleConfiguration,
};

const METADATA_NODE: &str = "/metadata";
const GLOBAL_RULE_NODE: &str = "/rules";
const PROPS_NODE: &str = "/props";

fn database_node(database_name: &str) -> String {
    format!("{METADATA_NODE}/{}", database_name.to_lowercase())
}

fn schema_node(database_name: &str, schema_name: &str) -> String {
    format!("{}/schemas/{}", database_node(database_name), schema_name.to_lowercase())
}

fn tables_node(database_name: &str, schema_name: &str) -> String {
    format!("{}/tables", schema_node(database_name, schema_name))
}

fn table_node(database_name: &str, schema_name: &str, table_name: &str) -> String {
    format!("{}/{}", tables_node(database_name, schema_name), table_name.to_lowercase())
}

fn data_sources_node(database_name: &str) -> String {
    format!("{}/data_sources", database_node(database_name))
}

fn rules_node(database_name: &str) -> String {
    format!("{}/rules", database_node(database_name))
}

/// Durable copy of the metadata, values stored as JSON.
#[derive(Debug, Clone)]
pub struct MetaDataPersistService {
    repository: Arc<dyn PersistRepository>,
}

impl MetaDataPersistService {
    pub fn new(repository: Arc<dyn PersistRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn PersistRepository> {
        &self.repository
    }

    pub fn persist_database(&self, database_name: &str) -> Result<()> {
        self.repository.persist(&database_node(database_name), "")
    }

    pub fn delete_database(&self, database_name: &str) -> Result<()> {
        self.repository.delete(&database_node(database_name))
    }

    pub fn load_all_database_names(&self) -> Result<Vec<String>> {
        self.repository.get_children_keys(METADATA_NODE)
    }

    pub fn persist_schema(&self, database_name: &str, schema_name: &str) -> Result<()> {
        self.repository
            .persist(&schema_node(database_name, schema_name), "")
    }

    pub fn delete_schema(&self, database_name: &str, schema_name: &str) -> Result<()> {
        self.repository
            .delete(&schema_node(database_name, schema_name))
    }

    /// Persist every table of `schema`; tables persisted earlier but gone now stay.
    pub fn persist_tables(&self, database_name: &str, schema_name: &str, schema: &Schema) -> Result<()> {
        self.persist_schema(database_name, schema_name)?;
        for table in schema.tables().values() {
            self.persist_table(database_name, schema_name, table)?;
        }
        Ok(())
    }

    pub fn persist_table(&self, database_name: &str, schema_name: &str, table: &TableMetaData) -> Result<()> {
        let value = serde_json::to_string(table)?;
        debug!("persist table {database_name}.{schema_name}.{}", table.name);
        self.repository
            .persist(&table_node(database_name, schema_name, &table.name), &value)
    }

    pub fn delete_table(&self, database_name: &str, schema_name: &str, table_name: &str) -> Result<()> {
        self.repository
            .delete(&table_node(database_name, schema_name, table_name))
    }

    /// Load a persisted schema; `None` when it has no tables.
    pub fn load_schema(&self, database_name: &str, schema_name: &str) -> Result<Option<Schema>> {
        let names = self
            .repository
            .get_children_keys(&tables_node(database_name, schema_name))?;
        if names.is_empty() {
            return Ok(None);
        }
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            if let Some(value) = self
                .repository
                .get(&table_node(database_name, schema_name, &name))?
            {
                tables.push(serde_json::from_str::<TableMetaData>(&value)?);
            }
        }
        Ok(Some(Schema::new(tables)))
    }

    pub fn persist_data_sources(
        &self,
        database_name: &str,
        props: &BTreeMap<String, DataSourceProperties>,
    ) -> Result<()> {
        self.repository
            .persist(&data_sources_node(database_name), &serde_json::to_string(props)?)
    }

    pub fn load_data_sources(&self, database_name: &str) -> Result<BTreeMap<String, DataSourceProperties>> {
        match self.repository.get(&data_sources_node(database_name))? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(BTreeMap::new()),
        }
    }

    pub fn persist_rule_configs(&self, database_name: &str, configs: &[RuleConfiguration]) -> Result<()> {
        self.repository
            .persist(&rules_node(database_name), &serde_json::to_string(configs)?)
    }

    pub fn load_rule_configs(&self, database_name: &str) -> Result<Vec<RuleConfiguration>> {
        match self.repository.get(&rules_node(database_name))? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(vec![]),
        }
    }

    pub fn persist_global_rule_configs(&self, configs: &[RuleConfiguration]) -> Result<()> {
        self.repository
            .persist(GLOBAL_RULE_NODE, &serde_json::to_string(configs)?)
    }

    pub fn load_global_rule_configs(&self) -> Result<Vec<RuleConfiguration>> {
        match self.repository.get(GLOBAL_RULE_NODE)? {
            Some(value) => Ok(serde_json::from_str(&value)?),
            None => Ok(vec![]),
        }
    }

    pub fn persist_props(&self, props: &ConfigurationProperties) -> Result<()> {
        self.repository
            .persist(PROPS_NODE, &serde_json::to_string(props)?)
    }

    pub fn load_props(&self) -> Result<Option<ConfigurationProperties>> {
        match self.repository.get(PROPS_NODE)? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Persist a whole database: node, data sources, rules and every schema.
    pub fn persist_database_configuration(
        &self,
        database_name: &str,
        data_sources: &BTreeMap<String, DataSourceProperties>,
        rule_configs: &[RuleConfiguration],
        schemas: &HashMap<String, Arc<Schema>>,
    ) -> Result<()> {
        self.persist_database(database_name)?;
        self.persist_data_sources(database_name, data_sources)?;
        self.persist_rule_configs(database_name, rule_configs)?;
        for (schema_name, schema) in schemas {
            self.persist_tables(database_name, schema_name, schema)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{column::ColumnMetaData, tableinfo::IndexMetaData},
        persist::repository::MemoryPersistRepository,
        types::LogicalType,
    };

    fn service() -> (Arc<MemoryPersistRepository>, MetaDataPersistService) {
        let repo = Arc::new(MemoryPersistRepository::new());
        let service = MetaDataPersistService::new(repo.clone());
        (repo, service)
    }

    #[test]
    fn test_persist_table_path() {
        let (repo, service) = service();
        service
            .persist_table(
                "foo_db",
                "foo_schema",
                &TableMetaData::new("FOO_TABLE", vec![], vec![], vec![]),
            )
            .unwrap();
        assert!(repo
            .get("/metadata/foo_db/schemas/foo_schema/tables/foo_table")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_load_schema() {
        let (_, service) = service();
        let schema = Schema::new(vec![TableMetaData::new(
            "t_order",
            vec![ColumnMetaData::new("id", LogicalType::Int64, true)],
            vec![IndexMetaData::new("primary")],
            vec![],
        )]);
        service.persist_database("foo_db").unwrap();
        service.persist_tables("foo_db", "foo_schema", &schema).unwrap();

        let loaded = service.load_schema("foo_db", "foo_schema").unwrap().unwrap();
        assert_eq!(loaded, schema);
        assert!(service.load_schema("test", "test").unwrap().is_none());
        assert_eq!(service.load_all_database_names().unwrap(), vec!["foo_db"]);

        service.delete_database("foo_db").unwrap();
        assert!(service.load_all_database_names().unwrap().is_empty());
    }
}
