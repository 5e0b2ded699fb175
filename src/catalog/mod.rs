pub mod column;
pub mod loader;
pub mod resource;
pub mod schema;
pub mod tableinfo;

use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use self::{
    loader::{SchemaBuilderMaterials, TableMetaDataLoader},
    resource::Resource,
    schema::Schema,
    tableinfo::TableMetaData,
};
use crate::{
    config::{props::ConfigurationProperties, DatabaseConfiguration},
    error::Result,
    rule::{build_database_rules, RuleMetaData},
    types::DatabaseType,
};

/// One logical database: its data sources, rules and logical schemas.
///
/// Cloning is cheap; every part sits behind an `Arc` and is copied only when a
/// mutator touches it, so a new snapshot shares everything it did not change.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    protocol_type: DatabaseType,
    resource: Arc<Resource>,
    rule_meta_data: Arc<RuleMetaData>,
    // schema_name(lower case) => schema
    schemas: HashMap<String, Arc<Schema>>,
}

impl Database {
    pub fn new(
        name: &str,
        protocol_type: DatabaseType,
        resource: Arc<Resource>,
        rule_meta_data: Arc<RuleMetaData>,
        schemas: HashMap<String, Arc<Schema>>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            protocol_type,
            resource,
            rule_meta_data,
            schemas: schemas
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Build a database from its configuration: rules first, then the logical schemas
    /// loaded from the data sources through those rules.
    pub fn create(
        name: &str,
        protocol_type: DatabaseType,
        config: &DatabaseConfiguration,
        props: &ConfigurationProperties,
    ) -> Result<Self> {
        let resource = Resource::new(config.data_sources.clone());
        let storage_type = resource.database_type().unwrap_or(protocol_type);
        let rules = build_database_rules(name, protocol_type, &resource, &config.rule_configs)?;
        let default_schema = protocol_type.default_schema(name);
        let schemas = {
            let materials = SchemaBuilderMaterials {
                protocol_type,
                storage_type,
                resource: &resource,
                rules: &rules,
                props,
                default_schema_name: default_schema.clone(),
            };
            TableMetaDataLoader::load_schemas(&materials)?
        };
        info!(
            "create database {name} with {} data sources, {} schemas",
            resource.data_sources().len(),
            schemas.len()
        );

        Ok(Self::new(
            name,
            protocol_type,
            Arc::new(resource),
            Arc::new(rules),
            schemas
                .into_iter()
                .map(|(name, schema)| (name, Arc::new(schema)))
                .collect(),
        ))
    }

    /// Built-in database of the dialect: empty schemas, no data sources, no rules.
    pub fn create_system(name: &str, protocol_type: DatabaseType) -> Self {
        let schemas = protocol_type
            .system_database_schemas()
            .get(name)
            .map(|names| {
                names
                    .iter()
                    .map(|s| (s.to_string(), Arc::new(Schema::default())))
                    .collect()
            })
            .unwrap_or_default();
        Self::new(
            name,
            protocol_type,
            Arc::new(Resource::default()),
            Arc::new(RuleMetaData::default()),
            schemas,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol_type(&self) -> DatabaseType {
        self.protocol_type
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    pub fn rule_meta_data(&self) -> &Arc<RuleMetaData> {
        &self.rule_meta_data
    }

    pub fn rule_meta_data_mut(&mut self) -> &mut RuleMetaData {
        Arc::make_mut(&mut self.rule_meta_data)
    }

    pub fn default_schema_name(&self) -> String {
        self.protocol_type.default_schema(&self.name)
    }

    pub fn schemas(&self) -> &HashMap<String, Arc<Schema>> {
        &self.schemas
    }

    pub fn schema(&self, schema_name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(&schema_name.to_lowercase())
    }

    pub fn schema_mut(&mut self, schema_name: &str) -> Option<&mut Schema> {
        self.schemas
            .get_mut(&schema_name.to_lowercase())
            .map(Arc::make_mut)
    }

    /// Schema `schema_name` for writing, created empty when missing.
    pub fn schema_mut_or_default(&mut self, schema_name: &str) -> &mut Schema {
        Arc::make_mut(self.schemas.entry(schema_name.to_lowercase()).or_default())
    }

    pub fn put_schema(&mut self, schema_name: &str, schema: Arc<Schema>) {
        self.schemas.insert(schema_name.to_lowercase(), schema);
    }

    pub fn remove_schema(&mut self, schema_name: &str) -> Option<Arc<Schema>> {
        self.schemas.remove(&schema_name.to_lowercase())
    }

    pub fn table(&self, schema_name: &str, table_name: &str) -> Option<&Arc<TableMetaData>> {
        self.schema(schema_name)?.get(table_name)
    }

    pub fn contains_table(&self, schema_name: &str, table_name: &str) -> bool {
        self.table(schema_name, table_name).is_some()
    }

    /// Materials to load tables of `schema_name` through the current rules.
    pub fn materials<'a>(
        &'a self,
        props: &'a ConfigurationProperties,
        schema_name: &str,
    ) -> SchemaBuilderMaterials<'a> {
        SchemaBuilderMaterials {
            protocol_type: self.protocol_type,
            storage_type: self.resource.database_type().unwrap_or(self.protocol_type),
            resource: &self.resource,
            rules: &self.rule_meta_data,
            props,
            default_schema_name: schema_name.to_lowercase(),
        }
    }

    /// A database is complete once it has both data sources and rules to route with.
    pub fn is_complete(&self) -> bool {
        !self.resource.is_empty() && !self.rule_meta_data.rules().is_empty()
    }

    pub fn with_schemas(&self, schemas: HashMap<String, Arc<Schema>>) -> Self {
        Self::new(
            &self.name,
            self.protocol_type,
            Arc::clone(&self.resource),
            Arc::clone(&self.rule_meta_data),
            schemas,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::column::ColumnMetaData, types::LogicalType};

    #[test]
    fn test_copy_on_write_schema() {
        let mut schemas = HashMap::new();
        schemas.insert("Sharding_DB".to_owned(), Arc::new(Schema::default()));
        let db = Database::new(
            "sharding_db",
            DatabaseType::MySQL,
            Arc::new(Resource::default()),
            Arc::new(RuleMetaData::default()),
            schemas,
        );
        let mut changed = db.clone();
        changed.schema_mut("sharding_db").unwrap().put(Arc::new(TableMetaData::new(
            "t_user",
            vec![ColumnMetaData::new("id", LogicalType::Int64, true)],
            vec![],
            vec![],
        )));
        assert!(changed.contains_table("SHARDING_DB", "t_user"));
        assert!(!db.contains_table("sharding_db", "t_user"));
        assert!(Arc::ptr_eq(db.resource(), changed.resource()));
    }

    #[test]
    fn test_create_system() {
        let db = Database::create_system("postgres", DatabaseType::PostgreSQL);
        assert!(db.schema("pg_catalog").is_some());
        assert!(!db.is_complete());
    }
}
