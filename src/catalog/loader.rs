use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use super::{
    resource::{DataSourceRef, Resource},
    schema::Schema,
    tableinfo::TableMetaData,
};
use crate::{
    config::props::{ConfigurationProperties, PropertyKey},
    error::{Error::MetaData, Result},
    fmt_err,
    rule::{datanode::DataNode, RuleMetaData},
    types::DatabaseType,
};

/// Everything needed to turn physical tables into logical metadata.
pub struct SchemaBuilderMaterials<'a> {
    pub protocol_type: DatabaseType,
    pub storage_type: DatabaseType,
    pub resource: &'a Resource,
    pub rules: &'a RuleMetaData,
    pub props: &'a ConfigurationProperties,
    pub default_schema_name: String,
}

/// Loads logical table metadata from the shards backing it.
pub struct TableMetaDataLoader;

impl TableMetaDataLoader {
    /// Load logical tables `table_names` of `schema_name`. Tables no shard knows are
    /// left out of the result.
    pub fn load(
        table_names: &[String],
        schema_name: &str,
        materials: &SchemaBuilderMaterials,
    ) -> Result<Vec<TableMetaData>> {
        let mut result = Vec::with_capacity(table_names.len());
        for name in table_names {
            if let Some(table) = Self::load_one(name, schema_name, materials)? {
                result.push(table);
            }
        }
        Ok(result)
    }

    /// Load every logical schema of the database: the default schema always, plus
    /// every schema a shard reports when the protocol has real schemas.
    pub fn load_schemas(materials: &SchemaBuilderMaterials) -> Result<HashMap<String, Schema>> {
        let mut schema_names = BTreeSet::new();
        schema_names.insert(materials.default_schema_name.to_lowercase());
        if matches!(
            materials.protocol_type,
            DatabaseType::PostgreSQL | DatabaseType::OpenGauss
        ) {
            for (_, ds) in materials.resource.data_sources() {
                for name in ds.schema_names()? {
                    if !materials.protocol_type.is_system_database(&name) {
                        schema_names.insert(name.to_lowercase());
                    }
                }
            }
        }

        let mut result = HashMap::with_capacity(schema_names.len());
        for schema_name in schema_names {
            let tables = Self::load_all(&schema_name, materials)?;
            debug!("load schema {schema_name} with {} tables", tables.len());
            result.insert(schema_name, Schema::new(tables));
        }
        Ok(result)
    }

    fn load_all(schema_name: &str, materials: &SchemaBuilderMaterials) -> Result<Vec<TableMetaData>> {
        let sharding = materials.rules.sharding_rule();
        let mut logic_names = BTreeSet::new();
        let mut result = vec![];
        for (_, ds) in materials.resource.data_sources() {
            for table in ds.load_tables(schema_name, &[])? {
                let logic_name = sharding
                    .and_then(|rule| rule.find_logic_table_by_actual_table(&table.name))
                    .map(|s| s.to_owned());
                match logic_name {
                    Some(logic) => {
                        if logic_names.insert(logic.to_lowercase()) {
                            result.push(table.renamed(&logic));
                        }
                    }
                    None => {
                        if logic_names.insert(table.name.to_lowercase()) {
                            result.push(table);
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    fn load_one(
        table_name: &str,
        schema_name: &str,
        materials: &SchemaBuilderMaterials,
    ) -> Result<Option<TableMetaData>> {
        let rules = materials.rules;
        if let Some(rule) = rules.sharding_rule() {
            if let Some(table_rule) = rule.find_table_rule(table_name) {
                return Self::load_sharding_table(
                    &table_rule.logic_table,
                    &table_rule.actual_data_nodes,
                    schema_name,
                    materials,
                );
            }
        }
        if let Some(node) = rules
            .single_table_rule()
            .and_then(|rule| rule.find_data_node(schema_name, table_name))
        {
            let ds = Self::data_source(materials, &node.data_source_name)?;
            let schema = node.schema_name.as_deref().unwrap_or(schema_name);
            return Ok(Self::load_from(ds, schema, &node.table_name)?.map(|t| t.renamed(table_name)));
        }

        // broadcast tables and anything not tracked yet: first data source holding it
        for (_, ds) in materials.resource.data_sources() {
            if let Some(table) = Self::load_from(ds, schema_name, table_name)? {
                return Ok(Some(table.renamed(table_name)));
            }
        }
        Ok(None)
    }

    fn load_sharding_table(
        logic_table: &str,
        nodes: &[DataNode],
        schema_name: &str,
        materials: &SchemaBuilderMaterials,
    ) -> Result<Option<TableMetaData>> {
        let check_all = materials
            .props
            .bool_value(PropertyKey::CheckTableMetaDataEnabled);
        let mut loaded: Option<TableMetaData> = None;
        for node in nodes {
            let ds = Self::data_source(materials, &node.data_source_name)?;
            let schema = node.schema_name.as_deref().unwrap_or(schema_name);
            let table = match Self::load_from(ds, schema, &node.table_name)? {
                Some(table) => table.renamed(logic_table),
                None => {
                    if check_all {
                        warn!("actual table {node} of {logic_table} is missing");
                    }
                    continue;
                }
            };
            match &loaded {
                None => {
                    loaded = Some(table);
                    if !check_all {
                        break;
                    }
                }
                Some(first) => {
                    if first.column_names() != table.column_names() {
                        return Err(MetaData(fmt_err!(
                            "actual table {node} does not share the columns of logic table {logic_table}"
                        )));
                    }
                }
            }
        }
        Ok(loaded)
    }

    fn load_from(ds: &DataSourceRef, schema_name: &str, table_name: &str) -> Result<Option<TableMetaData>> {
        Ok(ds
            .load_tables(schema_name, &[table_name.to_owned()])?
            .into_iter()
            .next())
    }

    fn data_source<'a>(materials: &'a SchemaBuilderMaterials, name: &str) -> Result<&'a DataSourceRef> {
        materials
            .resource
            .data_source(name)
            .ok_or_else(|| MetaData(fmt_err!("data source {name} is not part of the database")))
    }
}
