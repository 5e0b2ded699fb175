use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{tableinfo::TableMetaData, Database};

/// Tables of one schema as the cross-schema optimizer sees them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FederationSchemaMetaData {
    pub name: String,
    // lower(table_name) => table
    tables: HashMap<String, Arc<TableMetaData>>,
}

impl FederationSchemaMetaData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            tables: HashMap::new(),
        }
    }

    pub fn tables(&self) -> &HashMap<String, Arc<TableMetaData>> {
        &self.tables
    }

    pub fn table(&self, table_name: &str) -> Option<&Arc<TableMetaData>> {
        self.tables.get(&table_name.to_lowercase())
    }

    pub fn put_table(&mut self, table: Arc<TableMetaData>) {
        self.tables.insert(table.name.to_lowercase(), table);
    }

    pub fn remove_table(&mut self, table_name: &str) {
        self.tables.remove(&table_name.to_lowercase());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FederationDatabaseMetaData {
    pub name: String,
    // lower(schema_name) => schema
    schemas: HashMap<String, FederationSchemaMetaData>,
}

impl FederationDatabaseMetaData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            schemas: HashMap::new(),
        }
    }

    /// Mirror every schema of `database`.
    pub fn from_database(database: &Database) -> Self {
        let mut result = Self::new(database.name());
        for (schema_name, schema) in database.schemas() {
            let mut fed = FederationSchemaMetaData::new(schema_name);
            for table in schema.tables().values() {
                fed.put_table(Arc::clone(table));
            }
            result.schemas.insert(schema_name.to_lowercase(), fed);
        }
        result
    }

    pub fn schemas(&self) -> &HashMap<String, FederationSchemaMetaData> {
        &self.schemas
    }

    pub fn schema(&self, schema_name: &str) -> Option<&FederationSchemaMetaData> {
        self.schemas.get(&schema_name.to_lowercase())
    }

    pub fn put_schema(&mut self, schema: FederationSchemaMetaData) {
        self.schemas.insert(schema.name.to_lowercase(), schema);
    }

    pub fn remove_schema(&mut self, schema_name: &str) -> Option<FederationSchemaMetaData> {
        self.schemas.remove(&schema_name.to_lowercase())
    }

    /// Put `table` into `schema_name`, creating the schema entry when missing.
    pub fn put_table(&mut self, schema_name: &str, table: Arc<TableMetaData>) {
        self.schemas
            .entry(schema_name.to_lowercase())
            .or_insert_with(|| FederationSchemaMetaData::new(&schema_name.to_lowercase()))
            .put_table(table);
    }

    pub fn remove_table(&mut self, schema_name: &str, table_name: &str) {
        if let Some(schema) = self.schemas.get_mut(&schema_name.to_lowercase()) {
            schema.remove_table(table_name);
        }
    }

    pub fn contains_table(&self, schema_name: &str, table_name: &str) -> bool {
        self.schema(schema_name)
            .map(|schema| schema.table(table_name).is_some())
            .unwrap_or(false)
    }
}
