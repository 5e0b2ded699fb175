use std::collections::HashMap;
use std::sync::Arc;

use super::tableinfo::TableMetaData;

pub type SchemaRef = Arc<Schema>;

/// Logical schema: lower-cased table name => table metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: HashMap<String, Arc<TableMetaData>>,
}

impl Schema {
    pub fn new(tables: Vec<TableMetaData>) -> Self {
        let mut schema = Self::default();
        for table in tables {
            schema.put(Arc::new(table));
        }
        schema
    }

    pub fn get(&self, table_name: &str) -> Option<&Arc<TableMetaData>> {
        self.tables.get(&table_name.to_lowercase())
    }

    pub fn put(&mut self, table: Arc<TableMetaData>) {
        self.tables.insert(table.name.to_lowercase(), table);
    }

    pub fn remove(&mut self, table_name: &str) -> Option<Arc<TableMetaData>> {
        self.tables.remove(&table_name.to_lowercase())
    }

    pub fn contains_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(&table_name.to_lowercase())
    }

    pub fn tables(&self) -> &HashMap<String, Arc<TableMetaData>> {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Lower-cased names of every table, sorted.
    pub fn all_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn all_column_names(&self, table_name: &str) -> Vec<String> {
        match self.get(table_name) {
            Some(table) => table.column_names().to_vec(),
            None => vec![],
        }
    }

    /// Whether `index_name` exists, on `table_name` when given, otherwise on any table.
    pub fn contains_index(&self, table_name: Option<&str>, index_name: &str) -> bool {
        match table_name {
            Some(name) => self
                .get(name)
                .map(|table| table.contains_index(index_name))
                .unwrap_or(false),
            None => self
                .tables
                .values()
                .any(|table| table.contains_index(index_name)),
        }
    }

    /// Name of the table owning `index_name`, if any.
    pub fn find_table_by_index(&self, index_name: &str) -> Option<String> {
        self.tables
            .values()
            .find(|table| table.contains_index(index_name))
            .map(|table| table.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{column::ColumnMetaData, tableinfo::IndexMetaData},
        types::LogicalType,
    };

    #[test]
    fn test_case_insensitive_lookup() {
        let schema = Schema::new(vec![TableMetaData::new(
            "T_Order",
            vec![ColumnMetaData::new("order_id", LogicalType::Int64, true)],
            vec![IndexMetaData::new("idx_order")],
            vec![],
        )]);
        assert!(schema.contains_table("t_order"));
        assert!(schema.contains_table("T_ORDER"));
        assert_eq!(schema.all_table_names(), vec!["t_order".to_owned()]);
        assert_eq!(schema.all_column_names("t_order"), vec!["order_id".to_owned()]);
        assert!(schema.contains_index(None, "IDX_ORDER"));
        assert!(!schema.contains_index(Some("t_other"), "idx_order"));
        assert_eq!(schema.find_table_by_index("idx_order").as_deref(), Some("T_Order"));
    }
}
