use std::collections::HashMap;
use std::sync::Arc;

use super::federation::FederationDatabaseMetaData;
use crate::{
    catalog::tableinfo::TableMetaData,
    error::{Error::Internal, Result},
    fmt_err,
};

/// Lookup tables the optimizer plans one database with. Rebuilt from the federation
/// metadata whenever that changes, never patched in place.
#[derive(Debug, Default, PartialEq)]
pub struct OptimizerPlannerContext {
    pub database_name: String,
    /// schema_name => table_name => table
    table_map: HashMap<String, HashMap<String, Arc<TableMetaData>>>,
    /// schema_name => column_name => table names
    column_map: HashMap<String, HashMap<String, Vec<String>>>,
}

impl OptimizerPlannerContext {
    pub fn new(federation: &FederationDatabaseMetaData) -> Result<Self> {
        let mut ctx = Self {
            database_name: federation.name.clone(),
            ..Default::default()
        };
        for (schema_name, schema) in federation.schemas() {
            ctx.table_map.entry(schema_name.clone()).or_default();
            for table in schema.tables().values() {
                ctx.insert_table_info(schema_name, table)?;
            }
        }
        Ok(ctx)
    }

    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table_map.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn info_by_name(&self, schema_name: &str, table_name: &str) -> Option<Arc<TableMetaData>> {
        self.table_map
            .get(&schema_name.to_lowercase())?
            .get(&table_name.to_lowercase())
            .map(Arc::clone)
    }

    pub fn table_names_by_column_name(&self, schema_name: &str, column_name: &str) -> Option<Vec<String>> {
        let mut names = self
            .column_map
            .get(&schema_name.to_lowercase())?
            .get(&column_name.to_lowercase())?
            .clone();
        names.sort();
        Some(names)
    }

    fn insert_column_info(&mut self, schema_name: &str, table: &TableMetaData) {
        let columns = self.column_map.entry(schema_name.to_owned()).or_default();
        for col in table.column_names() {
            columns
                .entry(col.to_lowercase())
                .or_default()
                .push(table.name.clone());
        }
    }

    fn insert_table_info(&mut self, schema_name: &str, table: &Arc<TableMetaData>) -> Result<()> {
        let tables = self.table_map.entry(schema_name.to_owned()).or_default();
        let key = table.name.to_lowercase();
        if tables.contains_key(&key) {
            return Err(Internal(fmt_err!("{schema_name}.{} is exist", table.name)));
        }
        tables.insert(key, Arc::clone(table));
        self.insert_column_info(schema_name, table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::column::ColumnMetaData, types::LogicalType};

    #[test]
    fn test_build_from_federation() {
        let mut fed = FederationDatabaseMetaData::new("sharding_db");
        for name in ["t_order", "t_order_item"] {
            fed.put_table(
                "sharding_db",
                Arc::new(TableMetaData::new(
                    name,
                    vec![ColumnMetaData::new("Order_ID", LogicalType::Int64, true)],
                    vec![],
                    vec![],
                )),
            );
        }
        fed.put_table("other", Arc::new(TableMetaData::new("t_user", vec![], vec![], vec![])));

        let ctx = OptimizerPlannerContext::new(&fed).unwrap();
        assert_eq!(ctx.schema_names(), vec!["other", "sharding_db"]);
        assert!(ctx.info_by_name("SHARDING_DB", "T_ORDER").is_some());
        assert!(ctx.info_by_name("other", "t_order").is_none());
        assert_eq!(
            ctx.table_names_by_column_name("sharding_db", "order_id"),
            Some(vec!["t_order".to_owned(), "t_order_item".to_owned()])
        );
    }
}
