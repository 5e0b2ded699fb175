use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use super::column::ColumnMetaData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetaData {
    pub name: String,
}

impl IndexMetaData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintMetaData {
    pub name: String,
    pub referenced_table: String,
}

/// Logical table (or view) metadata.
///
/// Column, index and constraint maps are keyed by lower-cased names, `column_names`
/// keeps the declared spelling and order. The primary key list is derived here once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableMetaDataDocument", into = "TableMetaDataDocument")]
pub struct TableMetaData {
    pub name: String,
    columns: HashMap<String, ColumnMetaData>,
    indexes: HashMap<String, IndexMetaData>,
    constraints: HashMap<String, ConstraintMetaData>,
    column_names: Vec<String>,
    primary_key_columns: Vec<String>,
}

impl TableMetaData {
    pub fn new(
        name: &str,
        columns: Vec<ColumnMetaData>,
        indexes: Vec<IndexMetaData>,
        constraints: Vec<ConstraintMetaData>,
    ) -> Self {
        let mut column_map = HashMap::with_capacity(columns.len());
        let mut column_names = Vec::with_capacity(columns.len());
        let mut primary_key_columns = vec![];
        for col in columns {
            let lower = col.name.to_lowercase();
            column_names.push(col.name.clone());
            if col.primary_key {
                primary_key_columns.push(lower.clone());
            }
            column_map.insert(lower, col);
        }

        Self {
            name: name.to_owned(),
            columns: column_map,
            indexes: indexes
                .into_iter()
                .map(|idx| (idx.name.to_lowercase(), idx))
                .collect(),
            constraints: constraints
                .into_iter()
                .map(|c| (c.name.to_lowercase(), c))
                .collect(),
            column_names,
            primary_key_columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetaData> {
        self.columns.get(&name.to_lowercase())
    }

    pub fn columns(&self) -> &HashMap<String, ColumnMetaData> {
        &self.columns
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_key_columns
    }

    pub fn indexes(&self) -> &HashMap<String, IndexMetaData> {
        &self.indexes
    }

    pub fn contains_index(&self, index_name: &str) -> bool {
        self.indexes.contains_key(&index_name.to_lowercase())
    }

    pub fn constraints(&self) -> &HashMap<String, ConstraintMetaData> {
        &self.constraints
    }

    /// Same metadata under another logical name, used when a shard-side actual table
    /// (`t_order_0`) stands in for its logic table (`t_order`).
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..self.clone()
        }
    }
}

/// Flat persisted form; deserialization goes back through `TableMetaData::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableMetaDataDocument {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnMetaData>,
    #[serde(default)]
    indexes: Vec<IndexMetaData>,
    #[serde(default)]
    constraints: Vec<ConstraintMetaData>,
}

impl From<TableMetaDataDocument> for TableMetaData {
    fn from(doc: TableMetaDataDocument) -> Self {
        TableMetaData::new(&doc.name, doc.columns, doc.indexes, doc.constraints)
    }
}

impl From<TableMetaData> for TableMetaDataDocument {
    fn from(table: TableMetaData) -> Self {
        let mut columns = table.columns;
        let ordered = table
            .column_names
            .iter()
            .filter_map(|name| columns.remove(&name.to_lowercase()))
            .collect();
        let mut indexes: Vec<IndexMetaData> = table.indexes.into_values().collect();
        indexes.sort_by(|l, r| l.name.cmp(&r.name));
        let mut constraints: Vec<ConstraintMetaData> = table.constraints.into_values().collect();
        constraints.sort_by(|l, r| l.name.cmp(&r.name));

        Self {
            name: table.name,
            columns: ordered,
            indexes,
            constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogicalType;

    fn t_order() -> TableMetaData {
        TableMetaData::new(
            "t_order",
            vec![
                ColumnMetaData::new("Order_ID", LogicalType::Int64, true),
                ColumnMetaData::new("user_id", LogicalType::Int32, false),
                ColumnMetaData::new("status", LogicalType::VarChar(32), false),
            ],
            vec![IndexMetaData::new("IDX_USER")],
            vec![],
        )
    }

    #[test]
    fn test_lower_case_keys() {
        let table = t_order();
        assert!(table.column("order_id").is_some());
        assert!(table.column("ORDER_ID").is_some());
        assert!(table.contains_index("idx_user"));
        assert_eq!(table.column_names(), &["Order_ID", "user_id", "status"]);
        assert_eq!(table.primary_key_columns(), &["order_id"]);
    }

    #[test]
    fn test_persisted_form_keeps_primary_key() {
        let json = serde_json::to_string(&t_order()).unwrap();
        let back: TableMetaData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t_order());
        assert_eq!(back.primary_key_columns(), &["order_id"]);
    }
}
