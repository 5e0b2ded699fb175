use std::collections::{HashMap, HashSet};

use super::subquery::SubqueryTableContext;
use crate::{
    ast::segment::{ColumnSegment, Projection, SimpleTableSegment},
    catalog::schema::Schema,
    error::{Error::Bind, Result},
    fmt_err,
};

/// Column expression => owning table name. Lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableNameMap {
    // lower(expression) => (expression, table_name)
    entries: HashMap<String, (String, String)>,
}

impl TableNameMap {
    pub fn get(&self, expression: &str) -> Option<&str> {
        self.entries
            .get(&expression.to_lowercase())
            .map(|(_, table)| table.as_str())
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.entries.contains_key(&expression.to_lowercase())
    }

    /// Keeps the first table bound to `expression`.
    pub fn insert_if_absent(&mut self, expression: &str, table_name: &str) {
        self.entries
            .entry(expression.to_lowercase())
            .or_insert_with(|| (expression.to_owned(), table_name.to_owned()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(expr, table)| (expr.as_str(), table.as_str()))
    }
}

/// Tables one statement references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablesContext {
    tables: Vec<SimpleTableSegment>,
    table_names: Vec<String>,
    // at most one
    schema_names: Vec<String>,
    // lower(alias) => contexts; "" for an unaliased subquery
    subquery_tables: HashMap<String, Vec<SubqueryTableContext>>,
}

impl TablesContext {
    /// Fails when the tables are qualified with more than one schema.
    pub fn new(
        tables: Vec<SimpleTableSegment>,
        subquery_tables: HashMap<String, Vec<SubqueryTableContext>>,
    ) -> Result<Self> {
        let mut table_names: Vec<String> = vec![];
        let mut schema_names: Vec<String> = vec![];
        for table in &tables {
            if !table_names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&table.name))
            {
                table_names.push(table.name.clone());
            }
            if let Some(owner) = &table.owner {
                let lower = owner.to_lowercase();
                if !schema_names.contains(&lower) {
                    schema_names.push(lower);
                }
            }
        }
        if schema_names.len() > 1 {
            return Err(Bind(fmt_err!(
                "can not support multiple different schema {:?} in one statement",
                schema_names
            )));
        }

        Ok(Self {
            tables,
            table_names,
            schema_names,
            subquery_tables: subquery_tables
                .into_iter()
                .map(|(alias, contexts)| (alias.to_lowercase(), contexts))
                .collect(),
        })
    }

    pub fn tables(&self) -> &[SimpleTableSegment] {
        &self.tables
    }

    pub fn table_names(&self) -> &[String] {
        &self.table_names
    }

    pub fn schema_names(&self) -> &[String] {
        &self.schema_names
    }

    /// Schema the statement names explicitly, if any.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_names.first().map(|s| s.as_str())
    }

    pub fn subquery_tables(&self) -> &HashMap<String, Vec<SubqueryTableContext>> {
        &self.subquery_tables
    }

    /// Bind every column to the table owning it. Columns no pass can place are left
    /// out of the result.
    pub fn find_table_names_by_column_segment(
        &self,
        columns: &[ColumnSegment],
        schema: Option<&Schema>,
    ) -> TableNameMap {
        let mut result = TableNameMap::default();
        if columns.is_empty() {
            return result;
        }
        if self.tables.len() == 1 {
            let table_name = &self.tables[0].name;
            for col in columns {
                result.insert_if_absent(&col.expression(), table_name);
            }
            return result;
        }

        self.find_from_owner(columns, &mut result);
        if result.len() < columns.len() {
            if let Some(schema) = schema {
                self.find_from_meta_data(columns, schema, &mut result);
            }
        }
        if result.len() < columns.len() && !self.subquery_tables.is_empty() {
            self.find_from_subquery(columns, &mut result);
        }
        result
    }

    /// Same as `find_table_names_by_column_segment` for the column projections of a
    /// select list.
    pub fn find_table_names_by_column_projection(
        &self,
        projections: &[Projection],
        schema: Option<&Schema>,
    ) -> TableNameMap {
        let columns: Vec<ColumnSegment> = projections
            .iter()
            .filter_map(|projection| match projection {
                Projection::Column { column, .. } => Some(column.clone()),
                _ => None,
            })
            .collect();
        self.find_table_names_by_column_segment(&columns, schema)
    }

    fn find_from_owner(&self, columns: &[ColumnSegment], result: &mut TableNameMap) {
        for col in columns {
            let owner = match &col.owner {
                Some(owner) => owner,
                None => continue,
            };
            if let Some(table) = self.tables.iter().find(|table| table.is_named(owner)) {
                result.insert_if_absent(&col.expression(), &table.name);
            }
        }
    }

    fn find_from_meta_data(&self, columns: &[ColumnSegment], schema: &Schema, result: &mut TableNameMap) {
        let no_owner: HashSet<String> = columns
            .iter()
            .filter(|col| col.owner.is_none() && !result.contains(&col.expression()))
            .map(|col| col.name.to_lowercase())
            .collect();
        if no_owner.is_empty() {
            return;
        }

        // column => every referenced table declaring it
        let mut owners: HashMap<String, Vec<&str>> = HashMap::new();
        for table_name in &self.table_names {
            for column_name in schema.all_column_names(table_name) {
                let lower = column_name.to_lowercase();
                if no_owner.contains(&lower) {
                    owners.entry(lower).or_default().push(table_name.as_str());
                }
            }
        }
        for col in columns.iter().filter(|col| col.owner.is_none()) {
            if let Some([table_name]) = owners.get(&col.name.to_lowercase()).map(|v| v.as_slice()) {
                result.insert_if_absent(&col.expression(), table_name);
            }
        }
    }

    fn find_from_subquery(&self, columns: &[ColumnSegment], result: &mut TableNameMap) {
        for col in columns {
            if result.contains(&col.expression()) {
                continue;
            }
            let owner = col.owner.as_deref().unwrap_or("").to_lowercase();
            let contexts = match self.subquery_tables.get(&owner) {
                Some(contexts) => contexts,
                None => continue,
            };
            if let Some(context) = contexts.iter().find(|ctx| ctx.contains_column(&col.name)) {
                result.insert_if_absent(&col.expression(), &context.table_name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{column::ColumnMetaData, tableinfo::TableMetaData},
        types::LogicalType,
    };

    fn schema() -> Schema {
        let table = |name: &str, columns: &[&str]| {
            TableMetaData::new(
                name,
                columns
                    .iter()
                    .map(|c| ColumnMetaData::new(c, LogicalType::Int64, false))
                    .collect(),
                vec![],
                vec![],
            )
        };
        Schema::new(vec![
            table("t_order", &["order_id", "user_id", "status"]),
            table("t_order_item", &["item_id", "order_id", "user_id"]),
        ])
    }

    #[test]
    fn test_single_table_skips_meta_data() {
        let ctx = TablesContext::new(vec![SimpleTableSegment::new("t_order")], HashMap::new()).unwrap();
        let columns = vec![ColumnSegment::new("anything"), ColumnSegment::owned("x", "y")];
        let result = ctx.find_table_names_by_column_segment(&columns, None);
        assert_eq!(result.get("anything"), Some("t_order"));
        assert_eq!(result.get("X.Y"), Some("t_order"));
    }

    #[test]
    fn test_owner_binding_ignores_order() {
        let columns = vec![
            ColumnSegment::owned("o", "user_id"),
            ColumnSegment::owned("i", "user_id"),
        ];
        let order = SimpleTableSegment::new("t_order").with_alias("o");
        let item = SimpleTableSegment::new("t_order_item").with_alias("i");
        for tables in [vec![order.clone(), item.clone()], vec![item, order]] {
            let ctx = TablesContext::new(tables, HashMap::new()).unwrap();
            let result = ctx.find_table_names_by_column_segment(&columns, Some(&schema()));
            assert_eq!(result.get("o.user_id"), Some("t_order"));
            assert_eq!(result.get("i.user_id"), Some("t_order_item"));
        }
    }

    #[test]
    fn test_meta_data_binding_skips_ambiguous() {
        let ctx = TablesContext::new(
            vec![
                SimpleTableSegment::new("t_order"),
                SimpleTableSegment::new("t_order_item"),
            ],
            HashMap::new(),
        )
        .unwrap();
        let columns = vec![
            ColumnSegment::new("STATUS"),
            ColumnSegment::new("item_id"),
            ColumnSegment::new("order_id"),
        ];
        let result = ctx.find_table_names_by_column_segment(&columns, Some(&schema()));
        assert_eq!(result.get("status"), Some("t_order"));
        assert_eq!(result.get("item_id"), Some("t_order_item"));
        assert_eq!(result.get("order_id"), None);
    }

    #[test]
    fn test_subquery_binding() {
        let mut subquery_tables = HashMap::new();
        subquery_tables.insert(
            "T".to_owned(),
            vec![SubqueryTableContext::new("t_order", Some("t"), vec!["order_id".to_owned()])],
        );
        let ctx = TablesContext::new(vec![SimpleTableSegment::new("t_user").with_alias("u"), SimpleTableSegment::new("t_config")], subquery_tables).unwrap();
        let columns = vec![ColumnSegment::owned("t", "ORDER_ID"), ColumnSegment::owned("t", "missing")];
        let result = ctx.find_table_names_by_column_segment(&columns, Some(&schema()));
        assert_eq!(result.get("t.order_id"), Some("t_order"));
        assert!(!result.contains("t.missing"));
    }

    #[test]
    fn test_multiple_schemas_rejected() {
        let result = TablesContext::new(
            vec![
                SimpleTableSegment::new("t_order").with_owner("db_a"),
                SimpleTableSegment::new("t_user").with_owner("DB_B"),
            ],
            HashMap::new(),
        );
        assert!(matches!(result, Err(Bind(_))));

        let ctx = TablesContext::new(
            vec![
                SimpleTableSegment::new("t_order").with_owner("db_a"),
                SimpleTableSegment::new("t_user").with_owner("DB_A"),
            ],
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(ctx.schema_name(), Some("db_a"));
    }
}
