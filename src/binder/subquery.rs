use std::collections::HashMap;

use super::tables::TablesContext;
use crate::{
    ast::{segment::Projection, SelectStmt},
    catalog::schema::Schema,
};

/// Columns a sub-select exposes from one of its tables, seen from the outer
/// statement through the sub-select's alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubqueryTableContext {
    pub table_name: String,
    pub alias: Option<String>,
    pub column_names: Vec<String>,
}

impl SubqueryTableContext {
    pub fn new(table_name: &str, alias: Option<&str>, column_names: Vec<String>) -> Self {
        Self {
            table_name: table_name.to_owned(),
            alias: alias.map(|s| s.to_owned()),
            column_names,
        }
    }

    pub fn contains_column(&self, column_name: &str) -> bool {
        self.column_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column_name))
    }
}

pub struct SubqueryTableContextEngine;

impl SubqueryTableContextEngine {
    /// One context per table the sub-select's projections come from, in first-seen
    /// order. Projections without an owning table (expressions, unbound columns) are
    /// not exposed.
    pub fn create(
        select: &SelectStmt,
        tables: &TablesContext,
        alias: Option<&str>,
        schema: Option<&Schema>,
    ) -> Vec<SubqueryTableContext> {
        let bound = tables.find_table_names_by_column_projection(&select.projections, schema);
        let mut order: Vec<String> = vec![];
        let mut columns: HashMap<String, Vec<String>> = HashMap::new();
        let mut expose = |table_name: &str, column_name: &str| {
            let key = table_name.to_lowercase();
            let entry = columns.entry(key.clone()).or_insert_with(|| {
                order.push(table_name.to_owned());
                vec![]
            });
            if !entry.iter().any(|c| c.eq_ignore_ascii_case(column_name)) {
                entry.push(column_name.to_owned());
            }
        };

        for projection in &select.projections {
            match projection {
                Projection::Column { column, alias } => {
                    if let Some(table_name) = bound.get(&column.expression()) {
                        expose(table_name, alias.as_deref().unwrap_or(&column.name));
                    }
                }
                Projection::Star { owner } => {
                    let schema = match schema {
                        Some(schema) => schema,
                        None => continue,
                    };
                    for table in tables.tables() {
                        if let Some(owner) = owner {
                            if !table.is_named(owner) {
                                continue;
                            }
                        }
                        for column_name in schema.all_column_names(&table.name) {
                            expose(&table.name, &column_name);
                        }
                    }
                }
                Projection::Expression { .. } => {}
            }
        }

        order
            .into_iter()
            .map(|table_name| {
                let column_names = columns
                    .remove(&table_name.to_lowercase())
                    .unwrap_or_default();
                SubqueryTableContext::new(&table_name, alias, column_names)
            })
            .collect()
    }
}
