pub mod subquery;
pub mod tables;

use std::collections::{BTreeMap, HashMap};

use log::debug;

use self::{
    subquery::{SubqueryTableContext, SubqueryTableContextEngine},
    tables::{TableNameMap, TablesContext},
};
use crate::{
    ast::{
        segment::{ColumnSegment, Expr, Projection, SimpleTableSegment, SubquerySegment, TableSegment},
        SelectStmt, Statement, StatementKind,
    },
    catalog::{schema::Schema, Database},
    error::Result,
    types::DatabaseType,
};

/// A statement together with everything binding found out about it.
#[derive(Debug, Clone)]
pub struct SqlStatementContext {
    statement: Statement,
    tables: TablesContext,
    database_type: DatabaseType,
    // start index => sub-select context
    subquery_contexts: BTreeMap<usize, SqlStatementContext>,
}

impl SqlStatementContext {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn kind(&self) -> StatementKind {
        self.statement.kind()
    }

    pub fn tables_context(&self) -> &TablesContext {
        &self.tables
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    pub fn subquery_contexts(&self) -> &BTreeMap<usize, SqlStatementContext> {
        &self.subquery_contexts
    }

    /// Schema the statement runs in: the explicit owner, else the dialect default.
    pub fn schema_name(&self, database_name: &str) -> String {
        match self.tables.schema_name() {
            Some(name) => name.to_owned(),
            None => self.database_type.default_schema(database_name),
        }
    }

    /// Column segments the statement reads or writes, sub-selects excluded.
    pub fn columns(&self) -> Vec<ColumnSegment> {
        let mut exprs: Vec<&Expr> = vec![];
        let mut result: Vec<ColumnSegment> = vec![];
        match &self.statement {
            Statement::Select(select) => {
                for projection in &select.projections {
                    match projection {
                        Projection::Column { column, .. } => result.push(column.clone()),
                        Projection::Expression { expr, .. } => exprs.push(expr),
                        Projection::Star { .. } => {}
                    }
                }
                collect_join_conditions(select.from.as_ref(), &mut exprs);
                exprs.extend(select.where_clause.iter());
                exprs.extend(select.group_by.iter());
                exprs.extend(select.order_by.iter());
            }
            Statement::Insert(insert) => result.extend(insert.columns.iter().cloned()),
            Statement::Update(update) => {
                for (column, value) in &update.assignments {
                    result.push(column.clone());
                    exprs.push(value);
                }
                collect_join_conditions(Some(&update.table), &mut exprs);
                exprs.extend(update.where_clause.iter());
            }
            Statement::Delete(delete) => {
                collect_join_conditions(Some(&delete.table), &mut exprs);
                exprs.extend(delete.where_clause.iter());
            }
            Statement::CreateIndex(create) => result.extend(create.columns.iter().cloned()),
            _ => {}
        }
        let mut refs = vec![];
        for expr in exprs {
            expr.columns(&mut refs);
        }
        result.extend(refs.into_iter().cloned());
        result
    }

    /// Bind every column of the statement to its table.
    pub fn bind_columns(&self, schema: Option<&Schema>) -> TableNameMap {
        self.tables
            .find_table_names_by_column_segment(&self.columns(), schema)
    }
}

fn collect_join_conditions<'a>(segment: Option<&'a TableSegment>, exprs: &mut Vec<&'a Expr>) {
    if let Some(TableSegment::Join {
        left,
        right,
        condition,
    }) = segment
    {
        collect_join_conditions(Some(left.as_ref()), exprs);
        collect_join_conditions(Some(right.as_ref()), exprs);
        exprs.extend(condition.iter());
    }
}

/// Builds `SqlStatementContext`s against one database snapshot.
pub struct Binder<'a> {
    database: &'a Database,
}

impl<'a> Binder<'a> {
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    pub fn bind(&self, statement: Statement) -> Result<SqlStatementContext> {
        let mut tables = vec![];
        let mut subqueries: Vec<(&SubquerySegment, Option<&str>)> = vec![];
        let mut nested: Vec<&SubquerySegment> = vec![];
        match &statement {
            Statement::Select(select) => collect_select(select, &mut tables, &mut subqueries, &mut nested),
            Statement::Insert(insert) => {
                tables.push(insert.table.clone());
                if let Some(select) = &insert.select {
                    collect_select(select, &mut tables, &mut subqueries, &mut nested);
                }
            }
            Statement::Update(update) => {
                collect_table(&update.table, &mut tables, &mut subqueries);
                collect_expr_subqueries(update.where_clause.as_ref(), &mut nested);
            }
            Statement::Delete(delete) => {
                collect_table(&delete.table, &mut tables, &mut subqueries);
                collect_expr_subqueries(delete.where_clause.as_ref(), &mut nested);
            }
            Statement::CreateTable(create) => tables.push(create.table.clone()),
            Statement::AlterTable(alter) => {
                tables.extend(alter.table.iter().cloned());
                tables.extend(alter.rename_table.iter().cloned());
            }
            Statement::DropTable(drop) => tables.extend(drop.tables.iter().cloned()),
            Statement::CreateIndex(create) => tables.push(create.table.clone()),
            Statement::AlterIndex(alter) => tables.extend(alter.table.iter().cloned()),
            Statement::DropIndex(drop) => tables.extend(drop.table.iter().cloned()),
            Statement::CreateView(create) => tables.push(create.view.clone()),
            Statement::AlterView(alter) => {
                tables.push(alter.view.clone());
                tables.extend(alter.rename_view.iter().cloned());
            }
            Statement::DropView(drop) => tables.extend(drop.views.iter().cloned()),
            Statement::CreateSchema(_) | Statement::AlterSchema(_) | Statement::DropSchema(_) => {}
        }

        let mut subquery_contexts = BTreeMap::new();
        let mut subquery_tables: HashMap<String, Vec<SubqueryTableContext>> = HashMap::new();
        for (segment, alias) in subqueries {
            let context = self.bind(Statement::Select(segment.select.as_ref().clone()))?;
            let schema = self.schema(&context);
            let exposed = SubqueryTableContextEngine::create(
                &segment.select,
                context.tables_context(),
                alias,
                schema,
            );
            subquery_tables
                .entry(alias.unwrap_or("").to_owned())
                .or_default()
                .extend(exposed);
            subquery_contexts.insert(segment.start_index, context);
        }
        for segment in nested {
            let context = self.bind(Statement::Select(segment.select.as_ref().clone()))?;
            subquery_contexts.insert(segment.start_index, context);
        }

        let tables = TablesContext::new(tables, subquery_tables)?;
        debug!(
            "bind {} with tables {:?}",
            statement,
            tables.table_names()
        );

        Ok(SqlStatementContext {
            database_type: self.database.protocol_type(),
            statement,
            tables,
            subquery_contexts,
        })
    }

    fn schema(&self, context: &SqlStatementContext) -> Option<&'a Schema> {
        self.database
            .schema(&context.schema_name(self.database.name()))
            .map(|schema| schema.as_ref())
    }
}

fn collect_select<'s>(
    select: &'s SelectStmt,
    tables: &mut Vec<SimpleTableSegment>,
    subqueries: &mut Vec<(&'s SubquerySegment, Option<&'s str>)>,
    nested: &mut Vec<&'s SubquerySegment>,
) {
    if let Some(from) = &select.from {
        collect_table(from, tables, subqueries);
    }
    collect_expr_subqueries(select.where_clause.as_ref(), nested);
    for projection in &select.projections {
        if let Projection::Expression { expr, .. } = projection {
            collect_expr_subqueries(Some(expr), nested);
        }
    }
}

fn collect_table<'s>(
    segment: &'s TableSegment,
    tables: &mut Vec<SimpleTableSegment>,
    subqueries: &mut Vec<(&'s SubquerySegment, Option<&'s str>)>,
) {
    match segment {
        TableSegment::Simple(table) => tables.push(table.clone()),
        TableSegment::Subquery { subquery, alias } => subqueries.push((subquery, alias.as_deref())),
        TableSegment::Join { left, right, .. } => {
            collect_table(left, tables, subqueries);
            collect_table(right, tables, subqueries);
        }
    }
}

fn collect_expr_subqueries<'s>(expr: Option<&'s Expr>, nested: &mut Vec<&'s SubquerySegment>) {
    match expr {
        Some(Expr::Subquery(subquery)) => nested.push(subquery),
        Some(Expr::Binary { left, right, .. }) => {
            collect_expr_subqueries(Some(left.as_ref()), nested);
            collect_expr_subqueries(Some(right.as_ref()), nested);
        }
        Some(Expr::Function { args, .. }) => {
            for arg in args {
                collect_expr_subqueries(Some(arg), nested);
            }
        }
        _ => {}
    }
}

/// Every simple table a select reads, sub-selects included.
pub fn select_tables(select: &SelectStmt) -> Vec<SimpleTableSegment> {
    let mut tables = vec![];
    let mut subqueries = vec![];
    let mut nested = vec![];
    collect_select(select, &mut tables, &mut subqueries, &mut nested);
    for (segment, _) in subqueries {
        tables.extend(select_tables(&segment.select));
    }
    for segment in nested {
        tables.extend(select_tables(&segment.select));
    }
    tables
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        ast::{segment::ColumnSegment, CreateTableStmt},
        catalog::{column::ColumnMetaData, resource::Resource, tableinfo::TableMetaData},
        error::Error,
        rule::RuleMetaData,
        types::LogicalType,
    };

    fn database() -> Database {
        let schema = Schema::new(vec![
            TableMetaData::new(
                "t_order",
                vec![
                    ColumnMetaData::new("order_id", LogicalType::Int64, true),
                    ColumnMetaData::new("user_id", LogicalType::Int64, false),
                ],
                vec![],
                vec![],
            ),
            TableMetaData::new(
                "t_user",
                vec![
                    ColumnMetaData::new("user_id", LogicalType::Int64, true),
                    ColumnMetaData::new("name", LogicalType::String, false),
                ],
                vec![],
                vec![],
            ),
        ]);
        let mut schemas = HashMap::new();
        schemas.insert("sharding_db".to_owned(), Arc::new(schema));
        Database::new(
            "sharding_db",
            DatabaseType::MySQL,
            Arc::new(Resource::default()),
            Arc::new(RuleMetaData::default()),
            schemas,
        )
    }

    #[test]
    fn test_bind_select_with_subquery() {
        // SELECT u.name, t.order_id FROM t_user u JOIN t_order o
        //   JOIN (SELECT order_id, user_id FROM t_order) t ON u.user_id = t.user_id
        let sub = SelectStmt {
            projections: vec![
                Projection::Column {
                    column: ColumnSegment::new("order_id"),
                    alias: None,
                },
                Projection::Column {
                    column: ColumnSegment::new("user_id"),
                    alias: None,
                },
            ],
            from: Some(TableSegment::Simple(SimpleTableSegment::new("t_order"))),
            ..Default::default()
        };
        let select = SelectStmt {
            projections: vec![
                Projection::Column {
                    column: ColumnSegment::owned("u", "name"),
                    alias: None,
                },
                Projection::Column {
                    column: ColumnSegment::owned("t", "order_id"),
                    alias: None,
                },
            ],
            from: Some(TableSegment::Join {
                left: Box::new(TableSegment::Join {
                    left: Box::new(TableSegment::Simple(SimpleTableSegment::new("t_user").with_alias("u"))),
                    right: Box::new(TableSegment::Simple(SimpleTableSegment::new("t_order").with_alias("o"))),
                    condition: None,
                }),
                right: Box::new(TableSegment::Subquery {
                    subquery: SubquerySegment {
                        start_index: 40,
                        select: Box::new(sub),
                    },
                    alias: Some("t".to_owned()),
                }),
                condition: Some(Expr::Binary {
                    left: Box::new(Expr::Column(ColumnSegment::owned("u", "user_id"))),
                    op: "=".to_owned(),
                    right: Box::new(Expr::Column(ColumnSegment::owned("t", "user_id"))),
                }),
            }),
            ..Default::default()
        };

        let db = database();
        let ctx = Binder::new(&db).bind(Statement::Select(select)).unwrap();
        assert_eq!(ctx.tables_context().table_names(), &["t_user", "t_order"]);
        assert!(ctx.subquery_contexts().contains_key(&40));
        assert_eq!(ctx.schema_name(db.name()), "sharding_db");

        let bound = ctx.bind_columns(db.schema("sharding_db").map(|s| s.as_ref()));
        assert_eq!(bound.get("u.name"), Some("t_user"));
        assert_eq!(bound.get("t.order_id"), Some("t_order"));
        assert_eq!(bound.get("t.user_id"), Some("t_order"));
        assert_eq!(bound.get("u.user_id"), Some("t_user"));
    }

    #[test]
    fn test_bind_rejects_two_schemas() {
        let select = SelectStmt {
            from: Some(TableSegment::Join {
                left: Box::new(TableSegment::Simple(SimpleTableSegment::new("t_order").with_owner("s1"))),
                right: Box::new(TableSegment::Simple(SimpleTableSegment::new("t_user").with_owner("s2"))),
                condition: None,
            }),
            ..Default::default()
        };
        let db = database();
        assert!(matches!(
            Binder::new(&db).bind(Statement::Select(select)),
            Err(Error::Bind(_))
        ));
    }

    #[test]
    fn test_bind_create_table() {
        let db = database();
        let ctx = Binder::new(&db)
            .bind(Statement::CreateTable(CreateTableStmt {
                table: SimpleTableSegment::new("t_new").with_owner("other"),
                columns: vec![],
                if_not_exists: false,
            }))
            .unwrap();
        assert_eq!(ctx.kind(), StatementKind::CreateTable);
        assert_eq!(ctx.schema_name(db.name()), "other");
    }
}
