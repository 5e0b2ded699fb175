use std::collections::HashSet;

use super::{
    is_route_unit_data_node_different_size, resolve_schema, validate_sharding_table,
    validate_table_exist, validate_table_not_exist, ShardingStatementValidator,
};
use crate::{
    ast::segment::IndexSegment,
    statement_of,
    binder::{select_tables, SqlStatementContext},
    catalog::{schema::Schema, Database},
    config::props::ConfigurationProperties,
    error::{
        Error::{IndexExists, NoSuchIndex, Route, Validate},
        Result,
    },
    fmt_err,
    route::RouteContext,
    rule::sharding::ShardingRule,
    types::value::Value,
};

// index owner when given, else the default schema of the database
fn index_schema<'a>(ctx: &SqlStatementContext, database: &'a Database, index: &IndexSegment) -> Option<&'a Schema> {
    let schema_name = match &index.owner {
        Some(owner) => owner.to_lowercase(),
        None => ctx.database_type().default_schema(database.name()),
    };
    database.schema(&schema_name).map(|schema| schema.as_ref())
}

fn contains_index(schema: Option<&Schema>, index: &IndexSegment) -> bool {
    schema
        .map(|schema| schema.contains_index(None, &index.name))
        .unwrap_or(false)
}

pub struct CreateTableValidator;

impl ShardingStatementValidator for CreateTableValidator {
    /// ```text
    /// 1. table can't already exist in the schema, unless IF NOT EXISTS
    /// 2. table can't have multi same column name
    /// 3. table supports at most one primary key column
    /// ```
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), CreateTable);
        if !stmt.if_not_exists {
            validate_table_not_exist(resolve_schema(ctx, database), &[&stmt.table])?;
        }

        let mut column_names = HashSet::new();
        for col in &stmt.columns {
            if !column_names.insert(col.name.to_lowercase()) {
                return Err(Validate(fmt_err!("column {} is fuzzy in your SQL", col.name)));
            }
        }
        if stmt.columns.iter().filter(|col| col.primary_key).count() > 1 {
            return Err(Validate(fmt_err!(
                "table {} has more than one primary key",
                stmt.table.name
            )));
        }
        Ok(())
    }

    fn post_validate(
        &self,
        rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
        _props: &ConfigurationProperties,
        route_context: &RouteContext,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), CreateTable);
        if is_route_unit_data_node_different_size(rule, route_context, &stmt.table.name) {
            return Err(Route(fmt_err!(
                "CREATE TABLE ... statement can not route correctly for tables {:?}",
                ctx.tables_context().table_names()
            )));
        }
        Ok(())
    }
}

pub struct AlterTableValidator;

impl ShardingStatementValidator for AlterTableValidator {
    fn pre_validate(
        &self,
        rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), AlterTable);
        let rename = match &stmt.rename_table {
            Some(rename) => rename,
            None => return Ok(()),
        };
        let mut renamed = vec![rename.clone()];
        renamed.extend(stmt.table.iter().cloned());
        validate_sharding_table(rule, &renamed)?;
        validate_table_not_exist(resolve_schema(ctx, database), &[rename])
    }
}

pub struct DropTableValidator;

impl ShardingStatementValidator for DropTableValidator {
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), DropTable);
        if stmt.if_exists {
            return Ok(());
        }
        let tables: Vec<_> = stmt.tables.iter().collect();
        validate_table_exist(resolve_schema(ctx, database), &tables)
    }

    fn post_validate(
        &self,
        rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
        _props: &ConfigurationProperties,
        route_context: &RouteContext,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), DropTable);
        for table in &stmt.tables {
            if is_route_unit_data_node_different_size(rule, route_context, &table.name) {
                return Err(Route(fmt_err!(
                    "DROP TABLE ... statement can not route correctly for tables {:?}",
                    ctx.tables_context().table_names()
                )));
            }
        }
        Ok(())
    }
}

pub struct CreateIndexValidator;

impl ShardingStatementValidator for CreateIndexValidator {
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), CreateIndex);
        let schema = resolve_schema(ctx, database);
        validate_table_exist(schema, &[&stmt.table])?;
        if !stmt.if_not_exists && contains_index(schema, &stmt.index) {
            return Err(IndexExists(fmt_err!("index '{}' already exists", stmt.index.name)));
        }
        Ok(())
    }
}

pub struct AlterIndexValidator;

impl ShardingStatementValidator for AlterIndexValidator {
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), AlterIndex);
        let schema = index_schema(ctx, database, &stmt.index);
        if !contains_index(schema, &stmt.index) {
            return Err(NoSuchIndex(fmt_err!("index '{}' does not exist", stmt.index.name)));
        }
        if let Some(rename) = &stmt.rename_index {
            if contains_index(schema, rename) {
                return Err(IndexExists(fmt_err!("index '{}' already exists", rename.name)));
            }
        }
        Ok(())
    }
}

pub struct DropIndexValidator;

impl ShardingStatementValidator for DropIndexValidator {
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), DropIndex);
        if stmt.if_exists {
            return Ok(());
        }
        for index in &stmt.indexes {
            if !contains_index(index_schema(ctx, database, index), index) {
                return Err(NoSuchIndex(fmt_err!("index '{}' does not exist", index.name)));
            }
        }
        Ok(())
    }
}

pub struct CreateViewValidator;

impl ShardingStatementValidator for CreateViewValidator {
    fn pre_validate(
        &self,
        rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), CreateView);
        validate_sharding_table(rule, &select_tables(&stmt.select))
    }
}

pub struct AlterViewValidator;

impl ShardingStatementValidator for AlterViewValidator {
    fn pre_validate(
        &self,
        rule: &ShardingRule,
        ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
    ) -> Result<()> {
        let stmt = statement_of!(ctx.statement(), AlterView);
        match &stmt.select {
            Some(select) => validate_sharding_table(rule, &select_tables(select)),
            None => Ok(()),
        }
    }
}
