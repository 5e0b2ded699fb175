pub mod ddl;

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use self::ddl::{
    AlterIndexValidator, AlterTableValidator, AlterViewValidator, CreateIndexValidator,
    CreateTableValidator, CreateViewValidator, DropIndexValidator, DropTableValidator,
};
use super::RouteContext;
use crate::{
    ast::{segment::SimpleTableSegment, StatementKind},
    binder::SqlStatementContext,
    catalog::{schema::Schema, Database},
    config::props::ConfigurationProperties,
    error::{
        Error::{NoSuchTable, TableExists, Validate},
        Result,
    },
    fmt_err,
    rule::sharding::ShardingRule,
    types::value::Value,
};

/// Checks one statement shape before and after routing. Both phases default to no-op.
pub trait ShardingStatementValidator: Send + Sync {
    fn pre_validate(
        &self,
        _rule: &ShardingRule,
        _ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
    ) -> Result<()> {
        Ok(())
    }

    fn post_validate(
        &self,
        _rule: &ShardingRule,
        _ctx: &SqlStatementContext,
        _params: &[Value],
        _database: &Database,
        _props: &ConfigurationProperties,
        _route_context: &RouteContext,
    ) -> Result<()> {
        Ok(())
    }
}

/// Statement kind => validator.
pub struct ValidatorRegistry {
    validators: HashMap<StatementKind, Box<dyn ShardingStatementValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        let mut validators: HashMap<StatementKind, Box<dyn ShardingStatementValidator>> =
            HashMap::new();
        validators.insert(StatementKind::CreateTable, Box::new(CreateTableValidator));
        validators.insert(StatementKind::AlterTable, Box::new(AlterTableValidator));
        validators.insert(StatementKind::DropTable, Box::new(DropTableValidator));
        validators.insert(StatementKind::CreateIndex, Box::new(CreateIndexValidator));
        validators.insert(StatementKind::AlterIndex, Box::new(AlterIndexValidator));
        validators.insert(StatementKind::DropIndex, Box::new(DropIndexValidator));
        validators.insert(StatementKind::CreateView, Box::new(CreateViewValidator));
        validators.insert(StatementKind::AlterView, Box::new(AlterViewValidator));
        Self { validators }
    }

    /// Shared registry, built on first use.
    pub fn global() -> &'static ValidatorRegistry {
        static REGISTRY: OnceLock<ValidatorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(ValidatorRegistry::new)
    }

    pub fn get(&self, kind: StatementKind) -> Option<&dyn ShardingStatementValidator> {
        self.validators.get(&kind).map(|v| v.as_ref())
    }

    pub fn pre_validate(
        &self,
        ctx: &SqlStatementContext,
        params: &[Value],
        database: &Database,
    ) -> Result<()> {
        let validator = match self.get(ctx.kind()) {
            Some(validator) => validator,
            None => return Ok(()),
        };
        debug!("pre validate {}", ctx.statement());
        with_sharding_rule(database, |rule| {
            validator.pre_validate(rule, ctx, params, database)
        })
    }

    pub fn post_validate(
        &self,
        ctx: &SqlStatementContext,
        params: &[Value],
        database: &Database,
        props: &ConfigurationProperties,
        route_context: &RouteContext,
    ) -> Result<()> {
        let validator = match self.get(ctx.kind()) {
            Some(validator) => validator,
            None => return Ok(()),
        };
        debug!(
            "post validate {} over {} route units",
            ctx.statement(),
            route_context.route_units().len()
        );
        with_sharding_rule(database, |rule| {
            validator.post_validate(rule, ctx, params, database, props, route_context)
        })
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// databases without sharding configured validate against an empty rule
fn with_sharding_rule<F>(database: &Database, f: F) -> Result<()>
where
    F: FnOnce(&ShardingRule) -> Result<()>,
{
    match database.rule_meta_data().sharding_rule() {
        Some(rule) => f(rule),
        None => f(&ShardingRule::default()),
    }
}

/// Schema the statement targets: its explicit owner, else the dialect default.
pub(crate) fn resolve_schema<'a>(ctx: &SqlStatementContext, database: &'a Database) -> Option<&'a Schema> {
    database
        .schema(&ctx.schema_name(database.name()))
        .map(|schema| schema.as_ref())
}

pub(crate) fn validate_table_not_exist(schema: Option<&Schema>, tables: &[&SimpleTableSegment]) -> Result<()> {
    for table in tables {
        if schema.map(|s| s.contains_table(&table.name)).unwrap_or(false) {
            return Err(TableExists(fmt_err!("table '{}' already exists", table.name)));
        }
    }
    Ok(())
}

pub(crate) fn validate_table_exist(schema: Option<&Schema>, tables: &[&SimpleTableSegment]) -> Result<()> {
    for table in tables {
        if !schema.map(|s| s.contains_table(&table.name)).unwrap_or(false) {
            return Err(NoSuchTable(fmt_err!("table '{}' does not exist", table.name)));
        }
    }
    Ok(())
}

pub(crate) fn validate_sharding_table(rule: &ShardingRule, tables: &[SimpleTableSegment]) -> Result<()> {
    for table in tables {
        if rule.is_sharding_table(&table.name) {
            return Err(Validate(fmt_err!(
                "can not support operation on sharding table '{}'",
                table.name
            )));
        }
    }
    Ok(())
}

/// A sharding or broadcast table has to land on exactly as many route units as it
/// has actual data nodes.
pub(crate) fn is_route_unit_data_node_different_size(
    rule: &ShardingRule,
    route_context: &RouteContext,
    table_name: &str,
) -> bool {
    if !rule.is_sharding_table(table_name) && !rule.is_broadcast_table(table_name) {
        return false;
    }
    rule.actual_data_node_count(table_name)
        .map(|count| count != route_context.route_units().len())
        .unwrap_or(false)
}
