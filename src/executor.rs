use std::collections::HashSet;

use log::debug;

use crate::{
    binder::SqlStatementContext,
    catalog::Database,
    error::{Error::Internal, Result},
    fmt_err,
    rewrite::{SqlRewriteResult, SqlRewriteUnit},
    types::value::Value,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlUnit {
    pub sql: String,
    pub parameters: Vec<Value>,
}

/// What the executor runs: one SQL on one data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionUnit {
    pub data_source_name: String,
    pub sql_unit: SqlUnit,
}

impl ExecutionUnit {
    pub fn new(data_source_name: &str, sql_unit: SqlUnit) -> Self {
        Self {
            data_source_name: data_source_name.to_owned(),
            sql_unit,
        }
    }
}

impl From<SqlRewriteUnit> for SqlUnit {
    fn from(unit: SqlRewriteUnit) -> Self {
        Self {
            sql: unit.sql,
            parameters: unit.parameters,
        }
    }
}

pub struct ExecutionContextBuilder;

impl ExecutionContextBuilder {
    /// Turn a rewrite result into execution units. Units equal in data source, SQL
    /// and parameters collapse into the first one.
    pub fn build(
        database: &Database,
        rewrite_result: SqlRewriteResult,
        ctx: &SqlStatementContext,
    ) -> Result<Vec<ExecutionUnit>> {
        let units = match rewrite_result {
            SqlRewriteResult::Generic(unit) => {
                let names = database.resource().all_instance_data_source_names();
                let data_source_name = names.first().ok_or_else(|| {
                    Internal(fmt_err!(
                        "database {} has no data source to run {} on",
                        database.name(),
                        ctx.statement()
                    ))
                })?;
                vec![ExecutionUnit::new(data_source_name, unit.into())]
            }
            SqlRewriteResult::Route(units) => units
                .into_iter()
                .map(|(route_unit, unit)| {
                    ExecutionUnit::new(&route_unit.data_source_mapper.actual_name, unit.into())
                })
                .collect(),
        };

        let mut seen = HashSet::with_capacity(units.len());
        let result: Vec<ExecutionUnit> = units
            .into_iter()
            .filter(|unit| seen.insert(unit.clone()))
            .collect();
        debug!("build {} execution units for {}", result.len(), ctx.statement());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::{
        ast::{SelectStmt, Statement},
        binder::Binder,
        catalog::resource::{DataSourceFactory, MemoryDataSourceFactory, Resource},
        config::datasource::DataSourceProperties,
        route::{RouteMapper, RouteUnit},
        rule::RuleMetaData,
        types::DatabaseType,
    };

    fn database(data_sources: &[(&str, &str)]) -> Database {
        let factory = MemoryDataSourceFactory::new();
        let resource = Resource::new(
            data_sources
                .iter()
                .map(|(name, url)| {
                    (name.to_string(), factory.create(name, &DataSourceProperties::new(url)).unwrap())
                })
                .collect(),
        );
        Database::new(
            "sharding_db",
            DatabaseType::MySQL,
            Arc::new(resource),
            Arc::new(RuleMetaData::default()),
            HashMap::new(),
        )
    }

    fn select_ctx(db: &Database) -> SqlStatementContext {
        Binder::new(db)
            .bind(Statement::Select(SelectStmt::default()))
            .unwrap()
    }

    #[test]
    fn test_route_units_deduplicated() {
        let db = database(&[("ds0", "mem://ds0")]);
        let ctx = select_ctx(&db);
        let mut units = vec![];
        for table in ["t_order_0", "t_order_1"] {
            units.push((
                RouteUnit::new(
                    RouteMapper::new("ds0", "ds0"),
                    vec![RouteMapper::new("t_order", table)],
                ),
                SqlRewriteUnit::new("SELECT 1", vec![Value::Int(1)]),
            ));
        }
        let result = ExecutionContextBuilder::build(&db, SqlRewriteResult::Route(units), &ctx).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].data_source_name, "ds0");
    }

    #[test]
    fn test_route_order_kept() {
        let db = database(&[("ds_0", "mem://ds_0"), ("ds_1", "mem://ds_1")]);
        let ctx = select_ctx(&db);
        let units = ["ds_1", "ds_0", "ds_1"]
            .iter()
            .map(|ds| {
                (
                    RouteUnit::new(
                        RouteMapper::new(ds, ds),
                        vec![RouteMapper::new("t_order", "t_order_0")],
                    ),
                    SqlRewriteUnit::new("SELECT * FROM t_order_0", vec![]),
                )
            })
            .collect();
        let result = ExecutionContextBuilder::build(&db, SqlRewriteResult::Route(units), &ctx).unwrap();
        let names: Vec<&str> = result.iter().map(|unit| unit.data_source_name.as_str()).collect();
        assert_eq!(names, vec!["ds_1", "ds_0"]);
    }

    #[test]
    fn test_generic_uses_first_instance() {
        let db = database(&[
            ("ds_a", "mysql://10.0.0.1:3306/a"),
            ("ds_b", "mysql://10.0.0.1:3306/b"),
            ("ds_c", "mysql://10.0.0.2:3306/c"),
        ]);
        let ctx = select_ctx(&db);
        let result = ExecutionContextBuilder::build(
            &db,
            SqlRewriteResult::Generic(SqlRewriteUnit::new("SELECT 1", vec![])),
            &ctx,
        )
        .unwrap();
        assert_eq!(result, vec![ExecutionUnit::new("ds_a", SqlUnit {
            sql: "SELECT 1".to_owned(),
            parameters: vec![],
        })]);
    }

    #[test]
    fn test_generic_without_data_source() {
        let db = database(&[]);
        let ctx = select_ctx(&db);
        let result = ExecutionContextBuilder::build(
            &db,
            SqlRewriteResult::Generic(SqlRewriteUnit::new("SELECT 1", vec![])),
            &ctx,
        );
        assert!(matches!(result, Err(Internal(_))));
    }
}
