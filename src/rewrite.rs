use crate::{route::RouteUnit, types::value::Value};

/// Rewritten SQL text with its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlRewriteUnit {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl SqlRewriteUnit {
    pub fn new(sql: &str, parameters: Vec<Value>) -> Self {
        Self {
            sql: sql.to_owned(),
            parameters,
        }
    }
}

/// Output of the rewrite engine: one unit when nothing was routed, else one per
/// route unit in the order the route context produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlRewriteResult {
    Generic(SqlRewriteUnit),
    Route(Vec<(RouteUnit, SqlRewriteUnit)>),
}
