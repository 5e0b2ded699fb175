use std::fmt::Display;

use serde_derive::{Deserialize, Serialize};

use crate::{
    error::{Error::Config, Result},
    fmt_err,
};

/// One physical table: `ds_0.t_order_0` or, schema-qualified, `ds_0.public.t_order_0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source_name: String,
    pub schema_name: Option<String>,
    pub table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: &str, schema_name: Option<&str>, table_name: &str) -> Self {
        Self {
            data_source_name: data_source_name.to_owned(),
            schema_name: schema_name.map(|s| s.to_owned()),
            table_name: table_name.to_owned(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.trim().split('.').collect();
        match parts.as_slice() {
            [ds, table] if !ds.is_empty() && !table.is_empty() => Ok(Self::new(ds, None, table)),
            [ds, schema, table] if !ds.is_empty() && !table.is_empty() => {
                Ok(Self::new(ds, Some(schema), table))
            }
            _ => Err(Config(fmt_err!(
                "invalid data node `{text}`, expected `ds.table` or `ds.schema.table`"
            ))),
        }
    }
}

impl Display for DataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema_name {
            Some(schema) => write!(f, "{}.{}.{}", self.data_source_name, schema, self.table_name),
            None => write!(f, "{}.{}", self.data_source_name, self.table_name),
        }
    }
}

/// Rules that know which physical tables back a logical table.
pub trait DataNodeContainedRule {
    /// Lower-cased logical table names.
    fn all_tables(&self) -> Vec<String>;

    fn find_data_nodes(&self, table_name: &str) -> Vec<DataNode>;

    /// Mutable rules follow DDL at runtime; immutable ones are fixed by configuration.
    fn is_mutable(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let node = DataNode::parse("ds_0.t_order_1").unwrap();
        assert_eq!(node, DataNode::new("ds_0", None, "t_order_1"));
        assert_eq!(
            DataNode::parse("ds_0.public.t_order").unwrap().to_string(),
            "ds_0.public.t_order"
        );
        assert!(DataNode::parse("t_order").is_err());
        assert!(DataNode::parse(".t_order").is_err());
    }
}
