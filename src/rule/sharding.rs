use std::collections::{BTreeSet, HashMap};

use serde_derive::{Deserialize, Serialize};

use super::datanode::{DataNode, DataNodeContainedRule};
use crate::{
    error::{Error::Config, Result},
    fmt_err,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingTableRuleConfiguration {
    pub logic_table: String,
    /// `ds.table` entries, e.g. `ds_0.t_order_0`
    pub actual_data_nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRuleConfiguration {
    #[serde(default)]
    pub tables: Vec<ShardingTableRuleConfiguration>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRule {
    pub logic_table: String,
    pub actual_data_nodes: Vec<DataNode>,
}

/// Statically sharded and broadcast tables. Placement never changes at runtime.
#[derive(Debug, Clone, Default)]
pub struct ShardingRule {
    config: ShardingRuleConfiguration,
    table_rules: HashMap<String, TableRule>,
    broadcast_tables: BTreeSet<String>,
    data_source_names: Vec<String>,
}

impl ShardingRule {
    pub fn new(config: &ShardingRuleConfiguration, data_source_names: &[String]) -> Result<Self> {
        let mut table_rules = HashMap::new();
        for table in &config.tables {
            let mut nodes = Vec::with_capacity(table.actual_data_nodes.len());
            for each in &table.actual_data_nodes {
                let node = DataNode::parse(each)?;
                if !data_source_names.contains(&node.data_source_name) {
                    return Err(Config(fmt_err!(
                        "data node {node} of table {} refers to unknown data source",
                        table.logic_table
                    )));
                }
                nodes.push(node);
            }
            if nodes.is_empty() {
                return Err(Config(fmt_err!(
                    "sharding table {} has no actual data nodes",
                    table.logic_table
                )));
            }
            table_rules.insert(
                table.logic_table.to_lowercase(),
                TableRule {
                    logic_table: table.logic_table.clone(),
                    actual_data_nodes: nodes,
                },
            );
        }

        Ok(Self {
            config: config.clone(),
            table_rules,
            broadcast_tables: config
                .broadcast_tables
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            data_source_names: data_source_names.to_vec(),
        })
    }

    pub fn configuration(&self) -> &ShardingRuleConfiguration {
        &self.config
    }

    pub fn is_sharding_table(&self, table_name: &str) -> bool {
        self.table_rules.contains_key(&table_name.to_lowercase())
    }

    pub fn is_broadcast_table(&self, table_name: &str) -> bool {
        self.broadcast_tables.contains(&table_name.to_lowercase())
    }

    pub fn find_table_rule(&self, table_name: &str) -> Option<&TableRule> {
        self.table_rules.get(&table_name.to_lowercase())
    }

    /// Number of physical tables a logic table is spread over; broadcast tables live
    /// on every data source.
    pub fn actual_data_node_count(&self, table_name: &str) -> Option<usize> {
        if let Some(rule) = self.find_table_rule(table_name) {
            return Some(rule.actual_data_nodes.len());
        }
        if self.is_broadcast_table(table_name) {
            return Some(self.data_source_names.len());
        }
        None
    }

    /// Lower-cased names of every physical table behind a sharding table.
    pub fn all_actual_tables(&self) -> Vec<String> {
        self.table_rules
            .values()
            .flat_map(|rule| rule.actual_data_nodes.iter())
            .map(|node| node.table_name.to_lowercase())
            .collect()
    }

    /// Logic table name for an actual table name, e.g. `t_order_0` => `t_order`.
    pub fn find_logic_table_by_actual_table(&self, actual_table: &str) -> Option<&str> {
        self.table_rules.values().find_map(|rule| {
            rule.actual_data_nodes
                .iter()
                .any(|node| node.table_name.eq_ignore_ascii_case(actual_table))
                .then_some(rule.logic_table.as_str())
        })
    }
}

impl DataNodeContainedRule for ShardingRule {
    fn all_tables(&self) -> Vec<String> {
        let mut result: Vec<String> = self.table_rules.keys().cloned().collect();
        result.extend(self.broadcast_tables.iter().cloned());
        result.sort();
        result
    }

    fn find_data_nodes(&self, table_name: &str) -> Vec<DataNode> {
        if let Some(rule) = self.find_table_rule(table_name) {
            return rule.actual_data_nodes.clone();
        }
        if self.is_broadcast_table(table_name) {
            return self
                .data_source_names
                .iter()
                .map(|ds| DataNode::new(ds, None, &table_name.to_lowercase()))
                .collect();
        }
        vec![]
    }

    fn is_mutable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn t_order_config() -> ShardingRuleConfiguration {
        ShardingRuleConfiguration {
            tables: vec![ShardingTableRuleConfiguration {
                logic_table: "t_order".to_owned(),
                actual_data_nodes: vec![
                    "ds_0.t_order_0".to_owned(),
                    "ds_0.t_order_1".to_owned(),
                    "ds_1.t_order_0".to_owned(),
                    "ds_1.t_order_1".to_owned(),
                ],
            }],
            broadcast_tables: vec!["t_config".to_owned()],
        }
    }

    #[test]
    fn test_sharding_rule() {
        let rule =
            ShardingRule::new(&t_order_config(), &["ds_0".to_owned(), "ds_1".to_owned()]).unwrap();
        assert!(rule.is_sharding_table("T_ORDER"));
        assert!(rule.is_broadcast_table("t_config"));
        assert_eq!(rule.actual_data_node_count("t_order"), Some(4));
        assert_eq!(rule.actual_data_node_count("t_config"), Some(2));
        assert_eq!(rule.actual_data_node_count("t_user"), None);
        assert_eq!(rule.find_logic_table_by_actual_table("t_order_1"), Some("t_order"));
        assert_eq!(rule.all_tables(), vec!["t_config".to_owned(), "t_order".to_owned()]);
        assert!(!rule.is_mutable());
    }

    #[test]
    fn test_unknown_data_source() {
        assert!(ShardingRule::new(&t_order_config(), &["ds_0".to_owned()]).is_err());
    }
}
