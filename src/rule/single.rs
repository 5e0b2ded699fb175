use std::collections::HashMap;

use log::debug;
use serde_derive::{Deserialize, Serialize};

use super::datanode::{DataNode, DataNodeContainedRule};
use crate::{catalog::resource::Resource, error::Result, types::DatabaseType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTableRuleConfiguration {
    /// Where single tables created by unrouted DDL land; the first data source when unset.
    #[serde(default)]
    pub default_data_source: Option<String>,
}

/// Bookkeeping of tables without static placement: logical table => the data
/// source + schema currently hosting it. Follows DDL at runtime.
#[derive(Debug, Clone, Default)]
pub struct SingleTableRule {
    config: SingleTableRuleConfiguration,
    data_source_names: Vec<String>,
    single_table_data_nodes: HashMap<String, Vec<DataNode>>,
}

impl SingleTableRule {
    /// Discover single tables on every data source, skipping `excluded_tables`
    /// (tables owned by immutable rules).
    pub fn new(
        config: &SingleTableRuleConfiguration,
        database_name: &str,
        database_type: DatabaseType,
        resource: &Resource,
        excluded_tables: &[String],
    ) -> Result<Self> {
        let mut rule = Self {
            config: config.clone(),
            data_source_names: resource.data_source_names(),
            single_table_data_nodes: HashMap::new(),
        };
        let default_schema = database_type.default_schema(database_name);
        for (ds_name, ds) in resource.data_sources() {
            for table in ds.load_tables(&default_schema, &[])? {
                let lower = table.name.to_lowercase();
                if excluded_tables.contains(&lower) {
                    continue;
                }
                rule.put(ds_name, &default_schema, &table.name);
            }
        }
        debug!(
            "single table rule of {database_name} holds {} tables",
            rule.single_table_data_nodes.len()
        );

        Ok(rule)
    }

    pub fn configuration(&self) -> &SingleTableRuleConfiguration {
        &self.config
    }

    /// Data source new single tables are created on.
    pub fn default_data_source(&self) -> Option<&str> {
        self.config
            .default_data_source
            .as_deref()
            .or_else(|| self.data_source_names.first().map(|s| s.as_str()))
    }

    pub fn put(&mut self, data_source_name: &str, schema_name: &str, table_name: &str) {
        if !self.data_source_names.iter().any(|n| n == data_source_name) {
            return;
        }
        let node = DataNode::new(data_source_name, Some(&schema_name.to_lowercase()), table_name);
        let nodes = self
            .single_table_data_nodes
            .entry(table_name.to_lowercase())
            .or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    pub fn remove(&mut self, schema_name: &str, table_name: &str) {
        let lower = table_name.to_lowercase();
        if let Some(nodes) = self.single_table_data_nodes.get_mut(&lower) {
            nodes.retain(|node| {
                !node
                    .schema_name
                    .as_deref()
                    .map(|s| s.eq_ignore_ascii_case(schema_name))
                    .unwrap_or(false)
            });
            if nodes.is_empty() {
                self.single_table_data_nodes.remove(&lower);
            }
        }
    }

    pub fn find_data_node(&self, schema_name: &str, table_name: &str) -> Option<&DataNode> {
        self.single_table_data_nodes
            .get(&table_name.to_lowercase())?
            .iter()
            .find(|node| {
                node.schema_name
                    .as_deref()
                    .map(|s| s.eq_ignore_ascii_case(schema_name))
                    .unwrap_or(false)
            })
    }

    pub fn contains(&self, schema_name: &str, table_name: &str) -> bool {
        self.find_data_node(schema_name, table_name).is_some()
    }
}

impl DataNodeContainedRule for SingleTableRule {
    fn all_tables(&self) -> Vec<String> {
        let mut result: Vec<String> = self.single_table_data_nodes.keys().cloned().collect();
        result.sort();
        result
    }

    fn find_data_nodes(&self, table_name: &str) -> Vec<DataNode> {
        self.single_table_data_nodes
            .get(&table_name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn is_mutable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> SingleTableRule {
        SingleTableRule {
            config: SingleTableRuleConfiguration::default(),
            data_source_names: vec!["ds_0".to_owned(), "ds_1".to_owned()],
            single_table_data_nodes: HashMap::new(),
        }
    }

    #[test]
    fn test_put_and_remove() {
        let mut rule = rule();
        rule.put("ds_0", "public", "T_User");
        rule.put("ds_0", "public", "t_user");
        rule.put("ds_9", "public", "t_unknown");
        assert_eq!(rule.find_data_nodes("t_user").len(), 1);
        assert!(rule.contains("PUBLIC", "t_user"));
        assert!(!rule.contains("public", "t_unknown"));

        rule.put("ds_1", "other", "t_user");
        rule.remove("public", "t_user");
        assert_eq!(rule.all_tables(), vec!["t_user".to_owned()]);
        rule.remove("other", "t_user");
        assert!(rule.all_tables().is_empty());
        assert_eq!(rule.default_data_source(), Some("ds_0"));
    }
}
