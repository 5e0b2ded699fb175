pub mod datanode;
pub mod sharding;
pub mod single;
pub mod transaction;

use std::sync::Arc;

use log::debug;
use serde_derive::{Deserialize, Serialize};

use self::{
    datanode::DataNodeContainedRule,
    sharding::{ShardingRule, ShardingRuleConfiguration},
    single::{SingleTableRule, SingleTableRuleConfiguration},
    transaction::{TransactionRule, TransactionRuleConfiguration},
};
use crate::{catalog::resource::Resource, error::Result, types::DatabaseType};

/// User supplied rule configuration, database scoped or global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfiguration {
    Sharding(ShardingRuleConfiguration),
    SingleTable(SingleTableRuleConfiguration),
    Transaction(TransactionRuleConfiguration),
}

impl RuleConfiguration {
    pub fn is_global(&self) -> bool {
        matches!(self, RuleConfiguration::Transaction(_))
    }
}

/// Rule instance derived from a configuration.
#[derive(Debug, Clone)]
pub enum Rule {
    Sharding(Arc<ShardingRule>),
    SingleTable(SingleTableRule),
    Transaction(Arc<TransactionRule>),
}

impl Rule {
    pub fn as_data_node_contained(&self) -> Option<&dyn DataNodeContainedRule> {
        match self {
            Rule::Sharding(rule) => Some(rule.as_ref() as &dyn DataNodeContainedRule),
            Rule::SingleTable(rule) => Some(rule as &dyn DataNodeContainedRule),
            Rule::Transaction(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleMetaData {
    configurations: Vec<RuleConfiguration>,
    rules: Vec<Rule>,
}

impl RuleMetaData {
    pub fn new(configurations: Vec<RuleConfiguration>, rules: Vec<Rule>) -> Self {
        Self {
            configurations,
            rules,
        }
    }

    pub fn configurations(&self) -> &[RuleConfiguration] {
        &self.configurations
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty() && self.rules.is_empty()
    }

    pub fn sharding_rule(&self) -> Option<&ShardingRule> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Sharding(rule) => Some(rule.as_ref()),
            _ => None,
        })
    }

    pub fn single_table_rule(&self) -> Option<&SingleTableRule> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::SingleTable(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn single_table_rules_mut(&mut self) -> impl Iterator<Item = &mut SingleTableRule> {
        self.rules.iter_mut().filter_map(|rule| match rule {
            Rule::SingleTable(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn transaction_rule(&self) -> Option<&TransactionRule> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Transaction(rule) => Some(rule.as_ref()),
            _ => None,
        })
    }

    pub fn transaction_rule_configuration(&self) -> Option<&TransactionRuleConfiguration> {
        self.configurations.iter().find_map(|config| match config {
            RuleConfiguration::Transaction(config) => Some(config),
            _ => None,
        })
    }

    /// Whether `table_name` is placed by a rule that DDL must never move.
    pub fn contains_in_immutable_data_node_rule(&self, table_name: &str) -> bool {
        let lower = table_name.to_lowercase();
        self.rules
            .iter()
            .filter_map(|rule| rule.as_data_node_contained())
            .filter(|rule| !rule.is_mutable())
            .any(|rule| rule.all_tables().contains(&lower))
    }

    /// Tables owned by immutable data-node rules, lower-cased.
    pub fn immutable_tables(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule.as_data_node_contained())
            .filter(|rule| !rule.is_mutable())
            .flat_map(|rule| rule.all_tables())
            .collect()
    }
}

/// Build database scoped rules. A single-table rule is always present once the
/// database owns data sources, so tables created by DDL have somewhere to be tracked.
pub fn build_database_rules(
    database_name: &str,
    database_type: DatabaseType,
    resource: &Resource,
    configs: &[RuleConfiguration],
) -> Result<RuleMetaData> {
    let data_source_names = resource.data_source_names();
    let mut rules = vec![];
    for config in configs {
        if let RuleConfiguration::Sharding(sharding) = config {
            rules.push(Rule::Sharding(Arc::new(ShardingRule::new(
                sharding,
                &data_source_names,
            )?)));
        }
    }

    let single_config = configs.iter().find_map(|config| match config {
        RuleConfiguration::SingleTable(single) => Some(single.clone()),
        _ => None,
    });
    if single_config.is_some() || !resource.is_empty() {
        let mut excluded = RuleMetaData::new(vec![], rules.clone()).immutable_tables();
        for rule in &rules {
            if let Rule::Sharding(sharding) = rule {
                excluded.extend(sharding.all_actual_tables());
            }
        }
        rules.push(Rule::SingleTable(SingleTableRule::new(
            &single_config.unwrap_or_default(),
            database_name,
            database_type,
            resource,
            &excluded,
        )?));
    }
    debug!("build {} rules for database {database_name}", rules.len());

    Ok(RuleMetaData::new(
        configs.iter().filter(|c| !c.is_global()).cloned().collect(),
        rules,
    ))
}

/// Build global rules; a default local transaction rule stands in when none is configured.
pub fn build_global_rules(configs: &[RuleConfiguration]) -> RuleMetaData {
    let mut rules = vec![];
    for config in configs {
        if let RuleConfiguration::Transaction(tx) = config {
            rules.push(Rule::Transaction(Arc::new(TransactionRule::new(tx))));
        }
    }
    if rules.is_empty() {
        rules.push(Rule::Transaction(Arc::new(TransactionRule::new(
            &TransactionRuleConfiguration::default(),
        ))));
    }

    RuleMetaData::new(
        configs.iter().filter(|c| c.is_global()).cloned().collect(),
        rules,
    )
}
