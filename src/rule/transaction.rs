use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Local,
    XA,
    Base,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRuleConfiguration {
    pub default_type: TransactionType,
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl Default for TransactionRuleConfiguration {
    fn default() -> Self {
        Self {
            default_type: TransactionType::Local,
            provider_type: None,
            props: BTreeMap::new(),
        }
    }
}

/// Global rule deciding which transaction manager every database engine runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRule {
    pub config: TransactionRuleConfiguration,
}

impl TransactionRule {
    pub fn new(config: &TransactionRuleConfiguration) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn default_type(&self) -> TransactionType {
        self.config.default_type
    }
}
