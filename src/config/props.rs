use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::{
    error::{Error::Config, Result},
    fmt_err,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    SqlShow,
    SqlSimple,
    KernelExecutorSize,
    MaxConnectionsSizePerQuery,
    CheckTableMetaDataEnabled,
    SqlFederationEnabled,
    ProxyFrontendDatabaseProtocolType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    Bool,
    Usize,
    Text,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 7] = [
        PropertyKey::SqlShow,
        PropertyKey::SqlSimple,
        PropertyKey::KernelExecutorSize,
        PropertyKey::MaxConnectionsSizePerQuery,
        PropertyKey::CheckTableMetaDataEnabled,
        PropertyKey::SqlFederationEnabled,
        PropertyKey::ProxyFrontendDatabaseProtocolType,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SqlShow => "sql-show",
            Self::SqlSimple => "sql-simple",
            Self::KernelExecutorSize => "kernel-executor-size",
            Self::MaxConnectionsSizePerQuery => "max-connections-size-per-query",
            Self::CheckTableMetaDataEnabled => "check-table-metadata-enabled",
            Self::SqlFederationEnabled => "sql-federation-enabled",
            Self::ProxyFrontendDatabaseProtocolType => "proxy-frontend-database-protocol-type",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            Self::SqlShow
            | Self::SqlSimple
            | Self::CheckTableMetaDataEnabled
            | Self::SqlFederationEnabled => "false",
            Self::KernelExecutorSize => "0",
            Self::MaxConnectionsSizePerQuery => "1",
            Self::ProxyFrontendDatabaseProtocolType => "",
        }
    }

    fn kind(&self) -> PropertyKind {
        match self {
            Self::KernelExecutorSize | Self::MaxConnectionsSizePerQuery => PropertyKind::Usize,
            Self::ProxyFrontendDatabaseProtocolType => PropertyKind::Text,
            _ => PropertyKind::Bool,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }
}

/// Typed view over the raw `key => value` properties. Unknown keys are kept as they
/// are; known keys must parse as their declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationProperties {
    props: BTreeMap<String, String>,
}

impl ConfigurationProperties {
    pub fn new(props: BTreeMap<String, String>) -> Result<Self> {
        for (key, value) in &props {
            if let Some(k) = PropertyKey::from_key(key) {
                check_value(k, value)?;
            }
        }
        Ok(Self { props })
    }

    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    pub fn value(&self, key: PropertyKey) -> &str {
        self.props
            .get(key.key())
            .map(|s| s.as_str())
            .unwrap_or_else(|| key.default_value())
    }

    pub fn bool_value(&self, key: PropertyKey) -> bool {
        self.value(key).eq_ignore_ascii_case("true")
    }

    pub fn usize_value(&self, key: PropertyKey) -> usize {
        self.value(key)
            .parse()
            .unwrap_or_else(|_| key.default_value().parse().unwrap_or_default())
    }

    pub fn set(&mut self, key: PropertyKey, value: &str) {
        self.props.insert(key.key().to_owned(), value.to_owned());
    }
}

fn check_value(key: PropertyKey, value: &str) -> Result<()> {
    let valid = match key.kind() {
        PropertyKind::Bool => {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
        }
        PropertyKind::Usize => value.parse::<usize>().is_ok(),
        PropertyKind::Text => true,
    };
    if valid {
        Ok(())
    } else {
        Err(Config(fmt_err!("invalid value `{value}` of property {}", key.key())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_values() {
        let mut raw = BTreeMap::new();
        raw.insert("sql-show".to_owned(), "TRUE".to_owned());
        raw.insert("custom".to_owned(), "x".to_owned());
        let props = ConfigurationProperties::new(raw).unwrap();
        assert!(props.bool_value(PropertyKey::SqlShow));
        assert!(!props.bool_value(PropertyKey::CheckTableMetaDataEnabled));
        assert_eq!(props.usize_value(PropertyKey::MaxConnectionsSizePerQuery), 1);
        assert_eq!(props.props().get("custom").map(|s| s.as_str()), Some("x"));
    }

    #[test]
    fn test_invalid_value() {
        let mut raw = BTreeMap::new();
        raw.insert("kernel-executor-size".to_owned(), "many".to_owned());
        assert!(ConfigurationProperties::new(raw).is_err());
    }
}
