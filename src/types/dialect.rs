use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::{
    error::{Error::Config, Result},
    fmt_err,
};

/// SQL dialect spoken either by the frontend protocol or by a storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    MySQL,
    PostgreSQL,
    OpenGauss,
    H2,
    SQL92,
}

impl Default for DatabaseType {
    fn default() -> Self {
        DatabaseType::MySQL
    }
}

impl DatabaseType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::OpenGauss => "openGauss",
            Self::H2 => "H2",
            Self::SQL92 => "SQL92",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "mysql" => Ok(Self::MySQL),
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "opengauss" => Ok(Self::OpenGauss),
            "h2" => Ok(Self::H2),
            "sql92" => Ok(Self::SQL92),
            _ => Err(Config(fmt_err!("unsupported database type `{name}`"))),
        }
    }

    /// Guess the storage dialect from a connection url, `jdbc:` prefix optional.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        let scheme = lower.strip_prefix("jdbc:").unwrap_or(&lower);
        if scheme.starts_with("mysql:") || scheme.starts_with("mariadb:") {
            Self::MySQL
        } else if scheme.starts_with("postgresql:") || scheme.starts_with("postgres:") {
            Self::PostgreSQL
        } else if scheme.starts_with("opengauss:") {
            Self::OpenGauss
        } else if scheme.starts_with("h2:") {
            Self::H2
        } else {
            Self::SQL92
        }
    }

    /// Schema an unqualified table resolves to inside `database_name`.
    pub fn default_schema(&self, database_name: &str) -> String {
        match self {
            Self::PostgreSQL | Self::OpenGauss => "public".to_owned(),
            _ => database_name.to_lowercase(),
        }
    }

    /// Built-in databases of the dialect and the schemas each one exposes.
    pub fn system_database_schemas(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut result = BTreeMap::new();
        match self {
            Self::MySQL => {
                result.insert("information_schema", vec!["information_schema"]);
                result.insert("performance_schema", vec!["performance_schema"]);
                result.insert("mysql", vec!["mysql"]);
                result.insert("sys", vec!["sys"]);
            }
            Self::PostgreSQL => {
                result.insert("postgres", vec!["information_schema", "pg_catalog"]);
            }
            Self::OpenGauss => {
                result.insert(
                    "postgres",
                    vec!["information_schema", "pg_catalog", "db4ai", "dbe_perf"],
                );
            }
            Self::H2 | Self::SQL92 => {}
        }
        result
    }

    pub fn is_system_database(&self, database_name: &str) -> bool {
        self.system_database_schemas()
            .contains_key(database_name.to_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        assert_eq!(DatabaseType::MySQL.default_schema("Sharding_DB"), "sharding_db");
        assert_eq!(DatabaseType::PostgreSQL.default_schema("sharding_db"), "public");
    }

    #[test]
    fn test_from_url() {
        assert_eq!(
            DatabaseType::from_url("jdbc:mysql://127.0.0.1:3306/ds_0"),
            DatabaseType::MySQL
        );
        assert_eq!(
            DatabaseType::from_url("postgresql://127.0.0.1:5432/ds_0"),
            DatabaseType::PostgreSQL
        );
        assert_eq!(DatabaseType::from_url("mem://ds_0"), DatabaseType::SQL92);
    }

    #[test]
    fn test_system_database() {
        assert!(DatabaseType::MySQL.is_system_database("INFORMATION_SCHEMA"));
        assert!(!DatabaseType::MySQL.is_system_database("sharding_db"));
        assert!(DatabaseType::H2.system_database_schemas().is_empty());
    }
}
