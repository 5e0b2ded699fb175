use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::types::DatabaseType;

/// Connection pool settings of one physical data source.
///
/// Two properties are equal when every field is equal; a changed value means the pool
/// must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceProperties {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl DataSourceProperties {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            username: String::new(),
            password: String::new(),
            props: BTreeMap::new(),
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        DatabaseType::from_url(&self.url)
    }

    /// `host:port` of the backing instance, if the url carries one.
    /// e.g. `jdbc:mysql://127.0.0.1:3306/ds_0` => `127.0.0.1:3306`
    pub fn instance_key(&self) -> Option<String> {
        let (_, rest) = self.url.split_once("://")?;
        let authority = rest.split(|c| c == '/' || c == '?').next()?;
        let authority = authority.rsplit('@').next()?;
        if authority.is_empty() {
            None
        } else {
            Some(authority.to_lowercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_key() {
        let props = DataSourceProperties::new("jdbc:mysql://root@127.0.0.1:3306/ds_0?useSSL=false");
        assert_eq!(props.instance_key().as_deref(), Some("127.0.0.1:3306"));
        assert_eq!(DataSourceProperties::new("mem:ds_0").instance_key(), None);
    }
}
