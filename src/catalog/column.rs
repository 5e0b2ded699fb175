use serde_derive::{Deserialize, Serialize};

use crate::types::LogicalType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetaData {
    pub name: String,
    pub data_type: LogicalType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl ColumnMetaData {
    pub fn new(name: &str, data_type: LogicalType, primary_key: bool) -> Self {
        Self {
            name: name.to_owned(),
            data_type,
            primary_key,
            generated: false,
            case_sensitive: false,
        }
    }
}
