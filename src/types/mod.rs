pub mod dialect;
pub mod value;

pub use dialect::DatabaseType;

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    String,
    VarChar(usize),
    Timestamp,
    Blob,
}

impl LogicalType {
    /// Map a storage-side type name (as reported by a shard) to a logical type.
    /// Unknown names fall back to `String` so metadata loading never fails on exotic types.
    pub fn from_sql_name(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        if let Some(len) = lower
            .strip_prefix("varchar(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.parse::<usize>().ok())
        {
            return LogicalType::VarChar(len);
        }
        match lower.as_str() {
            "null" => LogicalType::Null,
            "bool" | "boolean" => LogicalType::Bool,
            "tinyint" => LogicalType::Int8,
            "smallint" => LogicalType::Int16,
            "int" | "integer" => LogicalType::Int32,
            "bigint" => LogicalType::Int64,
            "tinyint unsigned" => LogicalType::UInt8,
            "smallint unsigned" => LogicalType::UInt16,
            "int unsigned" => LogicalType::UInt32,
            "bigint unsigned" => LogicalType::UInt64,
            "float" | "real" => LogicalType::Float32,
            "double" => LogicalType::Float64,
            "decimal" | "numeric" => LogicalType::Decimal,
            "date" | "datetime" | "timestamp" => LogicalType::Timestamp,
            "blob" | "bytea" => LogicalType::Blob,
            _ => LogicalType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sql_name() {
        assert_eq!(LogicalType::from_sql_name("INT"), LogicalType::Int32);
        assert_eq!(LogicalType::from_sql_name("varchar(32)"), LogicalType::VarChar(32));
        assert_eq!(LogicalType::from_sql_name("geometry"), LogicalType::String);
    }
}
