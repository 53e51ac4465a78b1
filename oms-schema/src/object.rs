use oms_types::FilterValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which resolver serves an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Columnar partitioned files.
    Tabular,
    /// SQL database.
    Relational,
}

impl BackendKind {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tabular" | "columnar" | "parquet" => Some(Self::Tabular),
            "relational" | "sql" => Some(Self::Relational),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tabular => "tabular",
            Self::Relational => "relational",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Timestamp,
}

impl PrimitiveType {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(Self::String),
            "integer" | "int" | "long" | "bigint" => Some(Self::Integer),
            "float" | "double" | "number" | "decimal" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "timestamp" | "datetime" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Parses a raw key (as it arrives in a request path) into a typed value.
    pub fn parse_key(&self, raw: &str) -> Result<FilterValue, String> {
        let raw = raw.trim();
        match self {
            Self::Integer => raw
                .parse::<i64>()
                .map(FilterValue::Integer)
                .map_err(|_| format!("'{raw}' is not an integer")),
            Self::Float => raw
                .parse::<f64>()
                .map(FilterValue::Float)
                .map_err(|_| format!("'{raw}' is not a number")),
            Self::Boolean => raw
                .parse::<bool>()
                .map(FilterValue::Boolean)
                .map_err(|_| format!("'{raw}' is not a boolean")),
            Self::String | Self::Date | Self::Timestamp => Ok(FilterValue::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub primitive: PrimitiveType,
    pub nullable: bool,
}

/// A named entity kind with typed properties and a designated backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeDefinition {
    pub name: String,
    /// In declaration order.
    pub properties: Vec<PropertyDefinition>,
    pub primary_key: String,
    pub backend: BackendKind,
    /// File/partition path (tabular) or table name (relational).
    pub locator: String,
}

impl ObjectTypeDefinition {
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Type of the primary key. Validation guarantees the property exists.
    pub fn primary_key_type(&self) -> PrimitiveType {
        self.property(&self.primary_key)
            .map(|p| p.primitive)
            .unwrap_or(PrimitiveType::String)
    }

    /// Parses a raw id according to the primary key type.
    pub fn parse_id(&self, raw: &str) -> Result<FilterValue, String> {
        self.primary_key_type().parse_key(raw)
    }
}
