//! Typed value model and YAML inventory loading
//!
//! The inventory is a YAML file with a top-level `devices` list. Each entry
//! becomes a `DeviceRecord`: a mapping from field name to a typed `Value`.
//! YAML `null` fields are dropped at load time, so "field not supplied" and
//! "field supplied but empty" stay distinguishable downstream.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Field carrying the unique device identifier
pub const SERIAL_FIELD: &str = "serial";
/// Field carrying the device hostname
pub const HOSTNAME_FIELD: &str = "hostname";
/// Field carrying the hardware model
pub const MODEL_FIELD: &str = "model";
/// Model assumed when the inventory omits one
pub const DEFAULT_MODEL: &str = "EX4100";

/// A resolved field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Truthiness for conditional blocks: empty/zero/false are falsy
    pub fn truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    /// String form for direct substitution; None for lists and maps
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Convert a YAML value; None for null (absent)
    fn from_yaml(value: serde_yaml::Value, index: usize) -> Result<Option<Value>, InventoryError> {
        Ok(match value {
            serde_yaml::Value::Null => None,
            serde_yaml::Value::Bool(b) => Some(Value::Bool(b)),
            serde_yaml::Value::Number(n) => Some(if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }),
            serde_yaml::Value::String(s) => Some(Value::String(s)),
            serde_yaml::Value::Sequence(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    // null list elements are dropped, like null fields
                    if let Some(v) = Value::from_yaml(item, index)? {
                        list.push(v);
                    }
                }
                Some(Value::List(list))
            }
            serde_yaml::Value::Mapping(map) => {
                let mut fields = BTreeMap::new();
                for (key, val) in map {
                    let serde_yaml::Value::String(key) = key else {
                        return Err(InventoryError::NonStringKey { index });
                    };
                    if let Some(v) = Value::from_yaml(val, index)? {
                        fields.insert(key, v);
                    }
                }
                Some(Value::Map(fields))
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(tagged.value, index)?,
        })
    }

    /// Convert a TOML value (used for section defaults)
    pub(crate) fn from_toml(value: toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::String(d.to_string()),
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_toml).collect())
            }
            toml::Value::Table(table) => Value::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_toml(v)))
                    .collect(),
            ),
        }
    }
}

/// One device's resolved inventory fields
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    fields: BTreeMap<String, Value>,
}

impl DeviceRecord {
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Unique identifier; guaranteed present and non-empty after load
    pub fn serial(&self) -> Option<&str> {
        match self.fields.get(SERIAL_FIELD) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        match self.fields.get(HOSTNAME_FIELD) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse inventory YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("inventory contains no devices")]
    Empty,

    #[error("device entry {index} is not a mapping")]
    NotAMapping { index: usize },

    #[error("device entry {index} is missing a non-empty '{SERIAL_FIELD}' field")]
    MissingSerial { index: usize },

    #[error("device entry {index} has a non-string field key")]
    NonStringKey { index: usize },
}

#[derive(Deserialize)]
struct InventoryFile {
    #[serde(default)]
    devices: Vec<serde_yaml::Value>,
}

/// Load device records from a YAML inventory file
pub fn load_inventory(path: &Path) -> Result<Vec<DeviceRecord>, InventoryError> {
    let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_inventory(&text)
}

/// Parse YAML inventory text into device records
pub fn parse_inventory(text: &str) -> Result<Vec<DeviceRecord>, InventoryError> {
    let file: InventoryFile = serde_yaml::from_str(text)?;
    if file.devices.is_empty() {
        return Err(InventoryError::Empty);
    }

    let mut records = Vec::with_capacity(file.devices.len());
    for (index, entry) in file.devices.into_iter().enumerate() {
        let serde_yaml::Value::Mapping(map) = entry else {
            return Err(InventoryError::NotAMapping { index });
        };

        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let serde_yaml::Value::String(key) = key else {
                return Err(InventoryError::NonStringKey { index });
            };
            if let Some(v) = Value::from_yaml(value, index)? {
                fields.insert(key, v);
            }
        }

        let serial = match fields.get(SERIAL_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(InventoryError::MissingSerial { index }),
        };
        if !fields.contains_key(MODEL_FIELD) {
            warn!("device {serial} has no '{MODEL_FIELD}' field, defaulting to {DEFAULT_MODEL}");
            fields.insert(
                MODEL_FIELD.to_string(),
                Value::String(DEFAULT_MODEL.to_string()),
            );
        }

        records.push(DeviceRecord::new(fields));
    }

    Ok(records)
}
