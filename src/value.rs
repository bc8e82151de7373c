//! Configuration value types and conversion utilities.

use serde::{Deserialize, Serialize};

/// Represents a configuration value stored at a node or flat-source key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Array of values (flat sources use this for multi-valued keys)
    Array(Vec<ConfigValue>),
    /// Null value
    Null,
}

impl ConfigValue {
    /// Returns the value as a string reference if it's a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it's an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64 if it's a float or integer.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the value as a bool if it's a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an array reference if it's an array.
    pub fn as_array(&self) -> Option<&Vec<ConfigValue>> {
        match self {
            ConfigValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Checks if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Coerces the value to a string representation.
    pub fn coerce_to_string(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Boolean(b) => b.to_string(),
            ConfigValue::Array(_) => "[array]".to_string(),
            ConfigValue::Null => "".to_string(),
        }
    }

    /// Coerces the value to a boolean representation.
    /// Returns None if the value cannot be meaningfully converted.
    pub fn coerce_to_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
                "false" | "0" | "no" | "off" | "f" | "n" | "" => Some(false),
                _ => None,
            },
            ConfigValue::Integer(i) => Some(*i != 0),
            ConfigValue::Float(f) => Some(*f != 0.0),
            ConfigValue::Null => Some(false),
            ConfigValue::Array(arr) => Some(!arr.is_empty()),
        }
    }

    /// Coerces the value to an i64, parsing strings where possible.
    pub fn coerce_to_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            ConfigValue::Boolean(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Coerces the value to an f64, parsing strings where possible.
    pub fn coerce_to_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the type name of the ConfigValue variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "String",
            ConfigValue::Integer(_) => "Integer",
            ConfigValue::Float(_) => "Float",
            ConfigValue::Boolean(_) => "Boolean",
            ConfigValue::Array(_) => "Array",
            ConfigValue::Null => "Null",
        }
    }
}

/// Splits a string value on the given list delimiter, trimming whitespace
/// around every element. Used by mutating operations when delimiter parsing
/// is enabled; a string without the delimiter yields a single element.
pub fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(|part| part.trim().to_string())
        .collect()
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(arr: Vec<ConfigValue>) -> Self {
        ConfigValue::Array(arr)
    }
}

impl From<Option<ConfigValue>> for ConfigValue {
    fn from(opt: Option<ConfigValue>) -> Self {
        opt.unwrap_or(ConfigValue::Null)
    }
}
