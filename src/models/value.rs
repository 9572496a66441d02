use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A property value as stored on nodes and relationships.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Semantic type names reported by the metadata procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetaType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    List,
    Map,
    Node,
    Relationship,
    /// Element type of an empty or mixed list.
    Any,
}

impl MetaType {
    pub fn name(self) -> &'static str {
        match self {
            MetaType::Null => "NULL",
            MetaType::Boolean => "BOOLEAN",
            MetaType::Integer => "INTEGER",
            MetaType::Float => "FLOAT",
            MetaType::String => "STRING",
            MetaType::List => "LIST",
            MetaType::Map => "MAP",
            MetaType::Node => "NODE",
            MetaType::Relationship => "RELATIONSHIP",
            MetaType::Any => "ANY",
        }
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn meta_type(&self) -> MetaType {
        match self {
            Value::Null => MetaType::Null,
            Value::Boolean(_) => MetaType::Boolean,
            Value::Integer(_) => MetaType::Integer,
            Value::Float(_) => MetaType::Float,
            Value::String(_) => MetaType::String,
            Value::List(_) => MetaType::List,
            Value::Map(_) => MetaType::Map,
        }
    }

    /// Type of the elements of a list, `Any` when empty or mixed.
    /// Scalars report their own type.
    pub fn element_type(&self) -> MetaType {
        match self {
            Value::List(items) => {
                let mut types = items.iter().filter(|v| !v.is_null()).map(Value::meta_type);
                match types.next() {
                    Some(first) if types.all(|t| t == first) => first,
                    _ => MetaType::Any,
                }
            }
            other => other.meta_type(),
        }
    }

    /// Plain text rendering: strings unquoted, containers as JSON.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => self.to_json_string(),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Renders floats so that integral values keep a decimal point.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

pub type Properties = BTreeMap<String, Value>;

/// Builds a property map from `(key, value)` pairs.
pub fn props<K, V, I>(pairs: I) -> Properties
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_round_trip() {
        let json = r#"{"a":null,"b":true,"c":3,"d":1.5,"e":"x","f":[1,2],"g":{"h":"i"}}"#;
        let parsed: Properties = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["a"], Value::Null);
        assert_eq!(parsed["c"], Value::Integer(3));
        assert_eq!(parsed["d"], Value::Float(1.5));
        assert_eq!(parsed["f"], Value::from(vec![1i64, 2]));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn test_element_type() {
        assert_eq!(Value::from(vec!["a", "b"]).element_type(), MetaType::String);
        assert_eq!(Value::List(vec![]).element_type(), MetaType::Any);
        assert_eq!(
            Value::List(vec![Value::Integer(1), Value::from("x")]).element_type(),
            MetaType::Any
        );
        assert_eq!(Value::Float(1.0).element_type(), MetaType::Float);
    }

    #[test]
    fn test_format_float_keeps_decimal_point() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(2.5), "2.5");
    }
}
