use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::util::f64_to_i64_safe;

/// One variation of a toggle. Variations are opaque JSON on the wire; the common scalar shapes
/// get their own cases so typed accessors don't need to dig through [serde_json::Value].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToggleValue {
    Bool(bool),
    Str(String),
    Number(f64),
    Json(serde_json::Value),
}

/// The shape a caller expects a variation to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Str,
    Json,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::Str => "string",
            ValueKind::Json => "object",
        })
    }
}

impl From<bool> for ToggleValue {
    fn from(b: bool) -> ToggleValue {
        ToggleValue::Bool(b)
    }
}

impl From<String> for ToggleValue {
    fn from(s: String) -> ToggleValue {
        ToggleValue::Str(s)
    }
}

impl From<&str> for ToggleValue {
    fn from(s: &str) -> ToggleValue {
        ToggleValue::Str(s.to_owned())
    }
}

impl From<f64> for ToggleValue {
    fn from(f: f64) -> ToggleValue {
        ToggleValue::Number(f)
    }
}

impl From<i64> for ToggleValue {
    fn from(i: i64) -> ToggleValue {
        ToggleValue::Number(i as f64)
    }
}

impl From<serde_json::Value> for ToggleValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Bool(b) => b.into(),
            Value::Number(n) => match n.as_f64() {
                Some(f) => f.into(),
                None => {
                    warn!("unrepresentable number {}, keeping it as json", n);
                    ToggleValue::Json(Value::Number(n))
                }
            },
            Value::String(s) => s.into(),
            Value::Null | Value::Object(_) | Value::Array(_) => ToggleValue::Json(v),
        }
    }
}

impl fmt::Display for ToggleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleValue::Bool(b) => write!(f, "{}", b),
            ToggleValue::Str(s) => f.write_str(s),
            ToggleValue::Number(n) => write!(f, "{}", n),
            ToggleValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl ToggleValue {
    /// Whether this value has the shape of `kind`. JSON objects, arrays and null all count as
    /// [ValueKind::Json].
    pub fn is_kind(&self, kind: ValueKind) -> bool {
        matches!(
            (self, kind),
            (ToggleValue::Bool(_), ValueKind::Bool)
                | (ToggleValue::Number(_), ValueKind::Number)
                | (ToggleValue::Str(_), ValueKind::Str)
                | (ToggleValue::Json(_), ValueKind::Json)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ToggleValue::Bool(b) => Some(*b),
            _ => {
                warn!("variation type is not bool but {:?}", self);
                None
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ToggleValue::Str(s) => Some(s),
            _ => {
                warn!("variation type is not str but {:?}", self);
                None
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ToggleValue::Number(f) => Some(*f),
            _ => {
                warn!("variation type is not number but {:?}", self);
                None
            }
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ToggleValue::Number(f) => f64_to_i64_safe(*f),
            _ => None,
        }
    }

    pub fn as_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ToggleValue::Bool(b) => Value::from(*b),
            ToggleValue::Str(s) => Value::from(s.as_str()),
            ToggleValue::Number(f) => Value::from(*f),
            ToggleValue::Json(v) => v.clone(),
        }
    }
}
