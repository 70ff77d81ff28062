//! Argument values attached to action bindings.
//!
//! Configuration kwargs are JSON objects. They are converted once, at load
//! time, into [`ActionArgs`]: an order-irrelevant string-keyed map of typed
//! [`ArgValue`]s. No coercion happens here; each action interprets its own
//! arguments through the typed getters and reports malformed values as
//! [`HookError`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HookError;

/// A single typed argument value.
///
/// # Examples
///
/// ```
/// use regsim::ArgValue;
///
/// let delay = ArgValue::Float(0.5);
/// let count = ArgValue::Int(3);
///
/// assert_eq!(delay.as_float(), Some(0.5));
/// assert_eq!(count.as_float(), Some(3.0));
/// assert!(count.as_bool().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ArgValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_map(&self) -> Option<&BTreeMap<String, ArgValue>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(v) => write!(f, "list[{}]", v.len()),
            Self::Map(v) => write!(f, "map[{}]", v.len()),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                // u64 beyond i64::MAX and real numbers both land here.
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Keyword arguments of one binding, immutable after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionArgs(BTreeMap<String, ArgValue>);

impl ActionArgs {
    /// Creates an empty argument map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used by tests and programmatic setups.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a required argument.
    ///
    /// # Errors
    /// `HookError::MissingArgument` when the key is absent.
    pub fn require(&self, key: &str) -> Result<&ArgValue, HookError> {
        self.0.get(key).ok_or_else(|| HookError::MissingArgument {
            name: key.to_string(),
        })
    }

    /// Reads a required numeric argument; ints are accepted as floats.
    ///
    /// # Errors
    /// Missing key or non-numeric value.
    pub fn float(&self, key: &str) -> Result<f64, HookError> {
        let value = self.require(key)?;
        value.as_float().ok_or_else(|| invalid(key, "a number", value))
    }

    /// Reads a required integer argument.
    ///
    /// # Errors
    /// Missing key or non-integer value.
    pub fn int(&self, key: &str) -> Result<i64, HookError> {
        let value = self.require(key)?;
        value.as_int().ok_or_else(|| invalid(key, "an integer", value))
    }

    /// Reads an optional integer argument, falling back to `default`.
    ///
    /// # Errors
    /// Present but non-integer value.
    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, HookError> {
        match self.0.get(key) {
            None | Some(ArgValue::Null) => Ok(default),
            Some(value) => value.as_int().ok_or_else(|| invalid(key, "an integer", value)),
        }
    }

    /// Reads a required integer argument that must fit a 16-bit register.
    ///
    /// # Errors
    /// Missing key, non-integer value, or value outside `0..=65535`.
    pub fn word(&self, key: &str) -> Result<u16, HookError> {
        let raw = self.int(key)?;
        u16::try_from(raw).map_err(|_| invalid(key, "an integer in 0..=65535", &ArgValue::Int(raw)))
    }

    /// Reads a required boolean argument.
    ///
    /// # Errors
    /// Missing key or non-boolean value.
    pub fn bool(&self, key: &str) -> Result<bool, HookError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| invalid(key, "a boolean", value))
    }
}

impl FromIterator<(String, ArgValue)> for ActionArgs {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ActionArgs {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, ArgValue::from(v))).collect()
    }
}

fn invalid(key: &str, expected: &'static str, found: &ArgValue) -> HookError {
    HookError::InvalidArgument {
        name: key.to_string(),
        expected,
        found: format!("{} ({found})", found.type_name()),
    }
}
