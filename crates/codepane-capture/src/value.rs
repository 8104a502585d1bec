//! Console values and their display serialization
//!
//! Host code logs arbitrary values. Lists and objects are shared, identity-bearing
//! composites so that self-referencing structures can exist; the serializer detects
//! those cycles and renders `[Circular]` at the point where a composite would recurse
//! into one of its own ancestors.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};

use crate::error::{CaptureError, CaptureResult};

const CIRCULAR: &str = "[Circular]";

/// Composites nested deeper than this fall back to their type name
const MAX_DEPTH: usize = 64;

/// A shared, mutable composite with reference identity
pub struct Composite<T>(Arc<RwLock<T>>);

impl<T> Composite<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(RwLock::new(inner)))
    }

    /// Identity of the underlying allocation
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.0.try_read()
    }
}

impl<T> Clone for Composite<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Composite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are not printed: a composite may contain itself.
        write!(f, "Composite({:#x})", self.id())
    }
}

/// An error-like value
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build from any Rust error, using its source chain as the stack text
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut value = Self::new("Error", err.to_string());
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        if !chain.is_empty() {
            value.stack = Some(chain.join("\n"));
        }
        value
    }

    fn render(&self) -> String {
        let mut text = format!("{}: {}", self.name, self.message);
        if let Some(stack) = self.stack.as_deref().filter(|s| !s.is_empty()) {
            text.push('\n');
            text.push_str(stack);
        }
        text
    }
}

/// Any value handed to the host console
#[derive(Debug, Clone)]
pub enum ConsoleValue {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    /// A callable, represented by its source text
    Function { source: String },
    Error(ErrorValue),
    List(Composite<Vec<ConsoleValue>>),
    Object(Composite<Vec<(String, ConsoleValue)>>),
}

impl ConsoleValue {
    pub fn list(items: Vec<ConsoleValue>) -> Self {
        ConsoleValue::List(Composite::new(items))
    }

    pub fn object<K: Into<String>>(entries: Vec<(K, ConsoleValue)>) -> Self {
        ConsoleValue::Object(Composite::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn function(source: impl Into<String>) -> Self {
        ConsoleValue::Function {
            source: source.into(),
        }
    }

    /// Append to a list; no-op for every other variant
    pub fn push(&self, item: ConsoleValue) {
        if let ConsoleValue::List(list) = self {
            list.write().push(item);
        }
    }

    /// Set a key on an object, replacing an existing entry; no-op for other variants
    pub fn insert(&self, key: impl Into<String>, item: ConsoleValue) {
        if let ConsoleValue::Object(object) = self {
            let key = key.into();
            let mut entries = object.write();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = item,
                None => entries.push((key, item)),
            }
        }
    }

    /// Generic type tag used when structured encoding fails
    pub fn type_name(&self) -> &'static str {
        match self {
            ConsoleValue::Null => "[object Null]",
            ConsoleValue::Undefined => "[object Undefined]",
            ConsoleValue::Bool(_) => "[object Boolean]",
            ConsoleValue::Number(_) => "[object Number]",
            ConsoleValue::String(_) => "[object String]",
            ConsoleValue::Function { .. } => "[object Function]",
            ConsoleValue::Error(_) => "[object Error]",
            ConsoleValue::List(_) => "[object Array]",
            ConsoleValue::Object(_) => "[object Object]",
        }
    }
}

impl From<&str> for ConsoleValue {
    fn from(value: &str) -> Self {
        ConsoleValue::String(value.to_string())
    }
}

impl From<String> for ConsoleValue {
    fn from(value: String) -> Self {
        ConsoleValue::String(value)
    }
}

impl From<bool> for ConsoleValue {
    fn from(value: bool) -> Self {
        ConsoleValue::Bool(value)
    }
}

impl From<f64> for ConsoleValue {
    fn from(value: f64) -> Self {
        ConsoleValue::Number(value)
    }
}

impl From<i32> for ConsoleValue {
    fn from(value: i32) -> Self {
        ConsoleValue::Number(f64::from(value))
    }
}

impl From<i64> for ConsoleValue {
    fn from(value: i64) -> Self {
        ConsoleValue::Number(value as f64)
    }
}

impl From<ErrorValue> for ConsoleValue {
    fn from(value: ErrorValue) -> Self {
        ConsoleValue::Error(value)
    }
}

impl<T: Into<ConsoleValue>> From<Option<T>> for ConsoleValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ConsoleValue::Null)
    }
}

impl From<Value> for ConsoleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ConsoleValue::Null,
            Value::Bool(b) => ConsoleValue::Bool(b),
            Value::Number(n) => ConsoleValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => ConsoleValue::String(s),
            Value::Array(items) => {
                ConsoleValue::list(items.into_iter().map(ConsoleValue::from).collect())
            }
            Value::Object(map) => ConsoleValue::object(
                map.into_iter()
                    .map(|(k, v)| (k, ConsoleValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Integral values with a magnitude below this are encoded as JSON integers
const MAX_JSON_INTEGER: f64 = 9_223_372_036_854_775_808.0;

/// Render a number the way the host console does
///
/// Magnitudes of at least 1e21 or below 1e-6 use exponent form with an explicit sign,
/// like `1e+21` and `1.5e-7`.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        n.to_string()
    }
}

/// Encode a number inside a composite
///
/// Integral values stay integers. Other finite values use the shortest round-trip
/// form, which can differ from the host's exponent thresholds outside 1e-6..1e21.
/// Non-finite values become `null`.
fn json_number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_JSON_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Turn one logged value into display text
///
/// Never fails: when structured encoding of a composite breaks for any reason, the
/// generic type name is returned instead.
pub fn serialize_value(value: &ConsoleValue) -> String {
    match value {
        ConsoleValue::Null => "null".to_string(),
        ConsoleValue::Undefined => "undefined".to_string(),
        ConsoleValue::Bool(b) => b.to_string(),
        ConsoleValue::Number(n) => format_number(*n),
        ConsoleValue::String(s) => s.clone(),
        ConsoleValue::Function { source } => source.clone(),
        ConsoleValue::Error(err) => err.render(),
        ConsoleValue::List(_) | ConsoleValue::Object(_) => {
            let mut ancestors = Vec::new();
            to_json(value, &mut ancestors)
                .and_then(|json| serde_json::to_string_pretty(&json).map_err(CaptureError::from))
                .unwrap_or_else(|err| {
                    tracing::trace!("falling back to type name: {}", err);
                    value.type_name().to_string()
                })
        }
    }
}

fn to_json(value: &ConsoleValue, ancestors: &mut Vec<usize>) -> CaptureResult<Value> {
    Ok(match value {
        ConsoleValue::Null | ConsoleValue::Undefined => Value::Null,
        ConsoleValue::Bool(b) => Value::Bool(*b),
        ConsoleValue::Number(n) => json_number(*n),
        ConsoleValue::String(s) => Value::String(s.clone()),
        ConsoleValue::Function { source } => Value::String(source.clone()),
        ConsoleValue::Error(err) => Value::String(err.render()),
        ConsoleValue::List(list) => {
            let Some(items) = enter(list, ancestors)? else {
                return Ok(Value::String(CIRCULAR.to_string()));
            };
            let result = items
                .iter()
                .map(|item| to_json(item, ancestors))
                .collect::<CaptureResult<Vec<_>>>();
            ancestors.pop();
            Value::Array(result?)
        }
        ConsoleValue::Object(object) => {
            let Some(entries) = enter(object, ancestors)? else {
                return Ok(Value::String(CIRCULAR.to_string()));
            };
            let mut map = Map::new();
            let mut failure = None;
            for (key, item) in entries.iter() {
                if matches!(item, ConsoleValue::Undefined) {
                    continue;
                }
                match to_json(item, ancestors) {
                    Ok(json) => {
                        map.insert(key.clone(), json);
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            ancestors.pop();
            if let Some(err) = failure {
                return Err(err);
            }
            Value::Object(map)
        }
    })
}

/// Push a composite onto the ancestor path and read-lock it.
///
/// Returns `Ok(None)` when the composite is already on the path.
fn enter<'a, T>(
    composite: &'a Composite<T>,
    ancestors: &mut Vec<usize>,
) -> CaptureResult<Option<RwLockReadGuard<'a, T>>> {
    let id = composite.id();
    if ancestors.contains(&id) {
        return Ok(None);
    }
    if ancestors.len() >= MAX_DEPTH {
        return Err(CaptureError::Serialization {
            message: format!("nesting deeper than {} levels", MAX_DEPTH),
        });
    }
    let guard = composite.try_read().ok_or_else(|| CaptureError::Serialization {
        message: "composite is locked for writing".to_string(),
    })?;
    ancestors.push(id);
    Ok(Some(guard))
}
