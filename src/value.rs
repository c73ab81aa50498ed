//! Dynamic exports values.
//!
//! A module's exports is a single `Value`. Primitive variants compare
//! structurally; `Function` and `Object` are reference types and compare by
//! identity, so a stub installed by the harness is observable as the very
//! same value inside the module under test.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ExecutionError;

type NativeFn = dyn Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync;

/// A callable exported by a module (or supplied as a stub).
#[derive(Clone)]
pub struct NativeFunction(Arc<NativeFn>);

impl NativeFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, ExecutionError> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// The exports of a module.
#[derive(Debug, Clone)]
pub enum Value {
    /// No exports
    Unit,
    /// A boolean literal
    Bool(bool),
    /// An integer literal
    Long(i64),
    /// A floating point literal
    Float(f64),
    /// A string literal
    String(String),
    /// A native callable
    Function(NativeFunction),
    /// Named members (the usual shape of a module's exports)
    Object(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Wrap a closure as a function value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Value::Function(NativeFunction::new(f))
    }

    /// Build an object from `(name, value)` pairs.
    pub fn object<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Arc::new(
            members.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Look up a member of an object value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.get(name),
            _ => None,
        }
    }

    /// Call a function value.
    pub fn call(&self, args: &[Value]) -> Result<Value, ExecutionError> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(ExecutionError::new(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    /// Look up a member and call it.
    pub fn call_member(&self, name: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        match self.get(name) {
            Some(member) => member.call(args),
            None => Err(ExecutionError::new(format!(
                "{} has no member '{}'",
                self.type_name(),
                name
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Identity comparison: reference variants must share the same
    /// allocation, primitives compare by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Human-readable variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
