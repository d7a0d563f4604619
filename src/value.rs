//! Argument Values
//!
//! 命令参数的动态值模型、参数包以及运行时类型标签

use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::errors::CommandError;

/// Runtime type tag of an argument value.
///
/// Validators compare tags by name only, so `Object("int")` and `Int`
/// are the same tag as far as validation is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
    Set,
    Object(String),
}

impl TypeTag {
    pub fn object(name: impl Into<String>) -> Self {
        TypeTag::Object(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            TypeTag::None => "NoneType",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::List => "list",
            TypeTag::Dict => "dict",
            TypeTag::Set => "set",
            TypeTag::Object(name) => name,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Last path segment of a Rust type name, without generic parameters.
///
/// References are unwrapped (`&mut a::B` is `B`). Tuples and arrays keep
/// their shape with every path shortened, e.g. `(a::A, b::B)` is `(A, B)`.
pub fn short_type_name<T: ?Sized>() -> String {
    shorten_type_name(std::any::type_name::<T>())
}

fn shorten_type_name(full: &str) -> String {
    let mut name = full.trim_start();
    while let Some(rest) = name.strip_prefix('&') {
        name = rest.strip_prefix("mut ").unwrap_or(rest).trim_start();
    }

    if name.starts_with('(') || name.starts_with('[') {
        return strip_paths(name);
    }
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

// 保留结构，仅去掉每个路径的前缀
fn strip_paths(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut path = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            path.push(ch);
            continue;
        }
        out.push_str(path.rsplit("::").next().unwrap_or(&path));
        path.clear();
        out.push(ch);
    }
    out.push_str(path.rsplit("::").next().unwrap_or(&path));
    out
}

/// An arbitrary shared Rust value passed as an argument.
///
/// The type name recorded here is what object-kind validators match against.
#[derive(Clone)]
pub struct ObjectArg {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectArg {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: short_type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Wrap a value under an explicit type name
    pub fn named<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for ObjectArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectArg")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Dynamic value carried in an argument bag.
///
/// Equality and ordering are per variant: `Int(1)` and `Float(1.0)` are
/// different values, and so are `Float(0.0)` and `Float(-0.0)`. As dict keys
/// or set members they stay distinct entries.
#[derive(Debug, Clone, Default)]
pub enum ArgValue {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ArgValue>),
    Dict(BTreeMap<ArgValue, ArgValue>),
    Set(BTreeSet<ArgValue>),
    Object(ObjectArg),
}

impl ArgValue {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        ArgValue::Object(ObjectArg::new(value))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            ArgValue::None => TypeTag::None,
            ArgValue::Bool(_) => TypeTag::Bool,
            ArgValue::Int(_) => TypeTag::Int,
            ArgValue::Float(_) => TypeTag::Float,
            ArgValue::Str(_) => TypeTag::Str,
            ArgValue::List(_) => TypeTag::List,
            ArgValue::Dict(_) => TypeTag::Dict,
            ArgValue::Set(_) => TypeTag::Set,
            ArgValue::Object(obj) => TypeTag::Object(obj.type_name.clone()),
        }
    }

    /// Truthiness: None, false, zero, and empty strings or collections are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            ArgValue::None => false,
            ArgValue::Bool(b) => *b,
            ArgValue::Int(i) => *i != 0,
            ArgValue::Float(f) => *f != 0.0,
            ArgValue::Str(s) => !s.is_empty(),
            ArgValue::List(items) => !items.is_empty(),
            ArgValue::Dict(entries) => !entries.is_empty(),
            ArgValue::Set(items) => !items.is_empty(),
            ArgValue::Object(_) => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ArgValue::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<ArgValue, ArgValue>> {
        match self {
            ArgValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<ArgValue>> {
        match self {
            ArgValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectArg> {
        match self {
            ArgValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Downcast an object value to its concrete Rust type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(ObjectArg::downcast_ref::<T>)
    }

    /// Convert to JSON. Sets become arrays, dict keys are rendered as strings
    /// and objects are represented by their type name.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            ArgValue::None => Value::Null,
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Int(i) => Value::from(*i),
            ArgValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::List(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Set(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Dict(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_json()))
                    .collect(),
            ),
            ArgValue::Object(obj) => Value::String(obj.type_name.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ArgValue::None => 0,
            ArgValue::Bool(_) => 1,
            ArgValue::Int(_) => 2,
            ArgValue::Float(_) => 3,
            ArgValue::Str(_) => 4,
            ArgValue::List(_) => 5,
            ArgValue::Dict(_) => 6,
            ArgValue::Set(_) => 7,
            ArgValue::Object(_) => 8,
        }
    }
}

// Total order so values can be dict keys and set members.
// Floats use IEEE total ordering, objects compare by type name then identity.
impl Ord for ArgValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ArgValue::None, ArgValue::None) => Ordering::Equal,
            (ArgValue::Bool(a), ArgValue::Bool(b)) => a.cmp(b),
            (ArgValue::Int(a), ArgValue::Int(b)) => a.cmp(b),
            (ArgValue::Float(a), ArgValue::Float(b)) => a.total_cmp(b),
            (ArgValue::Str(a), ArgValue::Str(b)) => a.cmp(b),
            (ArgValue::List(a), ArgValue::List(b)) => a.cmp(b),
            (ArgValue::Dict(a), ArgValue::Dict(b)) => a.cmp(b),
            (ArgValue::Set(a), ArgValue::Set(b)) => a.cmp(b),
            (ArgValue::Object(a), ArgValue::Object(b)) => a
                .type_name
                .cmp(&b.type_name)
                .then_with(|| a.addr().cmp(&b.addr())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ArgValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArgValue {}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::None => f.write_str("None"),
            ArgValue::Str(s) => f.write_str(s),
            ArgValue::Object(obj) => write!(f, "<{}>", obj.type_name),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(value: Vec<T>) -> Self {
        ArgValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeSet<ArgValue>> for ArgValue {
    fn from(value: BTreeSet<ArgValue>) -> Self {
        ArgValue::Set(value)
    }
}

impl From<BTreeMap<ArgValue, ArgValue>> for ArgValue {
    fn from(value: BTreeMap<ArgValue, ArgValue>) -> Self {
        ArgValue::Dict(value)
    }
}

impl From<ObjectArg> for ArgValue {
    fn from(value: ObjectArg) -> Self {
        ArgValue::Object(value)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::None, Into::into)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ArgValue::None,
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ArgValue::Int(i),
                None => n.as_f64().map_or(ArgValue::None, ArgValue::Float),
            },
            Value::String(s) => ArgValue::Str(s),
            Value::Array(items) => ArgValue::List(items.into_iter().map(ArgValue::from).collect()),
            Value::Object(map) => ArgValue::Dict(
                map.into_iter()
                    .map(|(key, value)| (ArgValue::Str(key), ArgValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<toml::Value> for ArgValue {
    fn from(value: toml::Value) -> Self {
        use toml::Value;

        match value {
            Value::String(s) => ArgValue::Str(s),
            Value::Integer(i) => ArgValue::Int(i),
            Value::Float(f) => ArgValue::Float(f),
            Value::Boolean(b) => ArgValue::Bool(b),
            Value::Datetime(dt) => ArgValue::Str(dt.to_string()),
            Value::Array(items) => ArgValue::List(items.into_iter().map(ArgValue::from).collect()),
            Value::Table(table) => ArgValue::Dict(
                table
                    .into_iter()
                    .map(|(key, value)| (ArgValue::Str(key), ArgValue::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Keyword-argument bag handed to `CommandType::run`.
///
/// Iteration is in argument-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgMap {
    entries: BTreeMap<String, ArgValue>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ArgValue> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Build an argument bag from a JSON object
    pub fn from_json(value: serde_json::Value) -> Result<Self, CommandError> {
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(CommandError::InvalidArgs(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, CommandError> {
        let value: serde_json::Value = serde_json::from_str(source)
            .map_err(|e| CommandError::InvalidArgs(format!("invalid JSON: {}", e)))?;
        Self::from_json(value)
    }

    /// Build an argument bag from a TOML document; top-level keys become arguments
    pub fn from_toml_str(source: &str) -> Result<Self, CommandError> {
        let table: toml::Table = toml::from_str(source)
            .map_err(|e| CommandError::InvalidArgs(format!("invalid TOML: {}", e)))?;
        Ok(table.into_iter().collect())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ArgMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<ArgValue>, const N: usize> From<[(K, V); N]> for ArgMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for ArgMap {
    type Item = (String, ArgValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ArgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
