//! Provides a dynamic value type abstraction.
//!
//! This module gives access to a dynamically typed value which is used by
//! the template engine during execution.  Render data is converted into
//! values via [`serde`], so anything that implements
//! [`Serialize`](serde::Serialize) can be passed to a render call.
//!
//! # Basic Value Conversions
//!
//! Values are typically created via the [`From`] trait:
//!
//! ```
//! # use multitemplate::value::Value;
//! let int_value = Value::from(42);
//! let none_value = Value::from(());
//! let true_value = Value::from(true);
//! ```
//!
//! Or via the [`FromIterator`] trait:
//!
//! ```
//! # use multitemplate::value::Value;
//! // collection into a sequence
//! let value: Value = (1..10).into_iter().collect();
//!
//! // collection into a map
//! let value: Value = [("key", "value")].into_iter().collect();
//! ```
//!
//! # Printing
//!
//! Values print the way pipeline results are printed into the output:
//! undefined and none print nothing, sequences print as `[a b]` and maps
//! as `map[key:value]` with the keys in map order.
//!
//! # HTML Escaping
//!
//! When a template auto escapes, action output is escaped according to the
//! HTML context it appears in.  Values created with
//! [`Value::from_safe_string`] (and the results of composition calls such
//! as `yield`) are trusted and bypass escaping.
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Error, ErrorKind};

pub(crate) mod ops;

#[cfg(feature = "preserve_order")]
pub(crate) type ValueMap = indexmap::IndexMap<Arc<str>, Value>;

#[cfg(not(feature = "preserve_order"))]
pub(crate) type ValueMap = BTreeMap<Arc<str>, Value>;

/// Describes the kind of value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[non_exhaustive]
pub enum ValueKind {
    /// The value is undefined
    Undefined,
    /// The value is the none singleton ([`()`])
    None,
    /// The value is a [`bool`]
    Bool,
    /// The value is a number of a supported type.
    Number,
    /// The value is a string.
    String,
    /// The value is an array of other values.
    Seq,
    /// The value is a key/value mapping.
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::Undefined => "undefined",
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "map",
        })
    }
}

/// Type type of string
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum StringType {
    Normal,
    Safe,
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(Arc<str>, StringType),
    Seq(Arc<Vec<Value>>),
    Map(Arc<ValueMap>),
    Fallback(Arc<str>),
}

impl fmt::Debug for ValueRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRepr::Undefined => f.write_str("undefined"),
            ValueRepr::None => f.write_str("none"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(val, f),
            ValueRepr::I64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::F64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::String(val, _) => fmt::Debug::fmt(val, f),
            ValueRepr::Seq(val) => f.debug_list().entries(val.iter()).finish(),
            ValueRepr::Map(val) => f.debug_map().entries(val.iter()).finish(),
            ValueRepr::Fallback(val) => write!(f, "<fallback {:?}>", val),
        }
    }
}

/// Represents a dynamically typed value in the template engine.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let value_ordering = match (&self.0, &other.0) {
            (ValueRepr::None, ValueRepr::None) => Ordering::Equal,
            (ValueRepr::Undefined, ValueRepr::Undefined) => Ordering::Equal,
            (ValueRepr::String(ref a, _), ValueRepr::String(ref b, _)) => a.cmp(b),
            (ValueRepr::Fallback(ref a), ValueRepr::Fallback(ref b)) => a.cmp(b),
            (ValueRepr::Seq(a), ValueRepr::Seq(b)) => a.iter().cmp(b.iter()),
            (ValueRepr::Map(a), ValueRepr::Map(b)) => a.iter().cmp(b.iter()),
            _ => match ops::coerce(self, other) {
                Some(ops::CoerceResult::F64(a, b)) => a.total_cmp(&b),
                Some(ops::CoerceResult::I64(a, b)) => a.cmp(&b),
                None => Ordering::Equal,
            },
        };
        value_ordering.then((self.kind() as usize).cmp(&(other.kind() as usize)))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => Ok(()),
            ValueRepr::Bool(val) => val.fmt(f),
            ValueRepr::I64(val) => val.fmt(f),
            ValueRepr::F64(val) => {
                if val.is_nan() {
                    f.write_str("NaN")
                } else if val.is_infinite() {
                    write!(f, "{}Inf", if val.is_sign_negative() { "-" } else { "+" })
                } else {
                    write!(f, "{val}")
                }
            }
            ValueRepr::String(val, _) => f.write_str(val),
            ValueRepr::Seq(items) => {
                ok!(f.write_str("["));
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(" "));
                    }
                    ok!(write!(f, "{item}"));
                }
                f.write_str("]")
            }
            ValueRepr::Map(map) => {
                ok!(f.write_str("map["));
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(" "));
                    }
                    ok!(write!(f, "{key}:{value}"));
                }
                f.write_str("]")
            }
            ValueRepr::Fallback(name) => write!(f, "{name}"),
        }
    }
}

impl Default for Value {
    fn default() -> Value {
        Value::UNDEFINED
    }
}

#[allow(clippy::len_without_is_empty)]
impl Value {
    /// The undefined value.
    ///
    /// This constant exists because the undefined type does not exist in Rust
    /// and this is the only way to construct it.  Missing fields evaluate to
    /// undefined.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// Creates a value from something that can be serialized.
    ///
    /// Serialization failures (for instance maps with non string keys)
    /// degrade to undefined.  Use [`Value::try_from_serialize`] to
    /// observe the error.
    ///
    /// ```
    /// # use multitemplate::value::Value;
    /// let value = Value::from_serialize(&[1, 2, 3]);
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Value {
        Value::try_from_serialize(value).unwrap_or_default()
    }

    /// Creates a value from something that can be serialized.
    pub fn try_from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
        let json = ok!(serde_json::to_value(value).map_err(|err| {
            Error::new(ErrorKind::BadSerialization, "cannot convert render data").with_source(err)
        }));
        Ok(Value::from_json(json))
    }

    pub(crate) fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value(ValueRepr::None),
            serde_json::Value::Bool(val) => Value::from(val),
            serde_json::Value::Number(num) => {
                if let Some(val) = num.as_i64() {
                    Value::from(val)
                } else {
                    Value::from(num.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(val) => Value::from(val),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from_json).collect(),
            serde_json::Value::Object(map) => {
                let mut rv = ValueMap::default();
                for (key, value) in map {
                    rv.insert(Arc::from(key), Value::from_json(value));
                }
                Value::from(rv)
            }
        }
    }

    /// Creates a value from a safe string.
    ///
    /// A safe string is one that will bypass auto escaping.
    pub fn from_safe_string(value: String) -> Value {
        Value(ValueRepr::String(Arc::from(value), StringType::Safe))
    }

    pub(crate) fn fallback(name: &str) -> Value {
        Value(ValueRepr::Fallback(Arc::from(name)))
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::None => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::I64(_) | ValueRepr::F64(_) => ValueKind::Number,
            ValueRepr::String(..) | ValueRepr::Fallback(_) => ValueKind::String,
            ValueRepr::Seq(_) => ValueKind::Seq,
            ValueRepr::Map(_) => ValueKind::Map,
        }
    }

    /// Is this value true?
    ///
    /// False values are `false`, zero, undefined, none and empty strings,
    /// sequences and maps.
    pub fn is_true(&self) -> bool {
        match self.0 {
            ValueRepr::Bool(val) => val,
            ValueRepr::I64(x) => x != 0,
            ValueRepr::F64(x) => x != 0.0,
            ValueRepr::String(ref x, _) => !x.is_empty(),
            ValueRepr::Seq(ref x) => !x.is_empty(),
            ValueRepr::Map(ref x) => !x.is_empty(),
            ValueRepr::Fallback(_) => true,
            ValueRepr::None | ValueRepr::Undefined => false,
        }
    }

    /// Returns `true` if this value is safe.
    pub fn is_safe(&self) -> bool {
        matches!(&self.0, ValueRepr::String(_, StringType::Safe))
    }

    /// Returns `true` if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(&self.0, ValueRepr::Undefined)
    }

    /// Returns `true` if this value is none.
    pub fn is_none(&self) -> bool {
        matches!(&self.0, ValueRepr::None)
    }

    /// If the value is a string, return it.
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            ValueRepr::String(ref s, _) => Some(s as &str),
            _ => None,
        }
    }

    /// If the value is an integer, return it.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            ValueRepr::I64(val) => Some(val),
            _ => None,
        }
    }

    pub(crate) fn as_fallback(&self) -> Option<&str> {
        match &self.0 {
            ValueRepr::Fallback(ref s) => Some(s as &str),
            _ => None,
        }
    }

    /// Returns the length of the contained value.
    ///
    /// Strings report the number of bytes, like `len` in templates does.
    pub fn len(&self) -> Option<usize> {
        match self.0 {
            ValueRepr::String(ref s, _) => Some(s.len()),
            ValueRepr::Seq(ref items) => Some(items.len()),
            ValueRepr::Map(ref map) => Some(map.len()),
            _ => None,
        }
    }

    /// Looks up an attribute by attribute name.
    ///
    /// Missing keys and lookups on undefined or none are undefined.
    ///
    /// ```
    /// # use multitemplate::{context, value::Value};
    /// let ctx = context!(Name => "Andrew");
    /// assert_eq!(ctx.get_attr("Name"), Value::from("Andrew"));
    /// ```
    pub fn get_attr(&self, key: &str) -> Value {
        match self.0 {
            ValueRepr::Map(ref map) => map.get(key).cloned().unwrap_or_default(),
            _ => Value::UNDEFINED,
        }
    }

    pub(crate) fn get_field(&self, key: &str) -> Result<Value, Error> {
        match self.0 {
            ValueRepr::Map(_) => Ok(self.get_attr(key)),
            ValueRepr::Undefined | ValueRepr::None => Ok(Value::UNDEFINED),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("can't evaluate field {} in type {}", key, self.kind()),
            )),
        }
    }

    /// Looks up an item by index or key.
    pub fn get_item(&self, key: &Value) -> Result<Value, Error> {
        match (&self.0, &key.0) {
            (ValueRepr::Seq(items), ValueRepr::I64(idx)) => usize::try_from(*idx)
                .ok()
                .and_then(|idx| items.get(idx).cloned())
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("index out of range: {}", idx),
                    )
                }),
            (ValueRepr::String(s, _), ValueRepr::I64(idx)) => usize::try_from(*idx)
                .ok()
                .and_then(|idx| s.as_bytes().get(idx))
                .map(|b| Value::from(*b as i64))
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("index out of range: {}", idx),
                    )
                }),
            (ValueRepr::Map(map), ValueRepr::String(key, _)) => {
                Ok(map.get(key as &str).cloned().unwrap_or_default())
            }
            (ValueRepr::Undefined | ValueRepr::None, _) => Ok(Value::UNDEFINED),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("can't index item of type {} with {}", self.kind(), key.kind()),
            )),
        }
    }

    /// Iterates over the value.
    ///
    /// Sequences yield `(index, item)` pairs, maps yield `(key, value)`
    /// pairs sorted by key and non-negative integers `n` yield the pairs
    /// `(i, i)` for `i` in `0..n`.  Undefined and none iterate as empty.
    ///
    /// Integer ranges are produced lazily so that a large count coming from
    /// render data does not allocate up front.
    pub(crate) fn try_iter_pairs(&self) -> Result<PairIter, Error> {
        let state = match self.0 {
            ValueRepr::Seq(ref items) => PairIterState::Seq(0, items.clone()),
            ValueRepr::Map(ref map) => {
                let mut pairs = map
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<Vec<_>>();
                // with `preserve_order` the map keeps insertion order
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                PairIterState::Map(pairs.into_iter())
            }
            ValueRepr::I64(n) if n >= 0 => PairIterState::Range(0..n),
            ValueRepr::Undefined | ValueRepr::None => PairIterState::Empty,
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("range can't iterate over {}", self),
                ))
            }
        };
        Ok(PairIter { state })
    }
}

/// Iterates over the `(key, item)` pairs of a value.
pub(crate) struct PairIter {
    state: PairIterState,
}

enum PairIterState {
    Empty,
    Seq(usize, Arc<Vec<Value>>),
    Map(std::vec::IntoIter<(Arc<str>, Value)>),
    Range(std::ops::Range<i64>),
}

impl Iterator for PairIter {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            PairIterState::Empty => None,
            PairIterState::Seq(ref mut idx, ref items) => {
                let item = some!(items.get(*idx)).clone();
                let rv = (Value::from(*idx as i64), item);
                *idx += 1;
                Some(rv)
            }
            PairIterState::Map(ref mut iter) => {
                iter.next().map(|(key, value)| (Value::from(key), value))
            }
            PairIterState::Range(ref mut range) => range.next().map(|i| (Value::from(i), Value::from(i))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            PairIterState::Empty => (0, Some(0)),
            PairIterState::Seq(idx, ref items) => {
                let rest = items.len().saturating_sub(idx);
                (rest, Some(rest))
            }
            PairIterState::Map(ref iter) => iter.size_hint(),
            PairIterState::Range(ref range) => range.size_hint(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            ValueRepr::Bool(b) => serializer.serialize_bool(b),
            ValueRepr::I64(i) => serializer.serialize_i64(i),
            ValueRepr::F64(f) => serializer.serialize_f64(f),
            ValueRepr::None | ValueRepr::Undefined => serializer.serialize_unit(),
            ValueRepr::String(ref s, _) | ValueRepr::Fallback(ref s) => serializer.serialize_str(s),
            ValueRepr::Seq(ref items) => {
                let mut seq = ok!(serializer.serialize_seq(Some(items.len())));
                for item in items.iter() {
                    ok!(seq.serialize_element(item));
                }
                seq.end()
            }
            ValueRepr::Map(ref map) => {
                let mut m = ok!(serializer.serialize_map(Some(map.len())));
                for (key, value) in map.iter() {
                    ok!(m.serialize_entry(&**key, value));
                }
                m.end()
            }
        }
    }
}

/// Merges multiple map values into one.
///
/// Keys of earlier values take precedence over keys of later values.
/// Values that are not maps are skipped.
pub fn merge_maps<I>(iter: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut rv = ValueMap::default();
    for value in iter {
        if let ValueRepr::Map(ref map) = value.0 {
            for (key, value) in map.iter() {
                if !rv.contains_key(key) {
                    rv.insert(key.clone(), value.clone());
                }
            }
        }
    }
    Value::from(rv)
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[inline(always)]
                fn from(val: $ty) -> Self {
                    Value(ValueRepr::I64(val as i64))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Value {
    fn from(val: usize) -> Self {
        match i64::try_from(val) {
            Ok(val) => Value(ValueRepr::I64(val)),
            Err(_) => Value(ValueRepr::F64(val as f64)),
        }
    }
}

impl From<u64> for Value {
    fn from(val: u64) -> Self {
        match i64::try_from(val) {
            Ok(val) => Value(ValueRepr::I64(val)),
            Err(_) => Value(ValueRepr::F64(val as f64)),
        }
    }
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value(ValueRepr::F64(val as f64))
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value(ValueRepr::F64(val))
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value(ValueRepr::Bool(val))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value(ValueRepr::None)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value(ValueRepr::String(Arc::from(val), StringType::Normal))
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value(ValueRepr::String(Arc::from(val), StringType::Normal))
    }
}

impl From<Arc<str>> for Value {
    fn from(val: Arc<str>) -> Self {
        Value(ValueRepr::String(val, StringType::Normal))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Self {
        val.into_iter().collect()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        match val {
            Some(val) => val.into(),
            None => Value(ValueRepr::None),
        }
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Self {
        Value(ValueRepr::Map(Arc::new(val)))
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Value(ValueRepr::Seq(Arc::new(
            iter.into_iter().map(Into::into).collect(),
        )))
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut rv = ValueMap::default();
        for (key, value) in iter {
            rv.insert(Arc::from(key.as_ref()), value.into());
        }
        Value::from(rv)
    }
}
