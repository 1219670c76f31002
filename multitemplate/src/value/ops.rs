use std::cmp::Ordering;

use crate::error::{Error, ErrorKind};
use crate::value::{Value, ValueKind, ValueRepr};

pub enum CoerceResult {
    I64(i64, i64),
    F64(f64, f64),
}

fn as_f64(value: &Value) -> Option<f64> {
    Some(match value.0 {
        ValueRepr::I64(x) => x as f64,
        ValueRepr::F64(x) => x,
        _ => return None,
    })
}

pub fn coerce(a: &Value, b: &Value) -> Option<CoerceResult> {
    match (&a.0, &b.0) {
        (ValueRepr::I64(a), ValueRepr::I64(b)) => Some(CoerceResult::I64(*a, *b)),
        (ValueRepr::F64(a), ValueRepr::F64(b)) => Some(CoerceResult::F64(*a, *b)),
        (ValueRepr::F64(a), _) => Some(CoerceResult::F64(*a, some!(as_f64(b)))),
        (_, ValueRepr::F64(b)) => Some(CoerceResult::F64(some!(as_f64(a)), *b)),
        (ValueRepr::Bool(a), ValueRepr::Bool(b)) => Some(CoerceResult::I64(*a as i64, *b as i64)),
        _ => None,
    }
}

/// Compares two values for the ordering functions (`lt`, `le`, `gt`, `ge`).
///
/// Only numbers with numbers and strings with strings are ordered.
pub fn basic_compare(a: &Value, b: &Value) -> Result<Ordering, Error> {
    match (&a.0, &b.0) {
        (ValueRepr::String(a, _), ValueRepr::String(b, _)) => Ok(a.cmp(b)),
        (ValueRepr::Bool(_), _) | (_, ValueRepr::Bool(_)) => Err(incomparable(a, b)),
        _ => match coerce(a, b) {
            Some(CoerceResult::I64(a, b)) => Ok(a.cmp(&b)),
            Some(CoerceResult::F64(a, b)) => a.partial_cmp(&b).ok_or_else(|| incomparable(a, b)),
            None => Err(incomparable(a, b)),
        },
    }
}

/// Equality for the `eq` and `ne` functions.
///
/// Values of different kinds are never equal, except for undefined and
/// none which compare equal to each other.
pub fn basic_eq(a: &Value, b: &Value) -> bool {
    match (a.kind(), b.kind()) {
        (ValueKind::Undefined | ValueKind::None, ValueKind::Undefined | ValueKind::None) => true,
        (ka, kb) if ka == kb => a == b,
        _ => false,
    }
}

fn incomparable<A: std::fmt::Debug, B: std::fmt::Debug>(a: A, b: B) -> Error {
    Error::new(
        ErrorKind::InvalidArguments,
        format!("incompatible types for comparison: {:?} and {:?}", a, b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_compare() {
        assert_eq!(
            basic_compare(&Value::from(1), &Value::from(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            basic_compare(&Value::from("b"), &Value::from("a")).unwrap(),
            Ordering::Greater
        );
        assert!(basic_compare(&Value::from("b"), &Value::from(1)).is_err());
        assert!(basic_compare(&Value::from(true), &Value::from(false)).is_err());
    }

    #[test]
    fn test_basic_eq() {
        assert!(basic_eq(&Value::UNDEFINED, &Value::from(())));
        assert!(basic_eq(&Value::from(2), &Value::from(2.0)));
        assert!(!basic_eq(&Value::from("2"), &Value::from(2)));
    }
}
