//! Global functions and abstractions.
//!
//! This module provides the abstractions for functions that can be
//! registered as global functions to the environment via
//! [`add_function`](crate::Environment::add_function).
//!
//! # Using Functions
//!
//! A command whose first word is an identifier calls the function of that
//! name with the remaining words as arguments.  In a pipe the result of
//! the previous command is passed as the last argument:
//!
//! ```text
//! = len .Items
//! = .Name | printf_upper
//! %p {{ if and .Admin (not .Banned) }}welcome{{ end }}
//! ```
//!
//! # Custom Functions
//!
//! A custom function is a Rust closure or function which accepts the
//! arguments as a slice of [`Value`]s and returns a result:
//!
//! ```rust
//! # use multitemplate::Environment;
//! # let mut env = Environment::new();
//! use multitemplate::{Error, ErrorKind, Value};
//!
//! fn shout(args: &[Value]) -> Result<Value, Error> {
//!     match args {
//!         [value] => Ok(Value::from(value.to_string().to_uppercase())),
//!         _ => Err(Error::new(ErrorKind::InvalidArguments, "shout takes one argument")),
//!     }
//! }
//!
//! env.add_function("shout", shout);
//! ```
//!
//! # Built-in Functions
//!
//! The environment comes with the usual set of pipeline functions:
//! `and`, `or`, `not`, `eq`, `ne`, `lt`, `le`, `gt`, `ge`, `len`, `index`,
//! `print`, `println`, `html`, `js` and `safe`.  With the `urlencode`
//! feature `urlquery` is available as well.  These are also all provided
//! in this module.
//!
//! The composition calls (`yield`, `block`, `extends` and friends) are not
//! functions in this sense.  They are implemented by the engine itself and
//! cannot be overridden.
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::utils::HtmlEscape;
use crate::value::ops::{basic_compare, basic_eq};
use crate::value::{Value, ValueKind};

type FuncFunc = dyn Fn(&[Value]) -> Result<Value, Error> + Sync + Send + 'static;

/// A boxed function.
#[derive(Clone)]
pub(crate) struct BoxedFunction(Arc<FuncFunc>, &'static str);

impl BoxedFunction {
    /// Creates a new boxed function.
    pub fn new<F>(f: F) -> BoxedFunction
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        BoxedFunction(Arc::new(f), std::any::type_name::<F>())
    }

    /// Invokes the function.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, Error> {
        (self.0)(args)
    }
}

impl fmt::Debug for BoxedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            if self.1.is_empty() {
                "BoxedFunction"
            } else {
                self.1
            }
        )
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        Err(Error::new(
            ErrorKind::InvalidArguments,
            format!(
                "wrong number of args for {}: want {} got {}",
                name,
                expected,
                args.len()
            ),
        ))
    } else {
        Ok(())
    }
}

fn min_arity(name: &str, args: &[Value], expected: usize) -> Result<(), Error> {
    if args.len() < expected {
        Err(Error::new(
            ErrorKind::InvalidArguments,
            format!(
                "wrong number of args for {}: want at least {} got {}",
                name,
                expected,
                args.len()
            ),
        ))
    } else {
        Ok(())
    }
}

/// Returns the first falsy argument or the last argument.
pub fn and(args: &[Value]) -> Result<Value, Error> {
    ok!(min_arity("and", args, 1));
    Ok(args
        .iter()
        .find(|x| !x.is_true())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

/// Returns the first truthy argument or the last argument.
pub fn or(args: &[Value]) -> Result<Value, Error> {
    ok!(min_arity("or", args, 1));
    Ok(args
        .iter()
        .find(|x| x.is_true())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

/// Returns the boolean negation of its single argument.
pub fn not(args: &[Value]) -> Result<Value, Error> {
    ok!(arity("not", args, 1));
    Ok(Value::from(!args[0].is_true()))
}

/// Returns `arg1 == arg2 || arg1 == arg3 || ...`.
pub fn eq(args: &[Value]) -> Result<Value, Error> {
    ok!(min_arity("eq", args, 2));
    let first = &args[0];
    for other in &args[1..] {
        if matches!(other.kind(), ValueKind::Seq | ValueKind::Map)
            || matches!(first.kind(), ValueKind::Seq | ValueKind::Map)
        {
            return Err(Error::new(
                ErrorKind::InvalidArguments,
                "eq can only compare basic types",
            ));
        }
        if basic_eq(first, other) {
            return Ok(Value::from(true));
        }
    }
    Ok(Value::from(false))
}

/// Returns `arg1 != arg2`.
pub fn ne(args: &[Value]) -> Result<Value, Error> {
    ok!(arity("ne", args, 2));
    eq(args).map(|rv| Value::from(!rv.is_true()))
}

fn ordering(name: &str, args: &[Value], f: fn(Ordering) -> bool) -> Result<Value, Error> {
    ok!(arity(name, args, 2));
    basic_compare(&args[0], &args[1]).map(|ord| Value::from(f(ord)))
}

/// Returns `arg1 < arg2`.
pub fn lt(args: &[Value]) -> Result<Value, Error> {
    ordering("lt", args, |x| x == Ordering::Less)
}

/// Returns `arg1 <= arg2`.
pub fn le(args: &[Value]) -> Result<Value, Error> {
    ordering("le", args, |x| x != Ordering::Greater)
}

/// Returns `arg1 > arg2`.
pub fn gt(args: &[Value]) -> Result<Value, Error> {
    ordering("gt", args, |x| x == Ordering::Greater)
}

/// Returns `arg1 >= arg2`.
pub fn ge(args: &[Value]) -> Result<Value, Error> {
    ordering("ge", args, |x| x != Ordering::Less)
}

/// Returns the length of a string, sequence or map.
pub fn len(args: &[Value]) -> Result<Value, Error> {
    ok!(arity("len", args, 1));
    match args[0].len() {
        Some(len) => Ok(Value::from(len)),
        None => Err(Error::new(
            ErrorKind::InvalidArguments,
            format!("len of type {}", args[0].kind()),
        )),
    }
}

/// Indexes the first argument by all following arguments.
///
/// `index .Items 1 "name"` is `.Items[1]["name"]`.
pub fn index(args: &[Value]) -> Result<Value, Error> {
    ok!(min_arity("index", args, 1));
    let mut rv = args[0].clone();
    for key in &args[1..] {
        rv = ok!(rv.get_item(key));
    }
    Ok(rv)
}

fn sprint(args: &[Value], always_space: bool) -> String {
    let mut rv = String::new();
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0
            && (always_space
                || (arg.kind() != ValueKind::String && args[idx - 1].kind() != ValueKind::String))
        {
            rv.push(' ');
        }
        write!(rv, "{arg}").ok();
    }
    rv
}

/// Prints the arguments, separated by spaces where neither side is a string.
pub fn print(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from(sprint(args, false)))
}

/// Prints the arguments separated by spaces and followed by a newline.
pub fn println(args: &[Value]) -> Result<Value, Error> {
    let mut rv = sprint(args, true);
    rv.push('\n');
    Ok(Value::from(rv))
}

/// HTML escapes the printed arguments.
///
/// The result is marked safe so it is not escaped a second time.
pub fn html(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from_safe_string(
        HtmlEscape(&sprint(args, false)).to_string(),
    ))
}

/// Escapes the printed arguments for use inside a JavaScript string literal.
pub fn js(args: &[Value]) -> Result<Value, Error> {
    let s = sprint(args, false);
    let mut rv = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => rv.push_str("\\\\"),
            '\'' => rv.push_str("\\'"),
            '"' => rv.push_str("\\\""),
            '<' => rv.push_str("\\u003C"),
            '>' => rv.push_str("\\u003E"),
            '&' => rv.push_str("\\u0026"),
            '=' => rv.push_str("\\u003D"),
            c if (c as u32) < 0x20 => {
                write!(rv, "\\u{:04X}", c as u32).ok();
            }
            c => rv.push(c),
        }
    }
    Ok(Value::from(rv))
}

/// Marks the printed arguments as safe so they bypass auto escaping.
pub fn safe(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from_safe_string(sprint(args, false)))
}

/// Escapes the printed arguments for use in a URL query.
#[cfg(feature = "urlencode")]
#[cfg_attr(docsrs, doc(cfg(feature = "urlencode")))]
pub fn urlquery(args: &[Value]) -> Result<Value, Error> {
    const SET: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
        .remove(b'.')
        .remove(b'-')
        .remove(b'_')
        .remove(b'~');
    let s = sprint(args, false);
    Ok(Value::from(
        percent_encoding::utf8_percent_encode(&s, SET).to_string(),
    ))
}
