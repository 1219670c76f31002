//! <div align=center>
//!   <p><strong>multitemplate: HTML templates in two syntaxes with composable layouts</strong></p>
//! </div>
//!
//! multitemplate compiles templates written in one of two syntaxes into a
//! shared intermediate representation and renders them with a single
//! engine that knows about layouts, slots and blocks:
//!
//! * **bham**, an indentation based shorthand for HTML.  Tags are written
//!   as `%name.class#id(attr="value")`, nesting follows the indentation
//!   and `=` lines carry statements.
//! * **plain**, literal text with `{{ pipeline }}` actions.
//!
//! Both front ends share the pipeline expression language and the HTML
//! context tracking that drives auto escaping and the block security gate.
//!
//! ```
//! use multitemplate::{Environment, context};
//!
//! let mut env = Environment::new();
//! env.add_template("hello.html.bham", "%p Hello {{ .Name }}!").unwrap();
//! let tmpl = env.get_template("hello.html").unwrap();
//! assert_eq!(
//!     tmpl.render(context!(Name => "John")).unwrap(),
//!     "<p>  Hello John! </p> "
//! );
//! ```
//!
//! # Template Registration
//!
//! Templates are registered on an [`Environment`] under a file name.  The
//! file extensions decide which front end parses the source: `.bham`
//! selects the indentation syntax, `.tmpl` (or no recognised extension at
//! all) the delimiter syntax.  Front end extensions are removed from the
//! name, so `layouts/main.html.bham` is known as `layouts/main.html`.  A
//! source can produce more than one template (`{{ define }}` blocks).
//! Compilation is all or nothing: if any part of a source fails, none of
//! its templates are registered.
//!
//! # Layouts and Slots
//!
//! A render call takes a [`RenderContext`] naming the main template, an
//! optional layout, a mapping of slots to templates and a table of
//! pre-rendered [`RenderedBlock`]s.  Inside a template the composition
//! calls (`yield`, `content_for`, `block`, `end_block`, `extends`, `exec`)
//! resolve against this context.  See [`syntax`] for the details.
//!
//! Pre-rendered blocks carry the HTML context they were rendered for and
//! are refused in any other context, so markup meant for the document
//! body can never end up inside an inline script.
//!
//! # Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: template
//! registration and render calls at debug level, slot resolution at trace
//! level and interpolations that fail to parse (and are kept as text) as
//! warnings.
//!
//! # Optional Features
//!
//! - `preserve_order`: maps in values keep their insertion order.
//! - `unicode`: identifiers in pipelines may use unicode characters.
//! - `urlencode`: adds the `urlquery` function.
//! - `stacker`: enables automatic stack growth for deeply nested template
//!   executions.
//! - `speedups`: turns on the `v_htmlescape` dependency for faster HTML
//!   escaping.
//! - `unstable_machinery`: exposes the individual compile steps (no semver
//!   guarantees).
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::get_first)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

#[macro_use]
mod macros;

mod compiler;
mod context;
mod defaults;
mod environment;
mod error;
mod output;
mod pipeline;
mod settings;
mod template;
mod utils;
mod vm;

pub mod bham;
pub mod functions;
pub mod plain;
pub mod syntax;
pub mod value;

pub use self::compiler::ir::{HtmlContext, Unit};
pub use self::context::{BlockKind, RenderContext, RenderedBlock};
pub use self::defaults::default_auto_escape_callback;
pub use self::environment::{Environment, Parser};
pub use self::error::{Error, ErrorKind};
pub use self::output::Output;
pub use self::settings::{Delimiters, FilterHandler, Settings};
pub use self::template::Template;
pub use self::utils::{AutoEscape, HtmlEscape};

/// Re-export for convenience.
pub use self::value::Value;

pub use self::macros::__context;

/// This module gives access to the low level machinery.
///
/// This module is only provided by the `unstable_machinery` feature and does not
/// have a stable interface.  It mostly exists for internal testing purposes and
/// for debugging.
#[cfg(feature = "unstable_machinery")]
#[cfg_attr(docsrs, doc(cfg(feature = "unstable_machinery")))]
pub mod machinery {
    #![allow(missing_docs)]
    pub use crate::bham::analysis::{analyze, Node as BhamNode, NodeKind as BhamNodeKind};
    pub use crate::bham::lines::{classify_lines, Line};
    pub use crate::bham::tag::{parse_tag, TagDescription};
    pub use crate::compiler::builder::IrBuilder;
    pub use crate::compiler::ir::{HtmlContext, Node, Unit};
    pub use crate::pipeline::ast::{Command, Expr, Pipeline, TemplateCall};
    pub use crate::pipeline::lexer::tokenize;
    pub use crate::pipeline::tokens::Token;
    pub use crate::pipeline::{parse_pipeline, parse_template_call};
    pub use crate::vm::Vm;
}
