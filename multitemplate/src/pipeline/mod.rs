#![allow(missing_docs)]
//! The pipeline expression language.
//!
//! Every statement the front ends hand to the engine (actions, branch
//! conditions, `range` sources, composition calls) is a pipeline: commands
//! separated by `|`, optionally preceded by variable declarations.  The
//! front ends never look inside a statement beyond calling
//! [`parse_pipeline`].
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod tokens;

pub use self::parser::{parse_pipeline, parse_template_call};
