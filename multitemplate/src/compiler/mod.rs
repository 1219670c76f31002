#![allow(missing_docs)]
/// This module contains the shared intermediate representation.
pub mod builder;
pub mod ir;
