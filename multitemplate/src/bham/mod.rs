//! The indentation based HTML front end.
//!
//! A source is compiled in four steps:
//!
//! 1. The line classifier splits it into logical lines with an
//!    indentation level, joining continuation lines.
//! 2. The analyzer builds a tree of nodes from the indentation.
//! 3. The tag parser takes apart the tag lines.
//! 4. The compiler turns the tree into IR nodes.
//!
//! With the `unstable_machinery` feature the individual steps are
//! available from the `machinery` module.
//!
//! The result is a single unit named after the source with the `.bham`
//! extension removed.
use std::collections::BTreeMap;

use crate::compiler::builder::IrBuilder;
use crate::compiler::ir::Unit;
use crate::error::Error;
use crate::settings::Settings;

#[allow(missing_docs)]
pub(crate) mod analysis;
pub(crate) mod compile;
pub(crate) mod lines;
pub(crate) mod tag;

use self::analysis::analyze;
use self::compile::compile;
use self::lines::classify_lines;

/// Removes the `.bham` extension from a template name.
fn logical_name(name: &str) -> String {
    match name.find(".bham") {
        Some(idx) => format!("{}{}", &name[..idx], &name[idx + 5..]),
        None => name.to_string(),
    }
}

fn compile_unit(name: &str, source: &str, settings: &Settings) -> Result<Unit, Error> {
    let lines = ok!(classify_lines(source, settings.strict_indentation));
    let nodes = ok!(analyze(&lines, settings));
    let mut builder = ok!(IrBuilder::new(settings));
    let mut ir = Vec::new();
    ok!(compile(&nodes, &mut builder, &mut ir));
    Ok(Unit::new(name, ir))
}

/// Parses an indentation based source into its units.
///
/// ```
/// # use multitemplate::{bham, Settings};
/// let units = bham::parse("title.bham", "%title wat", &Settings::default()).unwrap();
/// assert!(units.contains_key("title"));
/// ```
pub fn parse(name: &str, source: &str, settings: &Settings) -> Result<BTreeMap<String, Unit>, Error> {
    let name = logical_name(name);
    let unit = ok!(compile_unit(&name, source, settings).map_err(|mut err| {
        err.set_location(&name, 0);
        err
    }));
    let mut rv = BTreeMap::new();
    rv.insert(name, unit);
    Ok(rv)
}
