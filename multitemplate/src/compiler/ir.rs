use std::fmt;

use crate::pipeline::ast::Pipeline;
use crate::utils::AutoEscape;

/// The HTML context a piece of output is written into.
///
/// The context of an action is decided when the unit is compiled, from
/// the literal text emitted before it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum HtmlContext {
    /// Regular markup.
    #[default]
    Body,
    /// Inside an inline `<script>` element.
    Script,
    /// Inside an inline `<style>` element.
    Style,
}

impl fmt::Display for HtmlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HtmlContext::Body => "html",
            HtmlContext::Script => "script",
            HtmlContext::Style => "style",
        })
    }
}

/// A node of the shared intermediate representation.
///
/// Every front end compiles into this closed set of nodes which the
/// engine then executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// Evaluates a pipeline and writes its value.
    Action {
        pipeline: Pipeline,
        context: HtmlContext,
        lineno: usize,
    },
    /// Conditional branch.  `negated` inverts the truth test.
    If {
        pipeline: Pipeline,
        negated: bool,
        body: Vec<Node>,
        else_body: Vec<Node>,
        lineno: usize,
    },
    /// Executes `body` once per element, or `else_body` if there are none.
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        else_body: Vec<Node>,
        lineno: usize,
    },
    /// Rebinds the current data if the value is truthy.
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        else_body: Vec<Node>,
        lineno: usize,
    },
    /// Executes another unit.
    Template {
        name: String,
        pipeline: Option<Pipeline>,
        lineno: usize,
    },
}

/// A named, compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) auto_escape: AutoEscape,
}

impl Unit {
    /// Creates a unit from its logical name and nodes.
    pub fn new<S: Into<String>>(name: S, nodes: Vec<Node>) -> Unit {
        Unit {
            name: name.into(),
            nodes,
            auto_escape: AutoEscape::None,
        }
    }

    /// Returns the logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the auto escape mode the unit executes with.
    pub fn auto_escape(&self) -> AutoEscape {
        self.auto_escape
    }
}
