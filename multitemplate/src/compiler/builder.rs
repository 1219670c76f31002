use aho_corasick::AhoCorasick;

use crate::compiler::ir::{HtmlContext, Node};
use crate::error::{Error, ErrorKind};
use crate::pipeline::ast::Pipeline;
use crate::pipeline::{parse_pipeline, parse_template_call};
use crate::settings::Settings;

const SCRIPT_OPEN: usize = 0;
const SCRIPT_CLOSE: usize = 1;
const STYLE_OPEN: usize = 2;
const STYLE_CLOSE: usize = 3;

/// Tracks whether literal output is currently inside an inline script or
/// style element.
///
/// The tracker is fed all literal text of a unit in the order it is
/// emitted.  Only the raw text elements matter, everything else is body.
pub(crate) struct ContextTracker {
    matcher: AhoCorasick,
    state: HtmlContext,
}

impl ContextTracker {
    pub fn new() -> Result<ContextTracker, Error> {
        let matcher = ok!(AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(["<script", "</script", "<style", "</style"])
            .map_err(|err| {
                Error::new(ErrorKind::InvalidOperation, "unable to build context matcher")
                    .with_source(err)
            }));
        Ok(ContextTracker {
            matcher,
            state: HtmlContext::Body,
        })
    }

    /// Returns the context output written now ends up in.
    pub fn context(&self) -> HtmlContext {
        self.state
    }

    /// Advances the state over a piece of literal text.
    pub fn feed(&mut self, text: &str) {
        for m in self.matcher.find_iter(text) {
            // `<scripts` or `<styled` are not the elements we are after
            match text[m.end()..].chars().next() {
                None | Some('>' | '/') => {}
                Some(c) if c.is_whitespace() => {}
                Some(_) => continue,
            }
            self.state = match (self.state, m.pattern().as_usize()) {
                (HtmlContext::Body, SCRIPT_OPEN) => HtmlContext::Script,
                (HtmlContext::Body, STYLE_OPEN) => HtmlContext::Style,
                (HtmlContext::Script, SCRIPT_CLOSE) | (HtmlContext::Style, STYLE_CLOSE) => {
                    HtmlContext::Body
                }
                (state, _) => state,
            };
        }
    }
}

/// Attaches the offending statement and its line to an error.
pub(crate) fn statement_error(mut err: Error, statement: &str, lineno: usize) -> Error {
    err.set_lineno(lineno);
    err.with_statement(statement)
}

/// Emits IR nodes on behalf of a front end.
///
/// Both front ends write all their output through one builder per unit so
/// that literal text is merged and the HTML context of every action is
/// known when it is compiled.
pub struct IrBuilder<'s> {
    settings: &'s Settings,
    tracker: ContextTracker,
}

impl<'s> IrBuilder<'s> {
    /// Creates a builder for a single unit.
    pub fn new(settings: &'s Settings) -> Result<IrBuilder<'s>, Error> {
        Ok(IrBuilder {
            settings,
            tracker: ok!(ContextTracker::new()),
        })
    }

    /// Returns the settings the unit is compiled with.
    pub fn settings(&self) -> &'s Settings {
        self.settings
    }

    /// Returns the HTML context at the current position.
    pub fn context(&self) -> HtmlContext {
        self.tracker.context()
    }

    /// Emits literal text without looking for interpolations.
    pub fn text(&mut self, out: &mut Vec<Node>, text: &str) {
        if text.is_empty() {
            return;
        }
        self.tracker.feed(text);
        if let Some(Node::Text(prev)) = out.last_mut() {
            prev.push_str(text);
        } else {
            out.push(Node::Text(text.to_string()));
        }
    }

    /// Emits text with embedded interpolations.
    ///
    /// Literal text in front of an interpolation is written as is, the
    /// interpolation becomes an action.  With `pad` a single space is added
    /// after the text following the last interpolation (or after the whole
    /// text if it has none) and after an interpolation that failed to parse.
    ///
    /// An interpolation that fails to parse is kept as literal text unless
    /// strict interpolation is enabled.
    pub fn text_nodes(
        &mut self,
        out: &mut Vec<Node>,
        text: &str,
        pad: bool,
        lineno: usize,
    ) -> Result<(), Error> {
        let left = self.settings.delimiters.left();
        let right = self.settings.delimiters.right();
        let mut rest = text;

        while let Some(start) = rest.find(left) {
            let end = match rest[start + left.len()..].find(right) {
                Some(idx) => start + left.len() + idx,
                None => break,
            };
            self.text(out, &rest[..start]);
            let raw = &rest[start..end + right.len()];
            let statement = &rest[start + left.len()..end];
            match self.compile_action(statement, lineno) {
                Ok(node) => out.push(node),
                Err(err) if self.settings.strict_interpolation => return Err(err),
                Err(err) => {
                    log::warn!(
                        "line {}: keeping interpolation {:?} as text: {}",
                        lineno,
                        raw,
                        err
                    );
                    self.text(out, raw);
                    if pad {
                        self.text(out, " ");
                    }
                }
            }
            rest = &rest[end + right.len()..];
            if rest.is_empty() {
                return Ok(());
            }
        }

        self.text(out, rest);
        if pad {
            self.text(out, " ");
        }
        Ok(())
    }

    /// Emits an action or a template call for a statement.
    pub fn action(&mut self, out: &mut Vec<Node>, statement: &str, lineno: usize) -> Result<(), Error> {
        out.push(ok!(self.compile_action(statement, lineno)));
        Ok(())
    }

    /// Parses the pipeline of a branch statement.
    pub fn pipeline(&self, statement: &str, lineno: usize) -> Result<Pipeline, Error> {
        parse_pipeline(statement).map_err(|err| statement_error(err, statement, lineno))
    }

    fn compile_action(&self, statement: &str, lineno: usize) -> Result<Node, Error> {
        let context = self.context();
        let node = match parse_template_call(statement) {
            Ok(Some(call)) => Ok(Node::Template {
                name: call.name,
                pipeline: call.pipeline,
                lineno,
            }),
            Ok(None) => parse_pipeline(statement).map(|pipeline| Node::Action {
                pipeline,
                context,
                lineno,
            }),
            Err(err) => Err(err),
        };
        node.map_err(|err| statement_error(err, statement, lineno))
    }
}
