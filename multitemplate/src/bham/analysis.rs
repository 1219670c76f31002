use std::sync::Arc;

use crate::bham::lines::Line;
use crate::error::{Error, ErrorKind};
use crate::settings::{FilterHandler, Settings};

/// A node of the indentation tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Indentation level of the source line.
    #[cfg(any(test, feature = "unstable_machinery"))]
    pub level: usize,
    /// One based line number of the source line.
    pub lineno: usize,
    pub kind: NodeKind,
}

/// The kinds of nodes the analyzer produces.
///
/// Tags with children are represented by an open and a close node
/// surrounding the (flat) nodes of their children.  Both carry the
/// original tag line.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Literal text that is not interpolated (doctypes).
    Raw(String),
    /// A line of text.
    Text(String),
    /// A statement on a `=` or `-` line.
    Executable(String),
    /// A tag line without children.
    TagLeaf(String),
    /// A tag line with children.
    TagOpen(String),
    /// The end of a tag with children.
    TagClose(String),
    /// `if` or `unless` (`negated`) with an optional `else`.
    Conditional {
        statement: String,
        negated: bool,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `range` with an optional `else`.
    Loop {
        statement: String,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `with`.
    ScopeBind { statement: String, body: Vec<Node> },
    /// A `:trigger` block.  The body keeps its relative indentation.
    Filter {
        body: String,
        handler: Arc<FilterHandler>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Keyword {
    If,
    Unless,
    Range,
    With,
}

impl Keyword {
    fn parse(statement: &str) -> Option<(Keyword, &str)> {
        [
            ("if ", Keyword::If),
            ("unless ", Keyword::Unless),
            ("range ", Keyword::Range),
            ("with ", Keyword::With),
        ]
        .into_iter()
        .find_map(|(prefix, keyword)| {
            statement
                .strip_prefix(prefix)
                .map(|rest| (keyword, rest.trim()))
        })
    }

    fn takes_else(self) -> bool {
        !matches!(self, Keyword::With)
    }
}

fn is_else(statement: &str) -> bool {
    statement == "else" || statement.starts_with("else ")
}

/// Returns the end of the run of lines nested below `lines[idx]`.
fn nested_end(lines: &[Line<'_>], idx: usize) -> usize {
    let level = lines[idx].indent;
    lines[idx + 1..]
        .iter()
        .position(|line| line.indent <= level)
        .map_or(lines.len(), |pos| idx + 1 + pos)
}

fn node(line: &Line<'_>, kind: NodeKind) -> Node {
    Node {
        #[cfg(any(test, feature = "unstable_machinery"))]
        level: line.indent,
        lineno: line.lineno,
        kind,
    }
}

struct Analyzer<'a> {
    settings: &'a Settings,
}

impl<'a> Analyzer<'a> {
    fn analyze(&self, lines: &[Line<'_>], out: &mut Vec<Node>) -> Result<(), Error> {
        let mut idx = 0;
        while idx < lines.len() {
            let lineno = lines[idx].lineno;
            idx = ok!(self.analyze_line(lines, idx, out).map_err(|mut err| {
                err.set_lineno(lineno);
                err
            }));
        }
        Ok(())
    }

    fn analyze_line(&self, lines: &[Line<'_>], idx: usize, out: &mut Vec<Node>) -> Result<usize, Error> {
        let line = &lines[idx];
        if line.is_tag() {
            self.tag(lines, idx, out)
        } else if line.is_actionable() {
            let statement = line.statement();
            if is_else(statement) {
                return Err(Error::new(
                    ErrorKind::SyntaxError,
                    "else without a matching if, unless or range",
                ));
            }
            match Keyword::parse(statement) {
                Some((keyword, statement)) => {
                    let (node, next) = ok!(self.block(lines, idx, keyword, statement));
                    out.push(node);
                    Ok(next)
                }
                None => {
                    out.push(node(line, NodeKind::Executable(statement.into())));
                    Ok(idx + 1)
                }
            }
        } else if let Some(trigger) = line.content.strip_prefix(':') {
            let handler = match self.settings.get_filter_handler(trigger.trim()) {
                Some(handler) => handler.clone(),
                None => {
                    return Err(Error::new(
                        ErrorKind::UnknownFilter,
                        line.content.to_string(),
                    ))
                }
            };
            let end = nested_end(lines, idx);
            let body = lines[idx + 1..end]
                .iter()
                .map(|nested| {
                    format!(
                        "{}{}",
                        "  ".repeat(nested.indent - line.indent - 1),
                        nested.content
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            out.push(node(line, NodeKind::Filter { body, handler }));
            Ok(end)
        } else if let Some(key) = line.content.strip_prefix("!!!") {
            match self.settings.get_doctype(key.trim()) {
                Some(doctype) => out.push(node(line, NodeKind::Raw(doctype.into()))),
                None => {
                    return Err(Error::new(
                        ErrorKind::UnknownDoctype,
                        line.content.to_string(),
                    ))
                }
            }
            Ok(idx + 1)
        } else {
            out.push(node(line, NodeKind::Text(line.content.to_string())));
            Ok(idx + 1)
        }
    }

    fn tag(&self, lines: &[Line<'_>], idx: usize, out: &mut Vec<Node>) -> Result<usize, Error> {
        let line = &lines[idx];
        let content = line.content.to_string();
        let end = nested_end(lines, idx);
        if end == idx + 1 {
            out.push(node(line, NodeKind::TagLeaf(content)));
            return Ok(end);
        }
        out.push(node(line, NodeKind::TagOpen(content.clone())));
        ok!(self.analyze(&lines[idx + 1..end], out));
        out.push(node(line, NodeKind::TagClose(content)));
        Ok(end)
    }

    /// Analyzes a block statement and its else clause.
    ///
    /// `lines[idx]` is the line introducing the block, `statement` the
    /// statement without the keyword.
    fn block(
        &self,
        lines: &[Line<'_>],
        idx: usize,
        keyword: Keyword,
        statement: &str,
    ) -> Result<(Node, usize), Error> {
        let line = &lines[idx];
        let end = nested_end(lines, idx);
        let mut body = Vec::new();
        ok!(self.analyze(&lines[idx + 1..end], &mut body));

        let mut else_body = Vec::new();
        let mut next = end;
        if let Some(else_line) = lines.get(end).filter(|x| {
            keyword.takes_else() && x.indent == line.indent && x.is_actionable() && is_else(x.statement())
        }) {
            let chained = else_line.statement()["else".len()..].trim();
            if chained.is_empty() {
                next = nested_end(lines, end);
                ok!(self
                    .analyze(&lines[end + 1..next], &mut else_body)
                    .map_err(|mut err| {
                        err.set_lineno(else_line.lineno);
                        err
                    }));
            } else {
                match Keyword::parse(chained) {
                    Some((chained_keyword, chained_statement)) if chained_keyword != Keyword::With => {
                        let (chained_node, chained_next) = ok!(self
                            .block(lines, end, chained_keyword, chained_statement)
                            .map_err(|mut err| {
                                err.set_lineno(else_line.lineno);
                                err
                            }));
                        else_body.push(chained_node);
                        next = chained_next;
                    }
                    _ => {
                        let mut err = Error::new(
                            ErrorKind::SyntaxError,
                            format!("unexpected else clause {:?}", else_line.statement()),
                        );
                        err.set_lineno(else_line.lineno);
                        return Err(err);
                    }
                }
            }
        }

        let statement = statement.to_string();
        let kind = match keyword {
            Keyword::If | Keyword::Unless => NodeKind::Conditional {
                statement,
                negated: keyword == Keyword::Unless,
                body,
                else_body,
            },
            Keyword::Range => NodeKind::Loop {
                statement,
                body,
                else_body,
            },
            Keyword::With => NodeKind::ScopeBind { statement, body },
        };
        Ok((node(line, kind), next))
    }
}

/// Builds the node tree for a sequence of lines.
///
/// Analysis stops at the first error.
pub fn analyze(lines: &[Line<'_>], settings: &Settings) -> Result<Vec<Node>, Error> {
    let mut rv = Vec::new();
    ok!(Analyzer { settings }.analyze(lines, &mut rv));
    Ok(rv)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::bham::lines::classify_lines;

    fn analyze_source(source: &str) -> Result<Vec<Node>, Error> {
        let settings = Settings::default();
        analyze(&classify_lines(source, false).unwrap(), &settings)
    }

    fn describe(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Raw(s) => format!("raw {}", s),
                NodeKind::Text(s) => format!("text {}", s),
                NodeKind::Executable(s) => format!("exec {}", s),
                NodeKind::TagLeaf(s) => format!("leaf {}", s),
                NodeKind::TagOpen(s) => format!("open {}", s),
                NodeKind::TagClose(s) => format!("close {}", s),
                NodeKind::Conditional {
                    statement,
                    negated,
                    body,
                    else_body,
                } => format!(
                    "if{} {} [{}] [{}]",
                    if *negated { " not" } else { "" },
                    statement,
                    describe(body).join(", "),
                    describe(else_body).join(", ")
                ),
                NodeKind::Loop {
                    statement,
                    body,
                    else_body,
                } => format!(
                    "range {} [{}] [{}]",
                    statement,
                    describe(body).join(", "),
                    describe(else_body).join(", ")
                ),
                NodeKind::ScopeBind { statement, body } => {
                    format!("with {} [{}]", statement, describe(body).join(", "))
                }
                NodeKind::Filter { body, handler } => {
                    format!("filter {} {:?}", handler.trigger(), body)
                }
            })
            .collect()
    }

    #[test]
    fn test_tags() {
        let nodes = analyze_source("!!!\n%html\n  %head").unwrap();
        assert_eq!(
            describe(&nodes),
            vec![
                "raw <!DOCTYPE html>",
                "open %html",
                "leaf %head",
                "close %html",
            ]
        );
        assert_eq!(nodes[3].level, 0);
        assert_eq!(nodes[2].lineno, 3);
    }

    #[test]
    fn test_if_else() {
        let nodes =
            analyze_source("!!!\n= if .HTML\n  %html\n    %head\n      %title Test\n= else\n  %xhtml")
                .unwrap();
        assert_eq!(
            describe(&nodes),
            vec![
                "raw <!DOCTYPE html>",
                "if .HTML [open %html, open %head, leaf %title Test, close %head, close %html] [leaf %xhtml]",
            ]
        );
    }

    #[test]
    fn test_else_if_chain_and_unless() {
        let nodes = analyze_source("- if .A\n  a\n- else if .B\n  b\n- else\n  c\n- unless .D\n  d").unwrap();
        assert_eq!(
            describe(&nodes),
            vec![
                "if .A [text a] [if .B [text b] [text c]]",
                "if not .D [text d] []",
            ]
        );
    }

    #[test]
    fn test_range_with_and_executables() {
        let nodes =
            analyze_source("= range .Items\n  = .\n= else\n  none\n= with .User\n  = .Name\n= .Footer")
                .unwrap();
        assert_eq!(
            describe(&nodes),
            vec![
                "range .Items [exec .] [text none]",
                "with .User [exec .Name]",
                "exec .Footer",
            ]
        );
    }

    #[test]
    fn test_filter_keeps_nesting() {
        let nodes = analyze_source("%html\n  :javascript\n    if (x) {\n      y();\n    }\n  %p").unwrap();
        assert_eq!(
            describe(&nodes),
            vec![
                "open %html",
                "filter javascript \"if (x) {\\n  y();\\n}\"",
                "leaf %p",
                "close %html",
            ]
        );
    }

    #[test]
    fn test_errors() {
        let err = analyze_source("%html\n  :coffee\n    x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFilter);
        assert_eq!(err.line(), Some(2));
        insta::assert_snapshot!(err, @"bad handler: :coffee");

        let err = analyze_source("!!! 6").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDoctype);

        let err = analyze_source("%p\n= else\n  x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.line(), Some(2));

        let err = analyze_source("= with .A\n  a\n= else\n  b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.line(), Some(3));
    }
}
