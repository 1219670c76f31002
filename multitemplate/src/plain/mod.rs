//! The delimiter based front end.
//!
//! This is the syntax of the underlying engine itself: literal text with
//! `{{ pipeline }}` actions.  It supports these statements:
//!
//! * `{{ if pipeline }}`, `{{ else if pipeline }}`, `{{ else }}`, `{{ end }}`
//! * `{{ range pipeline }}` and `{{ with pipeline }}` (both take an `else`)
//! * `{{ define "name" }}…{{ end }}` to declare an additional unit
//! * `{{ template "name" [pipeline] }}` to execute another unit
//! * `{{/* comments */}}`
//!
//! A `-` next to the delimiters (`{{- ` and ` -}}`) removes the whitespace
//! before or after the action.
use std::collections::BTreeMap;
use std::mem;

use crate::compiler::builder::IrBuilder;
use crate::compiler::ir::{Node, Unit};
use crate::error::{Error, ErrorKind};
use crate::pipeline::ast::Expr;
use crate::pipeline::parse_pipeline;
use crate::settings::{Delimiters, Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'s> {
    Text(&'s str),
    Action { statement: &'s str, lineno: usize },
}

fn syntax_error(msg: String, lineno: usize) -> Error {
    let mut err = Error::new(ErrorKind::SyntaxError, msg);
    err.set_lineno(lineno);
    err
}

fn starts_with_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().map_or(false, char::is_whitespace)
}

fn ends_with_trim_marker(s: &str) -> bool {
    let mut chars = s.chars().rev();
    chars.next() == Some('-') && chars.next().map_or(false, char::is_whitespace)
}

/// Splits a source into literal text and actions.
fn tokenize<'s>(source: &'s str, delimiters: &Delimiters) -> Result<Vec<Segment<'s>>, Error> {
    let (left, right) = (delimiters.left(), delimiters.right());
    let mut rv = Vec::new();
    let mut rest = source;
    let mut offset = 0;
    let mut trim_next = false;

    while let Some(start) = rest.find(left) {
        let lineno = source[..offset + start].matches('\n').count() + 1;
        let mut text = &rest[..start];
        if trim_next {
            text = text.trim_start();
        }
        let inner_start = start + left.len();
        let end = match rest[inner_start..].find(right) {
            Some(idx) => inner_start + idx,
            None => return Err(syntax_error("unclosed action".into(), lineno)),
        };
        let mut inner = &rest[inner_start..end];
        if starts_with_trim_marker(inner) {
            text = text.trim_end();
            inner = &inner[1..];
        }
        trim_next = ends_with_trim_marker(inner);
        if trim_next {
            inner = &inner[..inner.len() - 1];
        }
        if !text.is_empty() {
            rv.push(Segment::Text(text));
        }

        let statement = inner.trim();
        if statement.starts_with("/*") {
            if !statement.ends_with("*/") {
                return Err(syntax_error("unclosed comment".into(), lineno));
            }
        } else {
            rv.push(Segment::Action { statement, lineno });
        }

        let consumed = end + right.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        rv.push(Segment::Text(text));
    }
    Ok(rv)
}

/// How a list of nodes ended.
enum Terminator<'s> {
    Eof,
    End,
    Else(&'s str, usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Branch {
    If,
    Range,
    With,
}

struct Parser<'s, 'b> {
    segments: std::vec::IntoIter<Segment<'s>>,
    builder: IrBuilder<'b>,
    defines: Vec<(String, Vec<Node>)>,
}

impl<'s, 'b> Parser<'s, 'b> {
    fn parse_list(&mut self, out: &mut Vec<Node>) -> Result<Terminator<'s>, Error> {
        while let Some(segment) = self.segments.next() {
            let (statement, lineno) = match segment {
                Segment::Text(text) => {
                    self.builder.text(out, text);
                    continue;
                }
                Segment::Action { statement, lineno } => (statement, lineno),
            };
            let (keyword, rest) = match statement.split_once(char::is_whitespace) {
                Some((keyword, rest)) => (keyword, rest.trim()),
                None => (statement, ""),
            };
            match keyword {
                "end" if rest.is_empty() => return Ok(Terminator::End),
                "else" => return Ok(Terminator::Else(rest, lineno)),
                "if" => ok!(self.parse_branch(Branch::If, rest, lineno, out)),
                "range" => ok!(self.parse_branch(Branch::Range, rest, lineno, out)),
                "with" => ok!(self.parse_branch(Branch::With, rest, lineno, out)),
                "define" => ok!(self.parse_define(rest, lineno)),
                _ => ok!(self.builder.action(out, statement, lineno)),
            }
        }
        Ok(Terminator::Eof)
    }

    fn parse_branch(
        &mut self,
        branch: Branch,
        statement: &str,
        lineno: usize,
        out: &mut Vec<Node>,
    ) -> Result<(), Error> {
        let pipeline = ok!(self.builder.pipeline(statement, lineno));
        let mut body = Vec::new();
        let mut else_body = Vec::new();
        match ok!(self.parse_list(&mut body)) {
            Terminator::End => {}
            Terminator::Else("", _) => match ok!(self.parse_list(&mut else_body)) {
                Terminator::End => {}
                Terminator::Else(_, else_lineno) => {
                    return Err(syntax_error("expected end; found else".into(), else_lineno))
                }
                Terminator::Eof => return Err(syntax_error("missing end".into(), lineno)),
            },
            Terminator::Else(chained, else_lineno) => {
                let (keyword, rest) = chained.split_once(char::is_whitespace).unwrap_or((chained, ""));
                let chained_branch = match keyword {
                    "if" => Branch::If,
                    "with" => Branch::With,
                    _ => {
                        return Err(syntax_error(
                            format!("unexpected else clause {:?}", chained),
                            else_lineno,
                        ))
                    }
                };
                ok!(self.parse_branch(chained_branch, rest.trim(), else_lineno, &mut else_body));
            }
            Terminator::Eof => return Err(syntax_error("missing end".into(), lineno)),
        }
        out.push(match branch {
            Branch::If => Node::If {
                pipeline,
                negated: false,
                body,
                else_body,
                lineno,
            },
            Branch::Range => Node::Range {
                pipeline,
                body,
                else_body,
                lineno,
            },
            Branch::With => Node::With {
                pipeline,
                body,
                else_body,
                lineno,
            },
        });
        Ok(())
    }

    fn parse_define(&mut self, statement: &str, lineno: usize) -> Result<(), Error> {
        let pipeline = ok!(parse_pipeline(statement).map_err(|mut err| {
            err.set_lineno(lineno);
            err.with_statement(statement)
        }));
        let name = match pipeline.commands.as_slice() {
            [command] if pipeline.decl.is_empty() => match command.args.as_slice() {
                [Expr::Const(value)] => value.as_str().map(|x| x.to_string()),
                _ => None,
            },
            _ => None,
        };
        let name = match name {
            Some(name) => name,
            None => return Err(syntax_error("define requires a template name".into(), lineno)),
        };

        // a define has its own HTML context
        let settings = self.builder.settings();
        let outer = mem::replace(&mut self.builder, ok!(IrBuilder::new(settings)));
        let mut body = Vec::new();
        let terminator = self.parse_list(&mut body);
        self.builder = outer;
        match ok!(terminator) {
            Terminator::End => {
                self.defines.push((name, body));
                Ok(())
            }
            Terminator::Else(_, else_lineno) => {
                Err(syntax_error("unexpected else in define".into(), else_lineno))
            }
            Terminator::Eof => Err(syntax_error("missing end".into(), lineno)),
        }
    }
}

fn parse_units(name: &str, source: &str, settings: &Settings) -> Result<Vec<Unit>, Error> {
    let segments = ok!(tokenize(source, &settings.delimiters));
    let mut parser = Parser {
        segments: segments.into_iter(),
        builder: ok!(IrBuilder::new(settings)),
        defines: Vec::new(),
    };
    let mut nodes = Vec::new();
    match ok!(parser.parse_list(&mut nodes)) {
        Terminator::Eof => {}
        Terminator::End => return Err(Error::new(ErrorKind::SyntaxError, "unexpected end")),
        Terminator::Else(_, lineno) => return Err(syntax_error("unexpected else".into(), lineno)),
    }
    let mut rv = vec![Unit::new(name, nodes)];
    rv.extend(
        parser
            .defines
            .into_iter()
            .map(|(name, nodes)| Unit::new(name, nodes)),
    );
    Ok(rv)
}

/// Parses a delimiter based source into its units.
///
/// The source itself becomes a unit with the given name, every
/// `{{ define }}` an additional unit.
///
/// ```
/// # use multitemplate::{plain, Settings};
/// let source = r#"{{ define "nav" }}<nav></nav>{{ end }}{{ template "nav" }}"#;
/// let units = plain::parse("page", source, &Settings::default()).unwrap();
/// assert_eq!(units.keys().collect::<Vec<_>>(), vec!["nav", "page"]);
/// ```
pub fn parse(name: &str, source: &str, settings: &Settings) -> Result<BTreeMap<String, Unit>, Error> {
    let units = ok!(parse_units(name, source, settings).map_err(|mut err| {
        err.set_location(name, 0);
        err
    }));
    Ok(units
        .into_iter()
        .map(|unit| (unit.name.clone(), unit))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_tokenize() {
        let delimiters = Delimiters::default();
        assert_eq!(
            tokenize("a {{ .B }}\n{{/* note */}}c  {{- .D -}}  e", &delimiters).unwrap(),
            vec![
                Segment::Text("a "),
                Segment::Action {
                    statement: ".B",
                    lineno: 1
                },
                Segment::Text("\n"),
                Segment::Text("c"),
                Segment::Action {
                    statement: ".D",
                    lineno: 2
                },
                Segment::Text("e"),
            ]
        );
        assert!(tokenize("{{ .A", &delimiters).is_err());
    }

    #[test]
    fn test_branches() {
        let units = parse(
            "page",
            "{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}{{ range .C }}x{{ end }}",
            &Settings::default(),
        )
        .unwrap();
        let nodes = units["page"].nodes();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::If { else_body, .. } => {
                assert!(matches!(&else_body[0], Node::If { else_body, .. } if else_body == &vec![Node::Text("c".into())]));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(nodes[1], Node::Range { .. }));
    }

    #[test]
    fn test_defines() {
        let units = parse(
            "page",
            "{{ define \"a\" }}<script>{{ end }}{{ .X }}",
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units["a"].nodes(), &[Node::Text("<script>".into())]);
        // the define does not leak its context into the page
        assert!(matches!(
            units["page"].nodes()[0],
            Node::Action {
                context: crate::compiler::ir::HtmlContext::Body,
                ..
            }
        ));
    }

    #[test]
    fn test_errors() {
        let settings = Settings::default();
        let err = parse("page", "{{ if .A }}\nx", &settings).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.name(), Some("page"));
        assert_eq!(err.line(), Some(1));
        assert!(parse("page", "{{ end }}", &settings).is_err());
        assert!(parse("page", "{{ define .X }}{{ end }}", &settings).is_err());
        let err = parse("page", "a\n{{ .A | }}", &settings).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.statement(), Some(".A |"));
    }
}
