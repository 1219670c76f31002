use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, ErrorKind};
use crate::pipeline::ast::{Command, Expr, Pipeline, TemplateCall};
use crate::pipeline::lexer::Tokenizer;
use crate::pipeline::tokens::{Span, Token};
use crate::value::Value;

const MAX_RECURSION: usize = 150;

fn unexpected<D: fmt::Display>(unexpected: D, expected: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("unexpected {unexpected}, expected {expected}"),
    )
}

fn unexpected_eof(expected: &str) -> Error {
    unexpected("end of pipeline", expected)
}

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(syntax_error(Cow::Borrowed($msg)));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(syntax_error(Cow::Owned(format!($msg, $($tt)*))));
    }};
}

struct TokenStream<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    pos: usize,
}

impl<'a> TokenStream<'a> {
    fn new(source: &'a str) -> Result<TokenStream<'a>, Error> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = ok!(tokenizer.next_token()) {
            tokens.push(token);
        }
        Ok(TokenStream { tokens, pos: 0 })
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        let rv = self.tokens.get(self.pos).cloned();
        if rv.is_some() {
            self.pos += 1;
        }
        rv
    }

    fn current(&self) -> Option<&(Token<'a>, Span)> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n).map(|x| &x.0)
    }

    /// Returns the name of a field that directly follows the previous token.
    fn adjacent_field(&self) -> Option<&'a str> {
        let prev_end = some!(self.pos.checked_sub(1).and_then(|x| self.tokens.get(x))).1;
        match self.current() {
            Some((Token::Field(name), span)) if span.start_offset == prev_end.end_offset => {
                Some(name)
            }
            _ => None,
        }
    }
}

struct Parser<'a> {
    stream: TokenStream<'a>,
    depth: usize,
}

macro_rules! with_recursion_guard {
    ($parser:expr, $expr:expr) => {{
        $parser.depth += 1;
        if $parser.depth > MAX_RECURSION {
            syntax_error!("pipeline exceeds maximum recursion limits");
        }
        let rv = $expr;
        $parser.depth -= 1;
        rv
    }};
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Parser<'a>, Error> {
        Ok(Parser {
            stream: ok!(TokenStream::new(source)),
            depth: 0,
        })
    }

    fn parse_declarations(&mut self) -> (Vec<String>, bool) {
        let (decl, skip) = match (self.stream.peek(0), self.stream.peek(1), self.stream.peek(2), self.stream.peek(3)) {
            (Some(Token::Var(a)), Some(Token::Declare | Token::Assign), _, _) => {
                (vec![a.to_string()], 1)
            }
            (
                Some(Token::Var(a)),
                Some(Token::Comma),
                Some(Token::Var(b)),
                Some(Token::Declare | Token::Assign),
            ) => (vec![a.to_string(), b.to_string()], 3),
            _ => return (Vec::new(), false),
        };
        self.stream.pos += skip;
        let is_assign = matches!(self.stream.next(), Some((Token::Assign, _)));
        (decl, is_assign)
    }

    fn parse_pipeline(&mut self, nested: bool) -> Result<Pipeline, Error> {
        let (decl, is_assign) = self.parse_declarations();
        let mut commands = Vec::new();
        loop {
            let command = ok!(self.parse_command());
            if command.args.is_empty() {
                syntax_error!("missing command");
            }
            commands.push(command);
            match self.stream.current() {
                Some((Token::Pipe, _)) => {
                    self.stream.next();
                }
                Some((Token::ParenClose, _)) if nested => break,
                Some((token, _)) => return Err(unexpected(token, "end of pipeline")),
                None if nested => return Err(unexpected_eof("`)`")),
                None => break,
            }
        }
        Ok(Pipeline {
            decl,
            is_assign,
            commands,
        })
    }

    fn parse_command(&mut self) -> Result<Command, Error> {
        let mut args = Vec::new();
        while let Some((token, _)) = self.stream.current() {
            if matches!(token, Token::Pipe | Token::ParenClose) {
                break;
            }
            args.push(ok!(self.parse_operand()));
        }
        if args.len() > 1 && !matches!(args[0], Expr::Func(_)) {
            if let Expr::Const(ref value) = args[0] {
                syntax_error!("can't give argument to non-function {:?}", value);
            }
        }
        Ok(Command { args })
    }

    fn parse_fields(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        while let Some(name) = self.stream.adjacent_field() {
            fields.push(name.to_string());
            self.stream.next();
        }
        fields
    }

    fn parse_operand(&mut self) -> Result<Expr, Error> {
        let (token, _) = match self.stream.next() {
            Some(rv) => rv,
            None => return Err(unexpected_eof("operand")),
        };
        Ok(match token {
            Token::Dot => {
                if self.stream.adjacent_field().is_some() {
                    syntax_error!("unexpected field after `.`");
                }
                Expr::Dot
            }
            Token::Field(name) => {
                let mut fields = vec![name.to_string()];
                fields.extend(self.parse_fields());
                Expr::Field(fields)
            }
            Token::Var(name) => Expr::Var {
                name: name.to_string(),
                fields: self.parse_fields(),
            },
            Token::Ident("true") => Expr::Const(Value::from(true)),
            Token::Ident("false") => Expr::Const(Value::from(false)),
            Token::Ident("nil") => Expr::Const(Value::from(())),
            Token::Ident(name) => {
                if self.stream.adjacent_field().is_some() {
                    syntax_error!("function {} can't have fields", name);
                }
                Expr::Func(name.to_string())
            }
            Token::Str(s) => Expr::Const(Value::from(s)),
            Token::String(s) => Expr::Const(Value::from(s)),
            Token::Int(i) => Expr::Const(Value::from(i)),
            Token::Float(f) => Expr::Const(Value::from(f)),
            Token::ParenOpen => {
                let pipeline = ok!(with_recursion_guard!(self, self.parse_pipeline(true)));
                match self.stream.next() {
                    Some((Token::ParenClose, _)) => {}
                    Some((token, _)) => return Err(unexpected(token, "`)`")),
                    None => return Err(unexpected_eof("`)`")),
                }
                Expr::Sub {
                    pipeline: Box::new(pipeline),
                    fields: self.parse_fields(),
                }
            }
            token => return Err(unexpected(token, "operand")),
        })
    }
}

/// Parses a single pipeline statement.
///
/// `$x := .Items | len` for instance declares `x` and has two commands.
pub fn parse_pipeline(source: &str) -> Result<Pipeline, Error> {
    let mut parser = ok!(Parser::new(source));
    if parser.stream.current().is_none() {
        syntax_error!("missing value for command");
    }
    parser.parse_pipeline(false)
}

/// Parses a `template "name" [pipeline]` statement.
///
/// Returns `None` if the statement does not start with the `template`
/// keyword.
pub fn parse_template_call(source: &str) -> Result<Option<TemplateCall>, Error> {
    let mut tokenizer = Tokenizer::new(source);
    match ok!(tokenizer.next_token()) {
        Some((Token::Ident("template"), _)) => {}
        _ => return Ok(None),
    }
    let name = match ok!(tokenizer.next_token()) {
        Some((Token::Str(name), _)) => name.to_string(),
        Some((Token::String(name), _)) => name,
        Some((token, _)) => return Err(unexpected(token, "template name")),
        None => return Err(unexpected_eof("template name")),
    };
    let rest = &source[tokenizer.offset()..];
    let pipeline = if rest.trim().is_empty() {
        None
    } else {
        Some(ok!(parse_pipeline(rest)))
    };
    Ok(Some(TemplateCall { name, pipeline }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_field_chain() {
        let p = parse_pipeline(".Person.Name").unwrap();
        assert_eq!(
            p.commands,
            vec![Command {
                args: vec![Expr::Field(fields(&["Person", "Name"]))]
            }]
        );
    }

    #[test]
    fn test_separate_fields_are_separate_args() {
        let p = parse_pipeline("eq .A .B").unwrap();
        assert_eq!(
            p.commands[0].args,
            vec![
                Expr::Func("eq".into()),
                Expr::Field(fields(&["A"])),
                Expr::Field(fields(&["B"])),
            ]
        );
    }

    #[test]
    fn test_range_declaration() {
        let p = parse_pipeline("$i, $e := .Items").unwrap();
        assert_eq!(p.decl, fields(&["i", "e"]));
        assert!(!p.is_assign);
        let p = parse_pipeline("$x = 1").unwrap();
        assert_eq!(p.decl, fields(&["x"]));
        assert!(p.is_assign);
    }

    #[test]
    fn test_sub_pipeline_with_fields() {
        let p = parse_pipeline(r#"yield "sidebar" (fallback "default")"#).unwrap();
        assert_eq!(p.called_function(), Some("yield"));
        match &p.commands[0].args[2] {
            Expr::Sub { pipeline, fields } => {
                assert!(fields.is_empty());
                assert_eq!(pipeline.called_function(), Some("fallback"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let p = parse_pipeline("(index .Items 0).Name").unwrap();
        assert!(matches!(
            &p.commands[0].args[0],
            Expr::Sub { fields, .. } if fields == &vec!["Name".to_string()]
        ));
    }

    #[test]
    fn test_errors() {
        insta::assert_snapshot!(
            parse_pipeline("").unwrap_err(),
            @"syntax error: missing value for command"
        );
        insta::assert_snapshot!(
            parse_pipeline(".A |").unwrap_err(),
            @"syntax error: missing command"
        );
        insta::assert_snapshot!(
            parse_pipeline("(len .A").unwrap_err(),
            @"syntax error: unexpected end of pipeline, expected `)`"
        );
        assert!(parse_pipeline(r#""a" .B"#).is_err());
        assert!(parse_pipeline("wat(").is_err());
    }

    #[test]
    fn test_template_call() {
        let call = parse_template_call(r#"template "nav" .Links"#)
            .unwrap()
            .unwrap();
        assert_eq!(call.name, "nav");
        assert!(call.pipeline.is_some());
        assert_eq!(parse_template_call(".Name").unwrap(), None);
        assert!(parse_template_call("template .Name").is_err());
    }
}
