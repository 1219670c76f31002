use std::fmt;

/// Represents a token in a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// The current data (`.`).
    Dot,
    /// A field access (`.Name`), without the dot.
    Field(&'a str),
    /// A variable (`$name`), without the dollar sign.  `$` alone is the
    /// empty name.
    Var(&'a str),
    /// An identifier: a function name or `true`, `false`, `nil`.
    Ident(&'a str),
    /// A borrowed string.
    Str(&'a str),
    /// An allocated string.
    String(String),
    /// An integer (limited to i64)
    Int(i64),
    /// A float
    Float(f64),
    /// The pipe symbol.
    Pipe,
    /// The declaration operator (`:=`)
    Declare,
    /// The assignment operator (`=`)
    Assign,
    /// The comma operator (`,`)
    Comma,
    /// Open Parenthesis
    ParenOpen,
    /// Close Parenthesis
    ParenClose,
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Dot => f.write_str("`.`"),
            Token::Field(name) => write!(f, "field `.{name}`"),
            Token::Var(name) => write!(f, "variable `${name}`"),
            Token::Ident(name) => write!(f, "identifier `{name}`"),
            Token::Str(_) | Token::String(_) => f.write_str("string"),
            Token::Int(_) => f.write_str("integer"),
            Token::Float(_) => f.write_str("float"),
            Token::Pipe => f.write_str("`|`"),
            Token::Declare => f.write_str("`:=`"),
            Token::Assign => f.write_str("`=`"),
            Token::Comma => f.write_str("`,`"),
            Token::ParenOpen => f.write_str("`(`"),
            Token::ParenClose => f.write_str("`)`"),
        }
    }
}

/// Token span information, as byte offsets into the statement.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start_offset: u32,
    pub end_offset: u32,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " @ {}-{}", self.start_offset, self.end_offset)
    }
}
