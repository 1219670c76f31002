use crate::value::Value;

/// A parsed pipeline.
///
/// `$x := .A | f` declares `$x` and has two commands.  The value of a
/// pipeline is the value of its last command.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Variables declared or assigned by the pipeline.
    pub decl: Vec<String>,
    /// `true` for `=`, `false` for `:=`.
    pub is_assign: bool,
    pub commands: Vec<Command>,
}

/// One command of a pipeline.
///
/// If the first argument is a [`Expr::Func`] the command is a function
/// call, otherwise it must consist of a single operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The current data.
    Dot,
    /// A field chain on the current data (`.A.B`).
    Field(Vec<String>),
    /// A variable with an optional field chain (`$x.A`).
    Var { name: String, fields: Vec<String> },
    /// A function name.
    Func(String),
    /// A literal.
    Const(Value),
    /// A parenthesized pipeline with an optional field chain (`(f .X).A`).
    Sub {
        pipeline: Box<Pipeline>,
        fields: Vec<String>,
    },
}

impl Pipeline {
    /// Returns the function name if this pipeline is a single call to it.
    pub fn called_function(&self) -> Option<&str> {
        match self.commands.as_slice() {
            [Command { args }] if self.decl.is_empty() => match args.first() {
                Some(Expr::Func(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A `template "name" [pipeline]` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCall {
    pub name: String,
    pub pipeline: Option<Pipeline>,
}
