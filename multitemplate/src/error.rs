use std::borrow::Cow;
use std::fmt;

/// Represents template errors.
///
/// Errors raised while compiling a source carry the logical template name
/// and the one based line number of the offending source line.  Errors
/// about a single statement additionally carry the statement text which
/// is shown when the error is formatted with the alternative formatting
/// (``format!("{:#}", err)``).
///
/// # Example
///
/// Here is an example of you might want to render errors:
///
/// ```rust
/// # let mut env = multitemplate::Environment::new();
/// # env.add_template("hello.bham", "%p Hello").unwrap();
/// # let template = env.get_template("hello").unwrap();
/// match template.render(()) {
///     Ok(result) => println!("{}", result),
///     Err(err) => {
///         eprintln!("Could not render template:");
///         eprintln!("  {:#}", err);
///     }
/// }
/// ```
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    name: Option<String>,
    lineno: usize,
    statement: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("name", &self.name)
            .field("lineno", &self.lineno)
            .field("statement", &self.statement)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A line is indented more than one level deeper than the line before it.
    LineOverindented,
    /// A continuation line ran into the end of the source.
    LineNotCompleted,
    /// A `:trigger` line names a filter handler that is not registered.
    UnknownFilter,
    /// A `!!!` line names a doctype that is not registered.
    UnknownDoctype,
    /// A statement, action or pipeline could not be parsed.
    SyntaxError,
    /// The attribute list of a tag line is missing its closing `)`.
    UnterminatedAttributes,
    /// An attribute value is not enclosed in double quotes.
    MissingAttributeQuotes,
    /// The configured interpolation delimiters are unusable.
    InvalidDelimiter,
    /// No front end is registered for the requested syntax.
    UnknownParser,
    /// A template was requested that does not exist.
    TemplateNotFound,
    /// A pipeline called a function that does not exist.
    UnknownFunction,
    /// A function was called with unsuitable arguments.
    InvalidArguments,
    /// An operation was performed that cannot be carried out.
    InvalidOperation,
    /// Pre-rendered content was injected into the wrong HTML context.
    MismatchedBlockContext,
    /// Render data could not be converted into the internal value format.
    BadSerialization,
    /// The rendered output could not be written.
    WriteFailure,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::LineOverindented => "line overindented",
            ErrorKind::LineNotCompleted => "line not completed",
            ErrorKind::UnknownFilter => "bad handler",
            ErrorKind::UnknownDoctype => "bad doctype",
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::UnterminatedAttributes => "unterminated attribute list",
            ErrorKind::MissingAttributeQuotes => "missing attribute quotes",
            ErrorKind::InvalidDelimiter => "invalid delimiter",
            ErrorKind::UnknownParser => "unknown parser",
            ErrorKind::TemplateNotFound => "template not found",
            ErrorKind::UnknownFunction => "unknown function",
            ErrorKind::InvalidArguments => "invalid arguments",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::MismatchedBlockContext => "mismatched block context",
            ErrorKind::BadSerialization => "could not serialize to internal format",
            ErrorKind::WriteFailure => "failed to write output",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.detail {
            write!(f, "{}: {}", self.kind, detail)?;
        } else {
            write!(f, "{}", self.kind)?;
        }
        if let Some(ref filename) = self.name {
            write!(f, " (in {}:{})", filename, self.lineno)?
        }
        if f.alternate() {
            if let Some(ref statement) = self.statement {
                writeln!(f)?;
                write!(f, "{:>4} > {}", self.lineno, statement)?;
            }
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            name: None,
            lineno: 0,
            statement: None,
            source: None,
        }
    }

    /// Attaches the template name and line unless a location is already known.
    pub(crate) fn set_location(&mut self, filename: &str, lineno: usize) {
        if self.name.is_none() {
            self.name = Some(filename.into());
            if self.lineno == 0 {
                self.lineno = lineno;
            }
        }
    }

    pub(crate) fn set_lineno(&mut self, lineno: usize) {
        if self.lineno == 0 {
            self.lineno = lineno;
        }
    }

    pub(crate) fn with_statement<S: Into<String>>(mut self, statement: S) -> Self {
        if self.statement.is_none() {
            self.statement = Some(statement.into());
        }
        self
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error detail
    ///
    /// The detail is an error message that provides further details about
    /// the error kind.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the logical template name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the line.
    pub fn line(&self) -> Option<usize> {
        if self.lineno > 0 {
            Some(self.lineno)
        } else {
            None
        }
    }

    /// Returns the statement or tag line the error was raised for.
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            detail: None,
            name: None,
            lineno: 0,
            statement: None,
            source: None,
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::new(ErrorKind::WriteFailure, "formatter error")
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::new(ErrorKind::BadSerialization, msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let mut err = Error::new(ErrorKind::LineOverindented, "line 3 is overindented");
        err.set_location("index", 3);
        assert_eq!(
            err.to_string(),
            "line overindented: line 3 is overindented (in index:3)"
        );
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.name(), Some("index"));
    }

    #[test]
    fn test_alternate_shows_statement() {
        let mut err =
            Error::new(ErrorKind::SyntaxError, "unexpected end of pipeline").with_statement("if");
        err.set_location("index", 7);
        assert_eq!(
            format!("{:#}", err),
            "syntax error: unexpected end of pipeline (in index:7)\n   7 > if"
        );
    }

    #[test]
    fn test_location_is_sticky() {
        let mut err = Error::from(ErrorKind::TemplateNotFound);
        err.set_location("inner", 2);
        err.set_location("outer", 9);
        assert_eq!(err.name(), Some("inner"));
        assert_eq!(err.line(), Some(2));
    }
}
