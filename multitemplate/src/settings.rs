use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::defaults::{get_default_doctypes, get_default_filter_handlers};
use crate::error::{Error, ErrorKind};

type TransformFunc = dyn Fn(&str) -> String + Send + Sync + 'static;

/// The interpolation delimiters embedded into literal text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Delimiters {
    pub(crate) left: String,
    pub(crate) right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            left: "{{".into(),
            right: "}}".into(),
        }
    }
}

impl Delimiters {
    /// Creates a new delimiter pair.
    ///
    /// Both delimiters must be non empty and different from each other.
    pub fn new(left: &str, right: &str) -> Result<Delimiters, Error> {
        if left.is_empty() || right.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidDelimiter,
                "delimiters must not be empty",
            ));
        }
        if left == right {
            return Err(Error::new(
                ErrorKind::InvalidDelimiter,
                format!("left and right delimiter are both {:?}", left),
            ));
        }
        Ok(Delimiters {
            left: left.into(),
            right: right.into(),
        })
    }

    /// Returns the opening delimiter.
    pub fn left(&self) -> &str {
        &self.left
    }

    /// Returns the closing delimiter.
    pub fn right(&self) -> &str {
        &self.right
    }
}

/// A `:trigger` filter block handler.
///
/// The indented body below a `:trigger` line is run through `transform`
/// and wrapped into `open` and `close`.
#[derive(Clone)]
pub struct FilterHandler {
    pub(crate) trigger: String,
    pub(crate) open: String,
    pub(crate) close: String,
    pub(crate) transform: Arc<TransformFunc>,
}

impl fmt::Debug for FilterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterHandler")
            .field("trigger", &self.trigger)
            .field("open", &self.open)
            .field("close", &self.close)
            .finish()
    }
}

impl FilterHandler {
    /// Creates a handler that wraps the body without transforming it.
    ///
    /// The trigger is given without the leading colon.
    pub fn new(trigger: &str, open: &str, close: &str) -> FilterHandler {
        FilterHandler {
            trigger: trigger.trim_start_matches(':').into(),
            open: open.into(),
            close: close.into(),
            transform: Arc::new(|body: &str| body.to_string()),
        }
    }

    /// Replaces the body transformation.
    pub fn with_transform<F>(mut self, f: F) -> FilterHandler
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Arc::new(f);
        self
    }

    /// Returns the trigger keyword (without the colon).
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Applies the handler to a filter body.
    pub fn apply(&self, body: &str) -> String {
        let mut rv = self.open.clone();
        rv.push_str(&(self.transform)(body));
        rv.push_str(&self.close);
        rv
    }
}

/// The configuration shared by the front ends.
///
/// An [`Environment`](crate::Environment) owns one of these and hands it
/// to every front end it parses a source with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) strict_indentation: bool,
    pub(crate) strict_interpolation: bool,
    pub(crate) delimiters: Delimiters,
    pub(crate) id_join: String,
    pub(crate) filters: Vec<Arc<FilterHandler>>,
    pub(crate) doctypes: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            strict_indentation: false,
            strict_interpolation: false,
            delimiters: Delimiters::default(),
            id_join: "_".into(),
            filters: get_default_filter_handlers(),
            doctypes: get_default_doctypes(),
        }
    }
}

impl Settings {
    /// When enabled only tabs count as indentation.
    pub fn set_strict_indentation(&mut self, yes: bool) {
        self.strict_indentation = yes;
    }

    /// Returns `true` if only tabs count as indentation.
    pub fn strict_indentation(&self) -> bool {
        self.strict_indentation
    }

    /// When enabled an interpolation that fails to parse is an error.
    ///
    /// By default it is kept as literal text and a warning is logged.
    pub fn set_strict_interpolation(&mut self, yes: bool) {
        self.strict_interpolation = yes;
    }

    /// Returns `true` if broken interpolations fail the compile.
    pub fn strict_interpolation(&self) -> bool {
        self.strict_interpolation
    }

    /// Sets the interpolation delimiters.
    pub fn set_delimiters(&mut self, delimiters: Delimiters) {
        self.delimiters = delimiters;
    }

    /// Returns the interpolation delimiters.
    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Sets the separator shorthand and explicit id parts are joined with.
    pub fn set_id_join<S: Into<String>>(&mut self, sep: S) {
        self.id_join = sep.into();
    }

    /// Returns the id join separator.
    pub fn id_join(&self) -> &str {
        &self.id_join
    }

    /// Registers a filter handler, replacing one with the same trigger.
    pub fn add_filter_handler(&mut self, handler: FilterHandler) {
        self.filters.retain(|x| x.trigger != handler.trigger);
        self.filters.push(Arc::new(handler));
    }

    /// Looks up the filter handler for a trigger keyword.
    pub fn get_filter_handler(&self, trigger: &str) -> Option<&Arc<FilterHandler>> {
        self.filters.iter().find(|x| x.trigger == trigger)
    }

    /// Registers a doctype under a `!!!` keyword.
    pub fn add_doctype<K: Into<String>, V: Into<String>>(&mut self, key: K, doctype: V) {
        self.doctypes.insert(key.into(), doctype.into());
    }

    /// Looks up a doctype by keyword.
    pub fn get_doctype(&self, key: &str) -> Option<&str> {
        self.doctypes.get(key).map(|x| x.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiters_validation() {
        assert!(Delimiters::new("<%", "%>").is_ok());
        assert_eq!(
            Delimiters::new("", "}}").unwrap_err().kind(),
            ErrorKind::InvalidDelimiter
        );
        assert_eq!(
            Delimiters::new("||", "||").unwrap_err().kind(),
            ErrorKind::InvalidDelimiter
        );
    }

    #[test]
    fn test_filter_handler_replacement() {
        let mut settings = Settings::default();
        settings.add_filter_handler(
            FilterHandler::new(":css", "<style type=\"text/css\">", "</style>")
                .with_transform(|body| body.to_uppercase()),
        );
        let handler = settings.get_filter_handler("css").unwrap();
        assert_eq!(
            handler.apply("a {}"),
            "<style type=\"text/css\">A {}</style>"
        );
        assert_eq!(
            settings.filters.iter().filter(|x| x.trigger == "css").count(),
            1
        );
    }
}
