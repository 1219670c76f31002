use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::ir::Unit;
use crate::context::RenderContext;
use crate::defaults;
use crate::error::{Error, ErrorKind};
use crate::functions::BoxedFunction;
use crate::settings::{Delimiters, FilterHandler, Settings};
use crate::template::Template;
use crate::utils::{logical_name, AutoEscape};
use crate::value::Value;
use crate::vm::Vm;

type AutoEscapeFunc = dyn Fn(&str) -> AutoEscape + Sync + Send;

/// A front end that turns a source into units.
///
/// Front ends are registered on the environment under a file extension
/// with [`Environment::add_parser`].  Any function with the signature of
/// [`bham::parse`](crate::bham::parse) is a front end.
pub trait Parser: Send + Sync {
    /// Parses `source` which was registered under the logical `name`.
    fn parse(
        &self,
        name: &str,
        source: &str,
        settings: &Settings,
    ) -> Result<BTreeMap<String, Unit>, Error>;
}

impl<F> Parser for F
where
    F: Fn(&str, &str, &Settings) -> Result<BTreeMap<String, Unit>, Error> + Send + Sync,
{
    fn parse(
        &self,
        name: &str,
        source: &str,
        settings: &Settings,
    ) -> Result<BTreeMap<String, Unit>, Error> {
        (self)(name, source, settings)
    }
}

/// An abstraction that holds the engine configuration.
///
/// This object holds the central configuration state for templates.  It is
/// also the registry of all compiled units and of the front ends sources
/// are parsed with.
///
/// Units are reference counted, so cloning an environment is cheap.  A
/// clone can be extended and then swapped in for the original while other
/// threads keep rendering with the old one.
///
/// There are generally two ways to construct an environment:
///
/// * [`Environment::new`] creates an environment preconfigured with sensible
///   defaults.  It will contain all built-in functions as well as a callback
///   for auto escaping based on the logical template name.
/// * [`Environment::empty`] creates a blank environment that only knows the
///   two built-in front ends.
#[derive(Clone)]
pub struct Environment {
    templates: BTreeMap<String, Arc<Unit>>,
    functions: BTreeMap<Cow<'static, str>, BoxedFunction>,
    parsers: BTreeMap<String, Arc<dyn Parser>>,
    settings: Settings,
    default_auto_escape: Arc<AutoEscapeFunc>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::empty()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}

fn default_parsers() -> BTreeMap<String, Arc<dyn Parser>> {
    let mut rv: BTreeMap<String, Arc<dyn Parser>> = BTreeMap::new();
    rv.insert("bham".into(), Arc::new(crate::bham::parse));
    rv.insert("tmpl".into(), Arc::new(crate::plain::parse));
    rv
}

impl Environment {
    /// Creates a new environment with sensible defaults.
    ///
    /// The environment knows the `bham` and `tmpl` front ends, all built-in
    /// functions and auto escapes units whose logical name ends in `.html`,
    /// `.htm` or `.xml`.
    pub fn new() -> Environment {
        Environment {
            templates: BTreeMap::new(),
            functions: defaults::get_builtin_functions()
                .into_iter()
                .map(|(name, func)| (Cow::Borrowed(name), func))
                .collect(),
            parsers: default_parsers(),
            settings: Settings::default(),
            default_auto_escape: Arc::new(defaults::default_auto_escape_callback),
        }
    }

    /// Creates a completely empty environment.
    ///
    /// This environment has no functions, no templates and no auto
    /// escaping configured.
    pub fn empty() -> Environment {
        Environment {
            templates: BTreeMap::new(),
            functions: BTreeMap::new(),
            parsers: default_parsers(),
            settings: Settings::default(),
            default_auto_escape: Arc::new(defaults::no_auto_escape),
        }
    }

    /// Returns the front end settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the front end settings.
    ///
    /// Settings only affect templates that are added afterwards.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// When enabled only tabs count as indentation in `bham` sources.
    pub fn set_strict_indentation(&mut self, yes: bool) {
        self.settings.set_strict_indentation(yes);
    }

    /// When enabled an interpolation that fails to parse fails the compile.
    pub fn set_strict_interpolation(&mut self, yes: bool) {
        self.settings.set_strict_interpolation(yes);
    }

    /// Sets the interpolation delimiters.
    pub fn set_delimiters(&mut self, delimiters: Delimiters) {
        self.settings.set_delimiters(delimiters);
    }

    /// Sets the separator id parts are joined with.
    pub fn set_id_join<S: Into<String>>(&mut self, sep: S) {
        self.settings.set_id_join(sep);
    }

    /// Registers a `:trigger` filter handler.
    pub fn add_filter_handler(&mut self, handler: FilterHandler) {
        self.settings.add_filter_handler(handler);
    }

    /// Registers a doctype under a `!!!` keyword.
    pub fn add_doctype<K: Into<String>, V: Into<String>>(&mut self, key: K, doctype: V) {
        self.settings.add_doctype(key, doctype);
    }

    /// Sets a new function to select the default auto escaping.
    ///
    /// This function is invoked when units are registered to determine the
    /// auto escaping behavior.  It is invoked with the logical name of the
    /// unit (front end extensions already removed).  The default
    /// implementation
    /// ([`default_auto_escape_callback`](crate::default_auto_escape_callback))
    /// turns on escaping depending on the file extension.
    ///
    /// ```
    /// # use multitemplate::{Environment, AutoEscape};
    /// # let mut env = Environment::new();
    /// env.set_auto_escape_callback(|name| {
    ///     if matches!(name.rsplit('.').next().unwrap_or(""), "html" | "htm" | "aspx") {
    ///         AutoEscape::Html
    ///     } else {
    ///         AutoEscape::None
    ///     }
    /// });
    /// ```
    pub fn set_auto_escape_callback<F>(&mut self, f: F)
    where
        F: Fn(&str) -> AutoEscape + 'static + Sync + Send,
    {
        self.default_auto_escape = Arc::new(f);
    }

    /// Registers a front end for a file extension.
    ///
    /// The extension is given without the leading dot.  Registering an
    /// extension again replaces the previous front end.
    pub fn add_parser<P: Parser + 'static>(&mut self, extension: &str, parser: P) {
        self.parsers
            .insert(extension.trim_start_matches('.').to_string(), Arc::new(parser));
    }

    /// Adds a new function.
    ///
    /// For details about functions have a look at [`functions`](crate::functions).
    pub fn add_function<N, F>(&mut self, name: N, f: F)
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), BoxedFunction::new(f));
    }

    /// Removes a function by name.
    pub fn remove_function(&mut self, name: &str) {
        self.functions.remove(name);
    }

    /// Compiles a source and registers its units.
    ///
    /// The front end is picked by the extensions of `name`: every extension
    /// a front end is registered for is removed to form the logical name,
    /// the last of them selects the front end.  Names without such an
    /// extension are parsed with the delimiter front end.
    ///
    /// ```
    /// # use multitemplate::Environment;
    /// let mut env = Environment::new();
    /// env.add_template("index.html.bham", "%p Hello").unwrap();
    /// assert!(env.get_template("index.html").is_ok());
    /// ```
    ///
    /// If the source fails to compile, no unit of it is registered.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), Error> {
        let (logical, extension) = logical_name(name, |ext| self.parsers.contains_key(ext));
        let units = ok!(match extension.and_then(|ext| self.parsers.get(ext)) {
            Some(parser) => parser.parse(&logical, source, &self.settings),
            None => crate::plain::parse(&logical, source, &self.settings),
        });
        self.register(units);
        Ok(())
    }

    /// Compiles a source with the front end registered for `extension`.
    ///
    /// Unlike [`add_template`](Self::add_template) the front end is given
    /// explicitly, so the name may carry any extension.
    pub fn add_template_with(
        &mut self,
        name: &str,
        source: &str,
        extension: &str,
    ) -> Result<(), Error> {
        let parser = match self.parsers.get(extension.trim_start_matches('.')) {
            Some(parser) => parser.clone(),
            None => {
                return Err(Error::new(
                    ErrorKind::UnknownParser,
                    format!("no front end registered for {:?}", extension),
                ))
            }
        };
        let (logical, _) = logical_name(name, |ext| self.parsers.contains_key(ext));
        let units = ok!(parser.parse(&logical, source, &self.settings));
        self.register(units);
        Ok(())
    }

    /// Registers an already compiled unit.
    pub fn add_unit(&mut self, unit: Unit) {
        let name = unit.name().to_string();
        let mut units = BTreeMap::new();
        units.insert(name, unit);
        self.register(units);
    }

    /// Compiles a file and registers its units.
    ///
    /// The name of the template is the path of the file relative to `base`
    /// with `/` as separator.
    pub fn add_file<B: AsRef<Path>, P: AsRef<Path>>(&mut self, base: B, path: P) -> Result<(), Error> {
        let (base, path) = (base.as_ref(), path.as_ref());
        let name = match path.strip_prefix(base) {
            Ok(relative) => relative,
            Err(_) => path,
        }
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
        let source = ok!(fs::read_to_string(path).map_err(|err| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("could not read template {}", path.display()),
            )
            .with_source(err)
        }));
        self.add_template(&name, &source)
    }

    /// Compiles and registers every file below a directory.
    ///
    /// Files are named relative to `base`, see [`add_file`](Self::add_file).
    /// Registration stops at the first file that fails.
    pub fn add_dir<B: AsRef<Path>>(&mut self, base: B) -> Result<(), Error> {
        let base = base.as_ref();
        let mut files = Vec::new();
        ok!(collect_files(base, &mut files));
        files.sort();
        for file in files {
            ok!(self.add_file(base, &file));
        }
        Ok(())
    }

    /// Removes a template by name.
    pub fn remove_template(&mut self, name: &str) {
        self.templates.remove(name);
    }

    /// Returns the logical names of all registered templates.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|x| x.as_str())
    }

    /// Fetches a template by name.
    ///
    /// This requires that the template has been registered beforehand.  If
    /// it was not, an error of kind `TemplateNotFound` is returned.
    ///
    /// ```
    /// # use multitemplate::{Environment, context};
    /// let mut env = Environment::new();
    /// env.add_template("hello.tmpl", "Hello {{ .Name }}!").unwrap();
    /// let tmpl = env.get_template("hello").unwrap();
    /// println!("{}", tmpl.render(context!{ Name => "World" }).unwrap());
    /// ```
    pub fn get_template(&self, name: &str) -> Result<Template<'_>, Error> {
        match self.templates.get(name) {
            Some(unit) => Ok(Template::new(self, unit.clone())),
            None => Err(Error::new(
                ErrorKind::TemplateNotFound,
                format!("template {:?} does not exist", name),
            )),
        }
    }

    /// Renders with a full render context.
    ///
    /// This is how layouts, slot mappings and pre-rendered blocks are
    /// passed to a render call.
    pub fn render_context(&self, ctx: RenderContext) -> Result<String, Error> {
        Vm::new(self, ctx).render()
    }

    /// Renders the template `name` with the given data.
    pub fn render_named<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, Error> {
        self.render_context(RenderContext::new(name).with_dot(ctx))
    }

    pub(crate) fn get_unit(&self, name: &str) -> Option<Arc<Unit>> {
        self.templates.get(name).cloned()
    }

    pub(crate) fn get_function(&self, name: &str) -> Option<&BoxedFunction> {
        self.functions.get(name)
    }

    fn register(&mut self, units: BTreeMap<String, Unit>) {
        for (name, mut unit) in units {
            unit.auto_escape = (self.default_auto_escape)(&name);
            log::debug!(
                "registered template {} ({} nodes, auto escape: {:?})",
                name,
                unit.nodes().len(),
                unit.auto_escape
            );
            self.templates.insert(name, Arc::new(unit));
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<std::path::PathBuf>) -> Result<(), Error> {
    let read_error = |err: std::io::Error| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read directory {}", dir.display()),
        )
        .with_source(err)
    };
    for entry in ok!(fs::read_dir(dir).map_err(read_error)) {
        let path = ok!(entry.map_err(read_error)).path();
        if path.is_dir() {
            ok!(collect_files(&path, files));
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_front_end_selection() {
        let mut env = Environment::new();
        env.add_template("page.html.bham", "%p hi").unwrap();
        env.add_template("raw.tmpl", "{{ 1 }}").unwrap();
        env.add_template("notes.txt", "{{ 2 }}").unwrap();
        assert_eq!(
            env.templates().collect::<Vec<_>>(),
            vec!["notes.txt", "page.html", "raw"]
        );
        assert_eq!(env.get_unit("page.html").unwrap().auto_escape(), AutoEscape::Html);
        assert_eq!(env.get_unit("raw").unwrap().auto_escape(), AutoEscape::None);
    }

    #[test]
    fn test_failed_registration_leaves_nothing() {
        let mut env = Environment::new();
        let err = env
            .add_template("page.tmpl", "{{ define \"a\" }}a{{ end }}{{ if .X }}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(env.templates().count(), 0);
    }

    #[test]
    fn test_unknown_parser() {
        let mut env = Environment::new();
        let err = env.add_template_with("x", "", "haml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownParser);
    }

    #[test]
    fn test_custom_parser() {
        fn shout(name: &str, source: &str, _: &Settings) -> Result<BTreeMap<String, Unit>, Error> {
            let mut rv = BTreeMap::new();
            rv.insert(
                name.to_string(),
                Unit::new(name, vec![crate::compiler::ir::Node::Text(source.to_uppercase())]),
            );
            Ok(rv)
        }
        let mut env = Environment::new();
        env.add_parser("shout", shout);
        env.add_template("greeting.shout", "hello").unwrap();
        assert_eq!(env.render_named("greeting", ()).unwrap(), "HELLO");
    }
}
