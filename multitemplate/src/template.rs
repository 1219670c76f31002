use std::sync::Arc;
use std::{fmt, io};

use serde::Serialize;

use crate::compiler::ir::Unit;
use crate::context::RenderContext;
use crate::environment::Environment;
use crate::error::{Error, ErrorKind};
use crate::utils::AutoEscape;

/// Represents a handle to a template.
///
/// Templates are stored in the [`Environment`] as compiled units.  With the
/// [`Environment::get_template`] method one is looked up and returned in
/// form of this handle.  Such a template can be cheaply cloned as it only
/// holds a reference to the environment and a reference counted unit.
///
/// To render the [`render`](Template::render) method can be used.
#[derive(Clone)]
pub struct Template<'env> {
    env: &'env Environment,
    unit: Arc<Unit>,
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ds = f.debug_struct("Template");
        ds.field("name", &self.name());
        #[cfg(feature = "unstable_machinery")]
        {
            ds.field("nodes", &self.unit.nodes());
        }
        ds.field("auto_escape", &self.unit.auto_escape());
        ds.finish()
    }
}

impl<'env> Template<'env> {
    pub(crate) fn new(env: &'env Environment, unit: Arc<Unit>) -> Template<'env> {
        Template { env, unit }
    }

    /// Returns the logical name of the template.
    pub fn name(&self) -> &str {
        self.unit.name()
    }

    /// Returns the auto escaping the template renders with.
    pub fn auto_escape(&self) -> AutoEscape {
        self.unit.auto_escape()
    }

    /// Returns the compiled unit.
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Renders the template into a string.
    ///
    /// The provided value is used as the data (`.`) of the template.  It can
    /// be any object that implements [`Serialize`](serde::Serialize).  You
    /// can either create your own struct and derive `Serialize` for it or
    /// the [`context!`](crate::context) macro can be used to create an
    /// ad-hoc context.
    ///
    /// ```
    /// # use multitemplate::{Environment, context};
    /// # let mut env = Environment::new();
    /// # env.add_template("hello.bham", "%p Hello {{ .Name }}!").unwrap();
    /// let tmpl = env.get_template("hello").unwrap();
    /// println!("{}", tmpl.render(context!(Name => "John")).unwrap());
    /// ```
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, Error> {
        self.render_context(RenderContext::new(self.name()).with_dot(ctx))
    }

    /// Renders the template wrapped into a layout.
    ///
    /// The layout gets the output of this template from `yield`.
    pub fn render_in_layout<S: Serialize>(&self, layout: &str, ctx: S) -> Result<String, Error> {
        self.render_context(
            RenderContext::new(self.name())
                .with_layout(layout)
                .with_dot(ctx),
        )
    }

    /// Renders the template with a full render context.
    ///
    /// The main template of the context is replaced with this template.
    pub fn render_context(&self, mut ctx: RenderContext) -> Result<String, Error> {
        ctx.main = Some(self.name().to_string());
        self.env.render_context(ctx)
    }

    /// Renders the template into a [`io::Write`].
    ///
    /// The output is only written once the render succeeded, a failing
    /// render writes nothing.
    pub fn render_to_write<S: Serialize, W: io::Write>(&self, ctx: S, mut w: W) -> Result<(), Error> {
        let rv = ok!(self.render(ctx));
        w.write_all(rv.as_bytes()).map_err(|err| {
            Error::new(ErrorKind::WriteFailure, "I/O error during rendering").with_source(err)
        })
    }
}
