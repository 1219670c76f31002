use crate::context::RenderContext;
use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// The state of one render call.
///
/// Composition calls read and update the render context stored here:
/// `content_for` maps slots, captured blocks are recorded and the main
/// content is cached while a layout renders.
pub(crate) struct State {
    pub(crate) ctx: RenderContext,
    pub(crate) main_content: Option<String>,
    pub(crate) executing_layout: bool,
    pub(crate) parent: Option<String>,
    pub(crate) depth: usize,
}

impl State {
    pub(crate) fn new(ctx: RenderContext) -> State {
        State {
            ctx,
            main_content: None,
            executing_layout: false,
            parent: None,
            depth: 0,
        }
    }

    /// The data the render call was started with.
    pub(crate) fn root(&self) -> &Value {
        &self.ctx.dot
    }

    /// Returns `true` if blocks are captured instead of written.
    ///
    /// That is the case in a unit that extends another one and in the main
    /// unit while a layout is still to be rendered.
    pub(crate) fn is_capturing(&self) -> bool {
        self.parent.is_some() || (self.ctx.layout.is_some() && !self.executing_layout)
    }
}

struct Scope {
    dot: Value,
    vars: Vec<(String, Value)>,
}

/// The variable scopes of an executing unit.
///
/// Every `if`, `with` and `range` body (and every `range` iteration) gets
/// its own scope.  Variables declared with `:=` live until their scope
/// ends, `=` assigns to the innermost visible declaration.
pub(crate) struct Scopes {
    stack: Vec<Scope>,
}

impl Scopes {
    /// Creates the scopes of a unit.  `$` refers to the initial data.
    pub(crate) fn new(dot: Value) -> Scopes {
        Scopes {
            stack: vec![Scope {
                vars: vec![(String::new(), dot.clone())],
                dot,
            }],
        }
    }

    /// Returns the current data.
    pub(crate) fn dot(&self) -> &Value {
        static UNDEFINED: Value = Value::UNDEFINED;
        match self.stack.last() {
            Some(scope) => &scope.dot,
            None => &UNDEFINED,
        }
    }

    /// Opens a scope with new data.
    pub(crate) fn push(&mut self, dot: Value) {
        self.stack.push(Scope {
            dot,
            vars: Vec::new(),
        });
    }

    /// Opens a scope that keeps the current data.
    pub(crate) fn push_same(&mut self) {
        let dot = self.dot().clone();
        self.push(dot);
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    pub(crate) fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.stack.last_mut() {
            scope.vars.push((name.to_string(), value));
        }
    }

    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), Error> {
        for scope in self.stack.iter_mut().rev() {
            if let Some(slot) = scope.vars.iter_mut().rev().find(|(n, _)| n == name) {
                slot.1 = value;
                return Ok(());
            }
        }
        Err(undefined_variable(name))
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<&Value, Error> {
        self.stack
            .iter()
            .rev()
            .flat_map(|scope| scope.vars.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
            .ok_or_else(|| undefined_variable(name))
    }
}

fn undefined_variable(name: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("undefined variable ${}", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes() {
        let mut scopes = Scopes::new(Value::from(1));
        assert_eq!(scopes.lookup("").unwrap(), &Value::from(1));
        scopes.declare("x", Value::from("outer"));
        scopes.push(Value::from(2));
        assert_eq!(scopes.dot(), &Value::from(2));
        scopes.declare("y", Value::from(true));
        scopes.assign("x", Value::from("changed")).unwrap();
        scopes.pop();
        assert_eq!(scopes.dot(), &Value::from(1));
        assert_eq!(scopes.lookup("x").unwrap(), &Value::from("changed"));
        assert!(scopes.lookup("y").is_err());
        assert!(scopes.assign("y", Value::UNDEFINED).is_err());
    }

    #[test]
    fn test_capturing() {
        let mut state = State::new(RenderContext::new("index"));
        assert!(!state.is_capturing());
        state.parent = Some("base".into());
        assert!(state.is_capturing());
        let mut state = State::new(RenderContext::new("index").with_layout("layout"));
        assert!(state.is_capturing());
        state.executing_layout = true;
        assert!(!state.is_capturing());
    }
}
