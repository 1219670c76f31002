use std::sync::Arc;

use crate::compiler::ir::{HtmlContext, Node, Unit};
use crate::context::{RenderContext, RenderedBlock};
use crate::environment::Environment;
use crate::error::{Error, ErrorKind};
use crate::output::{Frame, Output};
use crate::pipeline::ast::{Command, Expr, Pipeline};
use crate::utils::write_escaped;
use crate::value::Value;

pub(crate) use self::state::{Scopes, State};

mod state;

/// The maximum nesting of unit executions (`yield`, `exec`, `template`).
const MAX_RECURSION: usize = 64;

/// The maximum length of an `extends` chain.
const MAX_EXTENDS: usize = 32;

/// The names handled by the engine instead of the function registry.
const COMPOSITION_CALLS: &[&str] = &[
    "yield",
    "content_for",
    "block",
    "define_block",
    "end_block",
    "extends",
    "exec",
    "root_dot",
    "fallback",
];

fn empty() -> Value {
    Value::from_safe_string(String::new())
}

fn invalid_arguments(name: &str, expected: &str) -> Error {
    Error::new(
        ErrorKind::InvalidArguments,
        format!("{} expects {}", name, expected),
    )
}

fn string_arg<'a>(name: &str, args: &'a [Value], expected: &str) -> Result<&'a str, Error> {
    match args.first().and_then(|x| x.as_str()) {
        Some(s) => Ok(s),
        None => Err(invalid_arguments(name, expected)),
    }
}

/// Executes compiled units.
///
/// One virtual machine exists per render call.  It walks the IR of the
/// units, evaluates pipelines against the render data and resolves the
/// composition calls against the [`RenderContext`] of the call.
pub struct Vm<'env> {
    env: &'env Environment,
    state: State,
}

impl<'env> Vm<'env> {
    /// Creates a new VM for one render call.
    pub fn new(env: &'env Environment, ctx: RenderContext) -> Vm<'env> {
        Vm {
            env,
            state: State::new(ctx),
        }
    }

    /// Renders the main unit of the context.
    ///
    /// If a layout is set the main unit is rendered first and its output
    /// kept for `yield`, then the layout is rendered as the result.
    pub fn render(mut self) -> Result<String, Error> {
        let main = match self.state.ctx.main.clone() {
            Some(main) => main,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    "render context has no main template",
                ))
            }
        };
        let root = self.state.root().clone();
        log::debug!(
            "rendering {} (layout: {})",
            main,
            self.state.ctx.layout.as_deref().unwrap_or("none")
        );
        let layout = match self.state.ctx.layout.clone() {
            Some(layout) => layout,
            None => return self.render_unit(&main, root),
        };
        let content = ok!(self.render_unit(&main, root.clone()));
        self.state.main_content = Some(content);
        self.state.executing_layout = true;
        self.render_unit(&layout, root)
    }

    /// Renders a unit including the units it extends.
    fn render_unit(&mut self, name: &str, dot: Value) -> Result<String, Error> {
        let outer_parent = self.state.parent.take();
        let rv = self.render_extends_chain(name, dot);
        self.state.parent = outer_parent;
        rv
    }

    fn render_extends_chain(&mut self, name: &str, dot: Value) -> Result<String, Error> {
        let mut rv = ok!(self.execute_unit(name, dot));
        let mut chain = 0;
        while let Some(parent) = self.state.parent.take() {
            chain += 1;
            if chain > MAX_EXTENDS {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("{} extends too many templates", name),
                ));
            }
            log::trace!("rendering {} extended by {}", parent, name);
            let root = self.state.root().clone();
            rv = ok!(self.execute_unit(&parent, root));
        }
        Ok(rv)
    }

    fn execute_unit(&mut self, name: &str, dot: Value) -> Result<String, Error> {
        let unit = match self.env.get_unit(name) {
            Some(unit) => unit,
            None => {
                return Err(Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("template {:?} does not exist", name),
                ))
            }
        };
        if self.state.depth >= MAX_RECURSION {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "recursion limit exceeded",
            ));
        }
        self.state.depth += 1;

        #[cfg(feature = "stacker")]
        let rv = stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.execute_nodes_of(&unit, dot));
        #[cfg(not(feature = "stacker"))]
        let rv = self.execute_nodes_of(&unit, dot);

        self.state.depth -= 1;
        rv.map_err(|mut err| {
            err.set_location(unit.name(), 0);
            err
        })
    }

    fn execute_nodes_of(&mut self, unit: &Arc<Unit>, dot: Value) -> Result<String, Error> {
        let mut scopes = Scopes::new(dot);
        let mut out = Output::new();
        ok!(self.execute_nodes(unit, unit.nodes(), &mut scopes, &mut out));
        if out.open_frames() > 0 {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "block is missing its end_block",
            ));
        }
        Ok(out.into_string())
    }

    fn execute_nodes(
        &mut self,
        unit: &Unit,
        nodes: &[Node],
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<(), Error> {
        for node in nodes {
            ok!(self.execute_node(unit, node, scopes, out));
        }
        Ok(())
    }

    fn execute_scoped(
        &mut self,
        unit: &Unit,
        nodes: &[Node],
        dot: Option<Value>,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<(), Error> {
        match dot {
            Some(dot) => scopes.push(dot),
            None => scopes.push_same(),
        }
        let rv = self.execute_nodes(unit, nodes, scopes, out);
        scopes.pop();
        rv
    }

    fn execute_node(
        &mut self,
        unit: &Unit,
        node: &Node,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<(), Error> {
        let locate = |mut err: Error, lineno: usize| {
            err.set_location(unit.name(), lineno);
            err
        };
        match node {
            Node::Text(text) => ok!(out.write_str(text).map_err(Error::from)),
            Node::Action {
                pipeline,
                context,
                lineno,
            } => {
                let value = ok!(self
                    .eval_pipeline(pipeline, *context, scopes, out)
                    .map_err(|err| locate(err, *lineno)));
                if pipeline.decl.is_empty() {
                    ok!(write_escaped(out, unit.auto_escape(), *context, &value));
                }
            }
            Node::If {
                pipeline,
                negated,
                body,
                else_body,
                lineno,
            } => {
                scopes.push_same();
                let rv = self
                    .eval_pipeline(pipeline, HtmlContext::Body, scopes, out)
                    .map_err(|err| locate(err, *lineno))
                    .and_then(|value| {
                        let branch = if value.is_true() != *negated {
                            body
                        } else {
                            else_body
                        };
                        self.execute_scoped(unit, branch, None, scopes, out)
                    });
                scopes.pop();
                ok!(rv);
            }
            Node::Range {
                pipeline,
                body,
                else_body,
                lineno,
            } => {
                scopes.push_same();
                let rv = self.execute_range(unit, pipeline, body, else_body, scopes, out);
                scopes.pop();
                ok!(rv.map_err(|err| locate(err, *lineno)));
            }
            Node::With {
                pipeline,
                body,
                else_body,
                lineno,
            } => {
                scopes.push_same();
                let rv = self
                    .eval_pipeline(pipeline, HtmlContext::Body, scopes, out)
                    .map_err(|err| locate(err, *lineno))
                    .and_then(|value| {
                        if value.is_true() {
                            self.execute_scoped(unit, body, Some(value), scopes, out)
                        } else {
                            self.execute_scoped(unit, else_body, None, scopes, out)
                        }
                    });
                scopes.pop();
                ok!(rv);
            }
            Node::Template {
                name,
                pipeline,
                lineno,
            } => {
                let data = match pipeline {
                    Some(pipeline) => ok!(self
                        .eval_pipeline(pipeline, HtmlContext::Body, scopes, out)
                        .map_err(|err| locate(err, *lineno))),
                    None => Value::UNDEFINED,
                };
                let rendered = ok!(self
                    .render_unit(name, data)
                    .map_err(|err| locate(err, *lineno)));
                ok!(out.write_str(&rendered).map_err(Error::from));
            }
        }
        Ok(())
    }

    fn execute_range(
        &mut self,
        unit: &Unit,
        pipeline: &Pipeline,
        body: &[Node],
        else_body: &[Node],
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<(), Error> {
        // the declarations bind per iteration, not to the pipeline value
        let value = ok!(self.eval_commands(&pipeline.commands, HtmlContext::Body, scopes, out));
        let mut iterated = false;
        for (key, item) in ok!(value.try_iter_pairs()) {
            iterated = true;
            scopes.push(item.clone());
            match pipeline.decl.as_slice() {
                [elem] => scopes.declare(elem, item),
                [key_var, elem] => {
                    scopes.declare(key_var, key);
                    scopes.declare(elem, item);
                }
                _ => {}
            }
            let rv = self.execute_nodes(unit, body, scopes, out);
            scopes.pop();
            ok!(rv);
        }
        if !iterated {
            return self.execute_scoped(unit, else_body, None, scopes, out);
        }
        Ok(())
    }

    fn eval_pipeline(
        &mut self,
        pipeline: &Pipeline,
        context: HtmlContext,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<Value, Error> {
        let value = ok!(self.eval_commands(&pipeline.commands, context, scopes, out));
        for name in &pipeline.decl {
            if pipeline.is_assign {
                ok!(scopes.assign(name, value.clone()));
            } else {
                scopes.declare(name, value.clone());
            }
        }
        Ok(value)
    }

    fn eval_commands(
        &mut self,
        commands: &[Command],
        context: HtmlContext,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<Value, Error> {
        let mut prev = None;
        for command in commands {
            prev = Some(ok!(self.eval_command(command, prev.take(), context, scopes, out)));
        }
        Ok(prev.unwrap_or_default())
    }

    fn eval_command(
        &mut self,
        command: &Command,
        prev: Option<Value>,
        context: HtmlContext,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<Value, Error> {
        match command.args.as_slice() {
            [Expr::Func(name), rest @ ..] => {
                let mut args = Vec::with_capacity(rest.len() + 1);
                for arg in rest {
                    args.push(ok!(self.eval_arg(arg, context, scopes, out)));
                }
                args.extend(prev);
                self.call(name, &args, context, out)
            }
            [operand] if prev.is_none() => self.eval_arg(operand, context, scopes, out),
            [] => Err(Error::new(ErrorKind::SyntaxError, "empty command")),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                "can't give argument to non-function",
            )),
        }
    }

    fn eval_arg(
        &mut self,
        expr: &Expr,
        context: HtmlContext,
        scopes: &mut Scopes,
        out: &mut Output,
    ) -> Result<Value, Error> {
        match expr {
            Expr::Dot => Ok(scopes.dot().clone()),
            Expr::Field(fields) => walk_fields(scopes.dot().clone(), fields),
            Expr::Var { name, fields } => {
                let value = ok!(scopes.lookup(name)).clone();
                walk_fields(value, fields)
            }
            Expr::Func(name) => self.call(name, &[], context, out),
            Expr::Const(value) => Ok(value.clone()),
            Expr::Sub { pipeline, fields } => {
                let value = ok!(self.eval_commands(&pipeline.commands, context, scopes, out));
                walk_fields(value, fields)
            }
        }
    }

    fn call(
        &mut self,
        name: &str,
        args: &[Value],
        context: HtmlContext,
        out: &mut Output,
    ) -> Result<Value, Error> {
        if COMPOSITION_CALLS.contains(&name) {
            return self.call_composition(name, args, context, out);
        }
        match self.env.get_function(name) {
            Some(func) => func.invoke(args),
            None => Err(Error::new(
                ErrorKind::UnknownFunction,
                format!("function {} is unknown", name),
            )),
        }
    }

    fn call_composition(
        &mut self,
        name: &str,
        args: &[Value],
        context: HtmlContext,
        out: &mut Output,
    ) -> Result<Value, Error> {
        match name {
            "yield" => self.yield_content(args, context),
            "content_for" => match args {
                [slot, unit] => match (slot.as_str(), unit.as_str()) {
                    (Some(slot), Some(unit)) => {
                        log::trace!("slot {} now yields {}", slot, unit);
                        self.state.ctx.yields.insert(slot.into(), unit.into());
                        Ok(empty())
                    }
                    _ => Err(invalid_arguments(name, "a slot and a template name")),
                },
                _ => Err(invalid_arguments(name, "a slot and a template name")),
            },
            "block" => {
                let slot = ok!(string_arg(name, args, "a slot name"));
                ok!(self.open_block(slot, context, out));
                Ok(empty())
            }
            "define_block" => {
                let slot = ok!(string_arg(name, args, "a slot name"));
                out.push(Frame::Capture {
                    slot: slot.to_string(),
                    kind: context.into(),
                    buf: String::new(),
                });
                Ok(empty())
            }
            "end_block" => {
                ok!(self.close_block(out));
                Ok(empty())
            }
            "extends" => {
                let unit = ok!(string_arg(name, args, "a template name"));
                self.state.parent = Some(unit.to_string());
                out.discard_root();
                Ok(empty())
            }
            "exec" => {
                let unit = ok!(string_arg(name, args, "a template name"));
                let data = match args.get(1) {
                    Some(data) => data.clone(),
                    None => self.state.root().clone(),
                };
                let rendered = ok!(self.render_unit(unit, data));
                Ok(Value::from_safe_string(rendered))
            }
            "root_dot" => Ok(self.state.root().clone()),
            "fallback" => {
                let unit = ok!(string_arg(name, args, "a template name"));
                Ok(Value::fallback(unit))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownFunction,
                format!("function {} is unknown", name),
            )),
        }
    }

    fn yield_content(&mut self, args: &[Value], context: HtmlContext) -> Result<Value, Error> {
        let (slot, rest) = match args.first().and_then(|x| x.as_str()) {
            Some(slot) => (Some(slot), &args[1..]),
            None => (None, args),
        };
        let mut fallback = None;
        let mut data = None;
        for arg in rest {
            if let Some(unit) = arg.as_fallback() {
                fallback = Some(unit);
            } else if data.is_none() {
                data = Some(arg.clone());
            } else {
                return Err(invalid_arguments(
                    "yield",
                    "a slot, one data value and a fallback",
                ));
            }
        }

        let slot = match slot {
            Some(slot) => slot,
            None => return self.yield_main(data),
        };
        let dot = data.unwrap_or_else(|| self.state.root().clone());

        if let Some(unit) = self.state.ctx.yields.get(slot).cloned() {
            log::trace!("yield {}: rendering {}", slot, unit);
            let rendered = ok!(self.render_unit(&unit, dot));
            return Ok(Value::from_safe_string(rendered));
        }
        if let Some(block) = self.state.ctx.blocks.get(slot) {
            log::trace!("yield {}: using rendered block", slot);
            return checked_block(slot, block, context);
        }
        if let Some(unit) = fallback {
            log::trace!("yield {}: falling back to {}", slot, unit);
            let rendered = ok!(self.render_unit(unit, dot));
            return Ok(Value::from_safe_string(rendered));
        }
        Ok(empty())
    }

    fn yield_main(&mut self, data: Option<Value>) -> Result<Value, Error> {
        if data.is_none() {
            if let Some(ref content) = self.state.main_content {
                return Ok(Value::from_safe_string(content.clone()));
            }
        }
        let main = match self.state.ctx.main.clone() {
            Some(main) => main,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    "there is no main template to yield",
                ))
            }
        };
        let dot = data.unwrap_or_else(|| self.state.root().clone());
        let rendered = ok!(self.render_unit(&main, dot));
        Ok(Value::from_safe_string(rendered))
    }

    fn open_block(
        &mut self,
        slot: &str,
        context: HtmlContext,
        out: &mut Output,
    ) -> Result<(), Error> {
        if self.state.is_capturing() {
            out.push(Frame::Capture {
                slot: slot.to_string(),
                kind: context.into(),
                buf: String::new(),
            });
            return Ok(());
        }

        if let Some(unit) = self.state.ctx.yields.get(slot).cloned() {
            log::trace!("block {}: rendering {}", slot, unit);
            let root = self.state.root().clone();
            let rendered = ok!(self.render_unit(&unit, root));
            ok!(out.write_str(&rendered).map_err(Error::from));
            out.push(Frame::Discard);
        } else if let Some(block) = self.state.ctx.blocks.get(slot) {
            log::trace!("block {}: using rendered block", slot);
            let value = ok!(checked_block(slot, block, context));
            ok!(out.write_str(value.as_str().unwrap_or_default()).map_err(Error::from));
            out.push(Frame::Discard);
        } else {
            out.push(Frame::Passthrough);
        }
        Ok(())
    }

    fn close_block(&mut self, out: &mut Output) -> Result<(), Error> {
        match out.pop() {
            Some(Frame::Capture { slot, kind, buf }) => {
                if self.state.ctx.is_claimed(&slot) {
                    log::trace!("block {} is already claimed", slot);
                } else {
                    log::trace!("captured block {}", slot);
                    self.state
                        .ctx
                        .blocks
                        .insert(slot, RenderedBlock::new(buf, kind));
                }
                Ok(())
            }
            Some(Frame::Discard) | Some(Frame::Passthrough) => Ok(()),
            None => Err(Error::new(
                ErrorKind::InvalidOperation,
                "end_block without an open block",
            )),
        }
    }
}

/// Returns the content of a rendered block if it may be used in `context`.
fn checked_block(slot: &str, block: &RenderedBlock, context: HtmlContext) -> Result<Value, Error> {
    if block.kind().accepts(context) {
        Ok(Value::from_safe_string(block.content().to_string()))
    } else {
        Err(Error::new(
            ErrorKind::MismatchedBlockContext,
            format!(
                "block {} holds {} content but is used in {} context",
                slot,
                block.kind(),
                context
            ),
        ))
    }
}

fn walk_fields(mut value: Value, fields: &[String]) -> Result<Value, Error> {
    for field in fields {
        value = ok!(value.get_field(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::context::BlockKind;

    fn env_with(sources: &[(&str, &str)]) -> Environment {
        let mut env = Environment::new();
        for (name, source) in sources {
            env.add_template(name, source).unwrap();
        }
        env
    }

    fn render(env: &Environment, ctx: RenderContext) -> Result<String, Error> {
        Vm::new(env, ctx).render()
    }

    #[test]
    fn test_pipelines() {
        let env = env_with(&[(
            "page",
            "{{ $x := .A }}{{ $x }}|{{ .A | printf_missing }}",
        )]);
        let err = render(&env, RenderContext::new("page").with_dot(context! { A => 1 })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunction);
        assert_eq!(err.name(), Some("page"));
        assert_eq!(err.line(), Some(1));

        let env = env_with(&[("page", "{{ $x := .A }}{{ $x }}|{{ .A | len }}")]);
        let rv = render(&env, RenderContext::new("page").with_dot(context! { A => "abc" })).unwrap();
        assert_eq!(rv, "abc|3");
    }

    #[test]
    fn test_range_and_scopes() {
        let env = env_with(&[(
            "page",
            "{{ $n := 0 }}{{ range $i, $e := .Items }}{{ $n = $i }}{{ $i }}={{ $e }};{{ end }}{{ $n }}",
        )]);
        let ctx = RenderContext::new("page").with_dot(context! { Items => vec!["a", "b"] });
        assert_eq!(render(&env, ctx).unwrap(), "0=a;1=b;1");
    }

    #[test]
    fn test_block_gate() {
        let env = env_with(&[("page", "<script>{{ yield \"s\" }}</script>")]);
        let ok = RenderContext::new("page").with_block("s", RenderedBlock::new("1<2", BlockKind::Js));
        assert_eq!(render(&env, ok).unwrap(), "<script>1<2</script>");
        let bad = RenderContext::new("page").with_block("s", RenderedBlock::new("x", BlockKind::Html));
        assert_eq!(
            render(&env, bad).unwrap_err().kind(),
            ErrorKind::MismatchedBlockContext
        );
    }

    #[test]
    fn test_unbalanced_blocks() {
        let env = env_with(&[("a", "{{ end_block }}"), ("b", "{{ block \"x\" }}")]);
        assert_eq!(
            render(&env, RenderContext::new("a")).unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            render(&env, RenderContext::new("b")).unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn test_recursion_limit() {
        let env = env_with(&[("loop", "{{ exec \"loop\" . }}")]);
        let err = render(&env, RenderContext::new("loop")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }
}
