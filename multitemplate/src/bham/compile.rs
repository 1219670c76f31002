use crate::bham::analysis::{Node, NodeKind};
use crate::bham::tag::{parse_tag, TagDescription};
use crate::compiler::builder::IrBuilder;
use crate::compiler::ir;
use crate::error::Error;

/// Returns the statement of trailing content that starts with `=`.
fn inline_statement(trailing: &str) -> Option<&str> {
    trailing.trim_start().strip_prefix('=').map(str::trim)
}

/// Compiles analyzed nodes into IR nodes.
pub fn compile(
    nodes: &[Node],
    builder: &mut IrBuilder<'_>,
    out: &mut Vec<ir::Node>,
) -> Result<(), Error> {
    for node in nodes {
        ok!(compile_node(node, builder, out).map_err(|mut err| {
            err.set_lineno(node.lineno);
            err
        }));
    }
    Ok(())
}

fn compile_body(nodes: &[Node], builder: &mut IrBuilder<'_>) -> Result<Vec<ir::Node>, Error> {
    let mut rv = Vec::new();
    ok!(compile(nodes, builder, &mut rv));
    Ok(rv)
}

/// Emits the opening tag.  Only attribute values can carry interpolations.
fn opening_tag(
    tag: &TagDescription,
    pad: bool,
    builder: &mut IrBuilder<'_>,
    out: &mut Vec<ir::Node>,
    lineno: usize,
) -> Result<(), Error> {
    let opening = tag.opening(&builder.settings().id_join);
    if tag.is_executable() {
        return builder.text_nodes(out, &opening, pad, lineno);
    }
    builder.text(out, &opening);
    if pad {
        builder.text(out, " ");
    }
    Ok(())
}

fn compile_node(node: &Node, builder: &mut IrBuilder<'_>, out: &mut Vec<ir::Node>) -> Result<(), Error> {
    let settings = builder.settings();
    let lineno = node.lineno;
    match node.kind {
        NodeKind::Raw(ref text) => builder.text(out, text),
        NodeKind::Text(ref text) => ok!(builder.text_nodes(out, text, true, lineno)),
        NodeKind::Executable(ref statement) => ok!(builder.action(out, statement, lineno)),
        NodeKind::TagLeaf(ref content) => {
            let (tag, trailing) = ok!(parse_tag(content, &settings.delimiters));
            if trailing.is_empty() {
                ok!(opening_tag(&tag, false, builder, out, lineno));
                builder.text(out, &tag.closing());
            } else {
                ok!(opening_tag(&tag, true, builder, out, lineno));
                match inline_statement(trailing) {
                    Some(statement) => ok!(builder.action(out, statement, lineno)),
                    None => ok!(builder.text_nodes(out, trailing, true, lineno)),
                }
                ok!(builder.text_nodes(out, &tag.closing(), true, lineno));
            }
        }
        NodeKind::TagOpen(ref content) => {
            let (tag, trailing) = ok!(parse_tag(content, &settings.delimiters));
            ok!(opening_tag(&tag, false, builder, out, lineno));
            if !trailing.is_empty() {
                match inline_statement(trailing) {
                    Some(statement) => ok!(builder.action(out, statement, lineno)),
                    None => ok!(builder.text_nodes(out, trailing, true, lineno)),
                }
            }
        }
        NodeKind::TagClose(ref content) => {
            let (tag, _) = ok!(parse_tag(content, &settings.delimiters));
            builder.text(out, &tag.closing());
        }
        NodeKind::Conditional {
            ref statement,
            negated,
            ref body,
            ref else_body,
        } => {
            let pipeline = ok!(builder.pipeline(statement, lineno));
            let body = ok!(compile_body(body, builder));
            let else_body = ok!(compile_body(else_body, builder));
            out.push(ir::Node::If {
                pipeline,
                negated,
                body,
                else_body,
                lineno,
            });
        }
        NodeKind::Loop {
            ref statement,
            ref body,
            ref else_body,
        } => {
            let pipeline = ok!(builder.pipeline(statement, lineno));
            let body = ok!(compile_body(body, builder));
            let else_body = ok!(compile_body(else_body, builder));
            out.push(ir::Node::Range {
                pipeline,
                body,
                else_body,
                lineno,
            });
        }
        NodeKind::ScopeBind {
            ref statement,
            ref body,
        } => {
            let pipeline = ok!(builder.pipeline(statement, lineno));
            let body = ok!(compile_body(body, builder));
            out.push(ir::Node::With {
                pipeline,
                body,
                else_body: Vec::new(),
                lineno,
            });
        }
        NodeKind::Filter {
            ref body,
            ref handler,
        } => ok!(builder.text_nodes(out, &handler.apply(body), false, lineno)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::bham::analysis::analyze;
    use crate::bham::lines::classify_lines;
    use crate::settings::Settings;

    fn compile_source(source: &str) -> Vec<ir::Node> {
        let settings = Settings::default();
        let lines = classify_lines(source, false).unwrap();
        let nodes = analyze(&lines, &settings).unwrap();
        let mut builder = IrBuilder::new(&settings).unwrap();
        compile_body(&nodes, &mut builder).unwrap()
    }

    #[test]
    fn test_text_is_merged() {
        assert_eq!(
            compile_source("%html\n\t%head\n\t\t%title wat"),
            vec![ir::Node::Text(
                "<html><head><title>  wat </title> </head></html>".into()
            )]
        );
    }

    #[test]
    fn test_inline_statement() {
        let nodes = compile_source("%p= .Name");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], ir::Node::Text("<p> ".into()));
        assert!(matches!(nodes[1], ir::Node::Action { .. }));
        assert_eq!(nodes[2], ir::Node::Text("</p> ".into()));
    }

    #[test]
    fn test_interpolated_attributes() {
        let nodes = compile_source("%a.nav(href=\"{{ .Url }}\") go");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], ir::Node::Text("<a href=\"".into()));
        assert!(matches!(nodes[1], ir::Node::Action { .. }));
        assert_eq!(
            nodes[2],
            ir::Node::Text("\" class=\"nav\">  go </a> ".into())
        );

        assert_eq!(
            compile_source("%a.nav(href=\"/\") go"),
            vec![ir::Node::Text("<a href=\"/\" class=\"nav\">  go </a> ".into())]
        );
    }

    #[test]
    fn test_else_branches_are_compiled() {
        let nodes = compile_source("= unless .A\n  a\n= else\n  b");
        match &nodes[0] {
            ir::Node::If {
                negated,
                body,
                else_body,
                ..
            } => {
                assert!(*negated);
                assert_eq!(body, &vec![ir::Node::Text("a ".into())]);
                assert_eq!(else_body, &vec![ir::Node::Text("b ".into())]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors_carry_statement() {
        let settings = Settings::default();
        let lines = classify_lines("%p\n= if (", false).unwrap();
        let nodes = analyze(&lines, &settings).unwrap();
        let mut builder = IrBuilder::new(&settings).unwrap();
        let err = compile_body(&nodes, &mut builder).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.statement(), Some("("));
    }
}
