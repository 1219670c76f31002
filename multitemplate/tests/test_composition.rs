use similar_asserts::assert_eq;

use multitemplate::{context, BlockKind, Environment, ErrorKind, RenderContext, RenderedBlock};

fn env_with(sources: &[(&str, &str)]) -> Environment {
    let mut env = Environment::new();
    for (name, source) in sources {
        env.add_template(name, source).unwrap();
    }
    env
}

fn layout_env() -> Environment {
    env_with(&[
        (
            "layout",
            "<html><title>{{ yield \"title\" (fallback \"default_title\") }}</title><body>{{ yield }}</body></html>",
        ),
        ("default_title", "Default"),
        ("custom_title", "Custom {{ .Name }}"),
        ("index", "Hello {{ .Name }}"),
    ])
}

#[test]
fn test_layout_yields_main() {
    let env = layout_env();
    let ctx = RenderContext::new("index")
        .with_layout("layout")
        .with_dot(context!(Name => "Ann"));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<html><title>Default</title><body>Hello Ann</body></html>"
    );
}

#[test]
fn test_layout_yields_mapped_template() {
    let env = layout_env();
    let ctx = RenderContext::new("index")
        .with_layout("layout")
        .with_yield("title", "custom_title")
        .with_dot(context!(Name => "Ann"));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<html><title>Custom Ann</title><body>Hello Ann</body></html>"
    );
}

#[test]
fn test_render_in_layout() {
    let env = layout_env();
    let tmpl = env.get_template("index").unwrap();
    assert_eq!(
        tmpl.render_in_layout("layout", context!(Name => "Bob")).unwrap(),
        "<html><title>Default</title><body>Hello Bob</body></html>"
    );
    assert_eq!(tmpl.render(context!(Name => "Bob")).unwrap(), "Hello Bob");
}

#[test]
fn test_main_captures_blocks_for_layout() {
    let mut env = layout_env();
    env.add_template(
        "index",
        "{{ block \"title\" }}Main Title{{ end_block }}Body of {{ .Name }}",
    )
    .unwrap();
    let ctx = RenderContext::new("index")
        .with_layout("layout")
        .with_dot(context!(Name => "Ann"));
    assert_eq!(
        env.render_context(ctx.clone()).unwrap(),
        "<html><title>Main Title</title><body>Body of Ann</body></html>"
    );

    // a block supplied by the application claims the slot first
    let ctx = ctx.with_block("title", RenderedBlock::new("Supplied", BlockKind::User));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<html><title>Supplied</title><body>Body of Ann</body></html>"
    );
}

#[test]
fn test_block_without_capture() {
    let env = env_with(&[
        ("page", "<h1>{{ block \"title\" }}Default{{ end_block }}</h1>"),
        ("other_title", "Other {{ .Name }}"),
    ]);
    assert_eq!(env.render_named("page", ()).unwrap(), "<h1>Default</h1>");

    let ctx = RenderContext::new("page")
        .with_yield("title", "other_title")
        .with_dot(context!(Name => "Ann"));
    assert_eq!(env.render_context(ctx).unwrap(), "<h1>Other Ann</h1>");

    let ctx = RenderContext::new("page")
        .with_block("title", RenderedBlock::new("<em>Given</em>", BlockKind::Html));
    assert_eq!(env.render_context(ctx).unwrap(), "<h1><em>Given</em></h1>");
}

#[test]
fn test_yielding_blocks() {
    let env = env_with(&[("main", "{{ yield \"test_block\" }}")]);
    let ctx = RenderContext::new("main").with_block(
        "test_block",
        RenderedBlock::new("test block content", BlockKind::User),
    );
    assert_eq!(env.render_context(ctx).unwrap(), "test block content");
    assert_eq!(env.render_named("main", ()).unwrap(), "");
}

#[test]
fn test_yielding_inherits() {
    let env = env_with(&[
        ("main", "{{ yield \"test_block\" }}"),
        (
            "child",
            "{{ extends \"main\" }}{{ block \"test_block\" }}test block content{{ end_block }}",
        ),
    ]);
    assert_eq!(env.render_named("child", ()).unwrap(), "test block content");
}

#[test]
fn test_extends_with_defines() {
    let code = r#"{{ define "view.html" }}
{{ extends "base.html" }}

{{ block "header" }}<styles>{{ end_block }}
{{ end }}
{{ define "base.html" }}<before>
{{ block "header"}}<links>{{ end_block }}
<after>{{ end }}

"#;
    let env = env_with(&[("templates", code)]);
    assert_eq!(
        env.render_named("view.html", ()).unwrap(),
        "<before>\n<styles>\n<after>"
    );
    assert_eq!(
        env.render_named("base.html", ()).unwrap(),
        "<before>\n<links>\n<after>"
    );
}

#[test]
fn test_extends_chain() {
    let env = env_with(&[
        (
            "base",
            "[{{ block \"a\" }}A{{ end_block }}|{{ block \"b\" }}B{{ end_block }}|{{ block \"c\" }}C{{ end_block }}]",
        ),
        (
            "mid",
            "{{ extends \"base\" }}{{ block \"a\" }}mid a{{ end_block }}{{ block \"b\" }}mid b{{ end_block }}",
        ),
        (
            "child",
            "{{ extends \"mid\" }}{{ block \"a\" }}child a for {{ .Name }}{{ end_block }}",
        ),
    ]);
    assert_eq!(
        env.render_named("child", context!(Name => "Ann")).unwrap(),
        "[child a for Ann|mid b|C]"
    );
}

#[test]
fn test_bham_layout() {
    let mut env = Environment::new();
    env.add_template(
        "layouts/main.html.bham",
        "%html\n  %head\n    %title= yield \"title\" (fallback \"titles/default.html\")\n  %body= yield",
    )
    .unwrap();
    env.add_template("titles/default.html.bham", "Site").unwrap();
    env.add_template("pages/index.html.tmpl", "<p>{{ .Text }}</p>")
        .unwrap();
    let ctx = RenderContext::new("pages/index.html")
        .with_layout("layouts/main.html")
        .with_dot(context!(Text => "a < b"));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<html><head><title> Site </title> </head><body> <p>a &lt; b</p></body> </html>"
    );
}

#[test]
fn test_content_for() {
    let env = env_with(&[
        ("layout", "<aside>{{ yield \"sidebar\" }}</aside>{{ yield }}"),
        ("side", "links for {{ .Name }}"),
        ("index", "{{ content_for \"sidebar\" \"side\" }}content"),
    ]);
    let ctx = RenderContext::new("index")
        .with_layout("layout")
        .with_dot(context!(Name => "Ann"));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<aside>links for Ann</aside>content"
    );
}

#[test]
fn test_define_block() {
    let env = env_with(&[(
        "page",
        "{{ define_block \"x\" }}captured{{ end_block }}visible {{ yield \"x\" }}",
    )]);
    assert_eq!(env.render_named("page", ()).unwrap(), "visible captured");
}

#[test]
fn test_yield_with_data() {
    let env = env_with(&[
        ("list", "{{ range .Items }}{{ yield \"row\" . }}{{ end }}"),
        ("row", "<{{ .Name }}>"),
    ]);
    let ctx = RenderContext::new("list")
        .with_yield("row", "row")
        .with_dot(context!(Items => vec![context!(Name => "a"), context!(Name => "b")]));
    assert_eq!(env.render_context(ctx).unwrap(), "<a><b>");
}

#[test]
fn test_exec_and_root_dot() {
    let env = env_with(&[
        (
            "page",
            "{{ exec \"partial\" .User }}|{{ exec \"partial\" }}|{{ with .User }}{{ with root_dot }}{{ .Title }}{{ end }}{{ end }}",
        ),
        ("partial", "{{ .Name }}{{ .Title }}"),
    ]);
    assert_eq!(
        env.render_named("page", context!(Title => "T", User => context!(Name => "Ann")))
            .unwrap(),
        "Ann|T|T"
    );
}

#[test]
fn test_composition_output_is_safe() {
    let env = env_with(&[
        ("layout.html", "<div>{{ yield }}</div>"),
        ("index.html", "<b>{{ .V }}</b>"),
    ]);
    let ctx = RenderContext::new("index.html")
        .with_layout("layout.html")
        .with_dot(context!(V => "<i>"));
    assert_eq!(
        env.render_context(ctx).unwrap(),
        "<div><b>&lt;i&gt;</b></div>"
    );
}

#[test]
fn test_composition_errors() {
    let env = env_with(&[
        ("missing_layout", "x"),
        ("bad_yield", "{{ yield \"a\" 1 2 }}"),
        ("bad_block", "{{ block }}{{ end_block }}"),
        ("bad_extends", "{{ extends \"nowhere\" }}"),
        ("open", "{{ block \"a\" }}"),
        ("loop", "{{ exec \"loop\" }}"),
    ]);

    let ctx = RenderContext::new("missing_layout").with_layout("nope");
    assert_eq!(
        env.render_context(ctx).unwrap_err().kind(),
        ErrorKind::TemplateNotFound
    );
    insta::assert_snapshot!(
        env.render_named("bad_yield", ()).unwrap_err(),
        @"invalid arguments: yield expects a slot, one data value and a fallback (in bad_yield:1)"
    );
    insta::assert_snapshot!(
        env.render_named("bad_block", ()).unwrap_err(),
        @"invalid arguments: block expects a slot name (in bad_block:1)"
    );
    assert_eq!(
        env.render_named("bad_extends", ()).unwrap_err().kind(),
        ErrorKind::TemplateNotFound
    );
    insta::assert_snapshot!(
        env.render_named("open", ()).unwrap_err(),
        @"invalid operation: block is missing its end_block (in open:0)"
    );
    insta::assert_snapshot!(
        env.render_named("loop", ()).unwrap_err(),
        @"invalid operation: recursion limit exceeded (in loop:1)"
    );
    let ctx = RenderContext::default();
    assert_eq!(
        env.render_context(ctx).unwrap_err().kind(),
        ErrorKind::InvalidOperation
    );
}
