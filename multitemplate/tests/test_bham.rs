use serde::Serialize;
use similar_asserts::assert_eq;

use multitemplate::{context, Environment, ErrorKind, FilterHandler};

fn render<S: Serialize>(source: &str, ctx: S) -> String {
    let mut env = Environment::new();
    env.add_template("test.bham", source).unwrap();
    env.render_named("test", ctx).unwrap()
}

#[test]
fn test_nesting() {
    assert_eq!(
        render("%html\n\t%head\n\t\t%title wat", ()),
        "<html><head><title>  wat </title> </head></html>"
    );
    assert_eq!(
        render("%html\n\t%head\n\t\t%title\n\t\t\twat", ()),
        "<html><head><title>wat </title></head></html>"
    );
}

#[test]
fn test_if() {
    let source = "%html\n  %head\n    = if .ShowWat\n      %title wat\n  %body\n    #content\n      moo\n    ";
    assert_eq!(
        render(source, context!(ShowWat => true)),
        "<html><head><title>  wat </title> </head><body><div id=\"content\">moo </div></body></html>"
    );
    assert_eq!(
        render(source, context!(ShowWat => false)),
        "<html><head></head><body><div id=\"content\">moo </div></body></html>"
    );
}

#[test]
fn test_if_else() {
    let source = "%html\n\t%head\n\t\t= if .ShowWat\n\t\t\t%title wat\n\t\t= else\n\t\t\t%title taw";
    assert_eq!(
        render(source, context!(ShowWat => true)),
        "<html><head><title>  wat </title> </head></html>"
    );
    assert_eq!(
        render(source, context!(ShowWat => false)),
        "<html><head><title>  taw </title> </head></html>"
    );
}

#[test]
fn test_else_if_and_unless() {
    let source = "= if eq .N 1\n  one\n= else if eq .N 2\n  two\n= else\n  many";
    assert_eq!(render(source, context!(N => 1)), "one ");
    assert_eq!(render(source, context!(N => 2)), "two ");
    assert_eq!(render(source, context!(N => 7)), "many ");

    let source = "= unless .Hidden\n  %p shown\n= else\n  %p hidden";
    assert_eq!(render(source, context!(Hidden => false)), "<p>  shown </p> ");
    assert_eq!(render(source, context!(Hidden => true)), "<p>  hidden </p> ");
}

#[test]
fn test_range() {
    let source = "%html\n\t%body\n\t\t= range .Wats\n\t\t\t%p wat";
    assert_eq!(
        render(source, context!(Wats => vec![1, 2])),
        "<html><body><p>  wat </p> <p>  wat </p> </body></html>"
    );
    assert_eq!(
        render(source, context!(Wats => Vec::<i32>::new())),
        "<html><body></body></html>"
    );
}

#[test]
fn test_range_else() {
    let source = "%html\n\t%body\n\t\t= range .Wats\n\t\t\t%p wat\n\t\t= else\n\t\t\t%p no wat";
    assert_eq!(
        render(source, context!(Wats => vec![1, 2])),
        "<html><body><p>  wat </p> <p>  wat </p> </body></html>"
    );
    assert_eq!(
        render(source, context!(Wats => Vec::<i32>::new())),
        "<html><body><p>  no wat </p> </body></html>"
    );
}

#[test]
fn test_range_declarations() {
    let source = "%ul\n  = range $i, $name := .Names\n    %li= $i\n    %li= $name";
    assert_eq!(
        render(source, context!(Names => vec!["a", "b"])),
        "<ul><li> 0</li> <li> a</li> <li> 1</li> <li> b</li> </ul>"
    );
}

#[test]
fn test_text_passthrough() {
    assert_eq!(
        render(
            "<!DOCTYPE html>\n%html\n  %body Test Line\n    Test other line",
            ()
        ),
        "<!DOCTYPE html> <html><body> Test Line Test other line </body></html>"
    );
}

#[test]
fn test_output() {
    assert_eq!(
        render(
            "<!DOCTYPE html>\n%html\n\t%body\n\t\t= .Name",
            context!(Name => "Andrew")
        ),
        "<!DOCTYPE html> <html><body>Andrew</body></html>"
    );
}

#[test]
fn test_attributes() {
    assert_eq!(
        render(
            "<!DOCTYPE html>\n%html(ng-app)\n\t%body(ng-controller=\"PageController\")",
            ()
        ),
        "<!DOCTYPE html> <html ng-app><body ng-controller=\"PageController\"></body></html>"
    );
    assert_eq!(
        render("%html\n\t%body\n\t\t%div.see.me(class=\"soon\")", ()),
        "<html><body><div class=\"see me soon\"></div></body></html>"
    );
    assert_eq!(
        render("%html\n\t%body\n\t\t%div#see(id=\"me\")", ()),
        "<html><body><div id=\"see_me\"></div></body></html>"
    );
    assert_eq!(
        render("%html\n\t%body\n\t\t#see(id=\"me\")", ()),
        "<html><body><div id=\"see_me\"></div></body></html>"
    );
}

#[test]
fn test_id_join() {
    let mut env = Environment::new();
    env.set_id_join("-");
    env.add_template("test.bham", "#see(id=\"me\")").unwrap();
    assert_eq!(env.render_named("test", ()).unwrap(), "<div id=\"see-me\"></div>");
}

#[test]
fn test_with() {
    assert_eq!(
        render("%html\n\t= with $name := \"Killer\"\n\t\t= $name", ()),
        "<html>Killer</html>"
    );
    assert_eq!(
        render("= with .User\n  = .Name", context!(User => context!(Name => "Ann"))),
        "Ann"
    );
    assert_eq!(render("= with .User\n  = .Name", ()), "");
}

#[test]
fn test_embedded_interpolations() {
    assert_eq!(
        render(
            "%html {{ .Name }}\n\t%head\n\t\t%title(class=\"{{ .Class }}\") wat",
            context!(Name => "Andrew Sellers", Class => "big")
        ),
        "<html> Andrew Sellers<head><title class=\"big\">  wat </title> </head></html>"
    );
    assert_eq!(
        render("Hello {{ .Name }}, bye", context!(Name => "Ann")),
        "Hello Ann, bye "
    );
}

#[test]
fn test_broken_interpolation_is_kept() {
    assert_eq!(render("%p {{ ( }}", ()), "<p>  {{ ( }} </p> ");

    let mut env = Environment::new();
    env.set_strict_interpolation(true);
    let err = env.add_template("test.bham", "%p {{ ( }}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    assert_eq!(err.name(), Some("test"));
    assert_eq!(err.line(), Some(1));
}

#[test]
fn test_filters() {
    assert_eq!(
        render("%html\n  :javascript\n    var name = \"Andrew\";\n", ()),
        "<html><script type=\"text/javascript\">var name = \"Andrew\";</script></html>"
    );
    assert_eq!(
        render(":css\n  a {\n    color: red;\n  }", ()),
        "<style>a {\n  color: red;\n}</style>"
    );

    let mut env = Environment::new();
    env.add_filter_handler(
        FilterHandler::new(":shout", "<p>", "</p>").with_transform(|body| body.replace("hello", "HELLO")),
    );
    env.add_template("test.bham", ":shout\n  hello {{ .Name }}").unwrap();
    assert_eq!(
        env.render_named("test", context!(Name => "ann")).unwrap(),
        "<p>HELLO ann</p>"
    );
}

#[test]
fn test_doctypes() {
    assert_eq!(render("!!!\n%html", ()), "<!DOCTYPE html><html></html>");
    assert!(render("!!! Strict", ()).contains("XHTML 1.0 Strict"));

    let mut env = Environment::new();
    env.add_doctype("legacy", "<!DOCTYPE legacy>");
    env.add_template("test.bham", "!!! legacy").unwrap();
    assert_eq!(env.render_named("test", ()).unwrap(), "<!DOCTYPE legacy>");
}

#[test]
fn test_continuation_lines() {
    assert_eq!(
        render(
            "%a(href=\"/\" \\\n   class=\"nav\") Home",
            ()
        ),
        "<a href=\"/\" class=\"nav\">  Home </a> "
    );
}

#[test]
fn test_strict_indentation() {
    let mut env = Environment::new();
    env.set_strict_indentation(true);
    env.add_template("test.bham", "%p\n\t%b x").unwrap();
    assert_eq!(env.render_named("test", ()).unwrap(), "<p><b>  x </b> </p>");

    // spaces are not indentation in strict mode, the line is text
    env.add_template("spaces.bham", "%p\n  %b x").unwrap();
    assert_eq!(env.render_named("spaces", ()).unwrap(), "<p></p>  %b x ");
}

#[test]
fn test_auto_escape_by_name() {
    let mut env = Environment::new();
    env.add_template("page.html.bham", "%p= .Name").unwrap();
    env.add_template("page.txt.bham", "%p= .Name").unwrap();
    let ctx = context!(Name => "<b>");
    assert_eq!(
        env.render_named("page.html", &ctx).unwrap(),
        "<p> &lt;b&gt;</p> "
    );
    assert_eq!(env.render_named("page.txt", &ctx).unwrap(), "<p> <b></p> ");
}

#[test]
fn test_compile_errors() {
    let mut env = Environment::new();
    insta::assert_snapshot!(
        env.add_template("test.bham", "%html\n\t\t%body").unwrap_err(),
        @"line overindented: line 2 is overindented (in test:2)"
    );
    insta::assert_snapshot!(
        env.add_template("test.bham", "%html\n  :coffee\n    x = 1").unwrap_err(),
        @"bad handler: :coffee (in test:2)"
    );
    insta::assert_snapshot!(
        env.add_template("test.bham", "!!! Nope").unwrap_err(),
        @"bad doctype: !!! Nope (in test:1)"
    );
    insta::assert_snapshot!(
        env.add_template("test.bham", "%p\n= else\n  x").unwrap_err(),
        @"syntax error: else without a matching if, unless or range (in test:2)"
    );
    assert_eq!(
        env.add_template("test.bham", "%a(href=x)").unwrap_err().kind(),
        ErrorKind::MissingAttributeQuotes
    );
    assert!(env.templates().next().is_none());
}

#[test]
fn test_compiles_deterministically() {
    let source = "%ul.list\n  = range .Items\n    %li= .\n  = else\n    %li none\n%p Hello {{ .Name }}";
    let ctx = context!(Items => vec!["a", "b"], Name => "Ann");
    let first = render(source, &ctx);
    assert_eq!(render(source, &ctx), first);

    let mut env = Environment::new();
    env.add_template("a.bham", source).unwrap();
    env.add_template("b.bham", source).unwrap();
    assert_eq!(
        env.get_template("a").unwrap().unit().nodes(),
        env.get_template("b").unwrap().unit().nodes()
    );
}

#[test]
fn test_range_over_large_count() {
    let mut env = Environment::new();
    env.add_template("test.bham", "= range .N\n  = if eq . 2\n    = nope\n  = else\n    %i= .")
        .unwrap();
    let err = env
        .render_named("test", context!(N => 1_000_000_000_000_i64))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFunction);
    assert_eq!(
        env.render_named("test", context!(N => 2)).unwrap(),
        "<i> 0</i> <i> 1</i> "
    );
}
