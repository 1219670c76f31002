use std::collections::BTreeMap;
use std::sync::Arc;

use crate::functions::{self, BoxedFunction};
use crate::settings::FilterHandler;
use crate::utils::AutoEscape;

pub(crate) fn no_auto_escape(_: &str) -> AutoEscape {
    AutoEscape::None
}

/// The default logic for auto escaping based on the logical template name.
///
/// * [`Html`](AutoEscape::Html): `.html`, `.htm`, `.xml`
/// * [`None`](AutoEscape::None): _all others_
///
/// Front end extensions are already stripped from logical names, so
/// `index.html.bham` is registered as `index.html` and auto escapes.
pub fn default_auto_escape_callback(name: &str) -> AutoEscape {
    match name.rsplit('.').next() {
        Some("html") | Some("htm") | Some("xml") => AutoEscape::Html,
        _ => AutoEscape::None,
    }
}

pub(crate) fn get_default_doctypes() -> BTreeMap<String, String> {
    let mut rv = BTreeMap::new();
    let html5 = "<!DOCTYPE html>";
    rv.insert("".into(), html5.into());
    rv.insert("5".into(), html5.into());
    rv.insert(
        "Transitional".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#.into(),
    );
    rv.insert(
        "Strict".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#.into(),
    );
    rv.insert(
        "Frameset".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#.into(),
    );
    rv.insert(
        "1.1".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#.into(),
    );
    rv.insert(
        "Basic".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML Basic 1.1//EN" "http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd">"#.into(),
    );
    rv.insert(
        "Mobile".into(),
        r#"<!DOCTYPE html PUBLIC "-//WAPFORUM//DTD XHTML Mobile 1.2//EN" "http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd">"#.into(),
    );
    rv.insert(
        "RDFa".into(),
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML+RDFa 1.0//EN" "http://www.w3.org/MarkUp/DTD/xhtml-rdfa-1.dtd">"#.into(),
    );
    rv
}

pub(crate) fn get_default_filter_handlers() -> Vec<Arc<FilterHandler>> {
    vec![
        Arc::new(FilterHandler::new(
            "javascript",
            r#"<script type="text/javascript">"#,
            "</script>",
        )),
        Arc::new(FilterHandler::new("css", "<style>", "</style>")),
    ]
}

pub(crate) fn get_builtin_functions() -> BTreeMap<&'static str, BoxedFunction> {
    let mut rv = BTreeMap::new();
    rv.insert("and", BoxedFunction::new(functions::and));
    rv.insert("or", BoxedFunction::new(functions::or));
    rv.insert("not", BoxedFunction::new(functions::not));
    rv.insert("eq", BoxedFunction::new(functions::eq));
    rv.insert("ne", BoxedFunction::new(functions::ne));
    rv.insert("lt", BoxedFunction::new(functions::lt));
    rv.insert("le", BoxedFunction::new(functions::le));
    rv.insert("gt", BoxedFunction::new(functions::gt));
    rv.insert("ge", BoxedFunction::new(functions::ge));
    rv.insert("len", BoxedFunction::new(functions::len));
    rv.insert("index", BoxedFunction::new(functions::index));
    rv.insert("print", BoxedFunction::new(functions::print));
    rv.insert("println", BoxedFunction::new(functions::println));
    rv.insert("html", BoxedFunction::new(functions::html));
    rv.insert("js", BoxedFunction::new(functions::js));
    rv.insert("safe", BoxedFunction::new(functions::safe));
    #[cfg(feature = "urlencode")]
    {
        rv.insert("urlquery", BoxedFunction::new(functions::urlquery));
    }
    rv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_auto_escape() {
        assert_eq!(default_auto_escape_callback("index.html"), AutoEscape::Html);
        assert_eq!(default_auto_escape_callback("feed.xml"), AutoEscape::Html);
        assert_eq!(default_auto_escape_callback("index"), AutoEscape::None);
        assert_eq!(default_auto_escape_callback("mail.txt"), AutoEscape::None);
    }

    #[test]
    fn test_doctype_table() {
        let doctypes = get_default_doctypes();
        assert_eq!(doctypes[""], "<!DOCTYPE html>");
        assert_eq!(doctypes["5"], doctypes[""]);
        assert!(doctypes["Strict"].contains("XHTML 1.0 Strict"));
        assert_eq!(doctypes.len(), 9);
    }
}
