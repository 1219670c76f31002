use std::char::decode_utf16;
use std::fmt;
use std::iter::{once, repeat};
use std::str::Chars;

use crate::compiler::ir::HtmlContext;
use crate::error::{Error, ErrorKind};
use crate::output::Output;
use crate::value::{StringType, Value, ValueKind, ValueRepr};

/// Written instead of a value that is unsafe inside an inline style.
pub(crate) const CSS_UNSAFE_MARKER: &str = "ZgotmplZ";

fn write_with_html_escaping(out: &mut Output, value: &Value) -> fmt::Result {
    if matches!(
        value.kind(),
        ValueKind::Undefined | ValueKind::None | ValueKind::Bool | ValueKind::Number
    ) {
        write!(out, "{value}")
    } else if let Some(s) = value.as_str() {
        write!(out, "{}", HtmlEscape(s))
    } else {
        write!(out, "{}", HtmlEscape(&value.to_string()))
    }
}

fn write_with_script_escaping(out: &mut Output, value: &Value) -> Result<(), Error> {
    let json = ok!(serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::BadSerialization, "unable to format to JSON").with_source(err)
    }));
    write!(out, "{}", ScriptEscape(&json)).map_err(Error::from)
}

fn is_css_safe(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '#' | '%' | '-' | '.' | ',' | '_'))
}

fn write_with_style_escaping(out: &mut Output, value: &Value) -> fmt::Result {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None | ValueKind::Number => write!(out, "{value}"),
        _ => {
            let s = value.to_string();
            if is_css_safe(&s) {
                out.write_str(&s)
            } else {
                out.write_str(CSS_UNSAFE_MARKER)
            }
        }
    }
}

/// Writes a value produced by an action into the output.
///
/// Safe strings and output of units that do not auto escape are written
/// verbatim.  Everything else is escaped for the HTML context the action
/// appears in.
#[inline(always)]
pub fn write_escaped(
    out: &mut Output,
    auto_escape: AutoEscape,
    context: HtmlContext,
    value: &Value,
) -> Result<(), Error> {
    // common case of safe strings or strings without auto escaping
    if let ValueRepr::String(ref s, ty) = value.0 {
        if matches!(ty, StringType::Safe) || matches!(auto_escape, AutoEscape::None) {
            return out.write_str(s).map_err(Error::from);
        }
    }

    match (auto_escape, context) {
        (AutoEscape::None, _) => write!(out, "{value}").map_err(Error::from),
        (AutoEscape::Html, HtmlContext::Body) => {
            write_with_html_escaping(out, value).map_err(Error::from)
        }
        (AutoEscape::Html, HtmlContext::Script) => write_with_script_escaping(out, value),
        (AutoEscape::Html, HtmlContext::Style) => {
            write_with_style_escaping(out, value).map_err(Error::from)
        }
    }
}

/// Controls the autoescaping behavior.
///
/// For more information see
/// [`set_auto_escape_callback`](crate::Environment::set_auto_escape_callback).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AutoEscape {
    /// Do not apply auto escaping.
    None,
    /// Use context aware HTML auto escaping rules.
    ///
    /// In markup any value will be converted into a string and the following
    /// characters will be escaped in ways compatible to XML and HTML: `<`,
    /// `>`, `&`, `"`, `'`, and `/`.  Inside an inline `<script>` values are
    /// serialized to JSON.  Inside an inline `<style>` only values made of
    /// harmless characters are written, anything else is replaced by
    /// `ZgotmplZ`.
    Html,
}

/// Helper to HTML escape a string.
pub struct HtmlEscape<'a>(pub &'a str);

impl<'a> fmt::Display for HtmlEscape<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "v_htmlescape")]
        {
            fmt::Display::fmt(&v_htmlescape::escape(self.0), f)
        }
        // this is taken from askama-escape
        #[cfg(not(feature = "v_htmlescape"))]
        {
            let bytes = self.0.as_bytes();
            let mut start = 0;

            for (i, b) in bytes.iter().enumerate() {
                macro_rules! escaping_body {
                    ($quote:expr) => {{
                        if start < i {
                            // SAFETY: this is safe because we only push valid utf-8 bytes over
                            ok!(f.write_str(unsafe {
                                std::str::from_utf8_unchecked(&bytes[start..i])
                            }));
                        }
                        ok!(f.write_str($quote));
                        start = i + 1;
                    }};
                }
                if b.wrapping_sub(b'"') <= b'>' - b'"' {
                    match *b {
                        b'<' => escaping_body!("&lt;"),
                        b'>' => escaping_body!("&gt;"),
                        b'&' => escaping_body!("&amp;"),
                        b'"' => escaping_body!("&quot;"),
                        b'\'' => escaping_body!("&#x27;"),
                        b'/' => escaping_body!("&#x2f;"),
                        _ => (),
                    }
                }
            }

            if start < bytes.len() {
                // SAFETY: this is safe because we only push valid utf-8 bytes over
                f.write_str(unsafe { std::str::from_utf8_unchecked(&bytes[start..]) })
            } else {
                Ok(())
            }
        }
    }
}

/// Makes serialized JSON safe to embed into an inline `<script>`.
struct ScriptEscape<'a>(&'a str);

impl<'a> fmt::Display for ScriptEscape<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut start = 0;
        for (i, c) in self.0.char_indices() {
            let replacement = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\'' => "\\u0027",
                _ => continue,
            };
            ok!(f.write_str(&self.0[start..i]));
            ok!(f.write_str(replacement));
            start = i + 1;
        }
        f.write_str(&self.0[start..])
    }
}

struct Unescaper {
    out: String,
    pending_surrogate: u16,
}

impl Unescaper {
    fn unescape(mut self, s: &str) -> Result<String, Error> {
        let mut char_iter = s.chars();

        while let Some(c) = char_iter.next() {
            if c == '\\' {
                match char_iter.next() {
                    None => return Err(bad_escape()),
                    Some(d) => match d {
                        '"' | '\\' | '/' | '\'' => ok!(self.push_char(d)),
                        'a' => ok!(self.push_char('\x07')),
                        'b' => ok!(self.push_char('\x08')),
                        'f' => ok!(self.push_char('\x0C')),
                        'n' => ok!(self.push_char('\n')),
                        'r' => ok!(self.push_char('\r')),
                        't' => ok!(self.push_char('\t')),
                        'v' => ok!(self.push_char('\x0B')),
                        'u' => {
                            let val = ok!(self.parse_u16(&mut char_iter));
                            ok!(self.push_u16(val));
                        }
                        _ => return Err(bad_escape()),
                    },
                }
            } else {
                ok!(self.push_char(c));
            }
        }

        if self.pending_surrogate != 0 {
            Err(bad_escape())
        } else {
            Ok(self.out)
        }
    }

    fn parse_u16(&self, chars: &mut Chars) -> Result<u16, Error> {
        let hexnum = chars.chain(repeat('\0')).take(4).collect::<String>();
        u16::from_str_radix(&hexnum, 16).map_err(|_| bad_escape())
    }

    fn push_u16(&mut self, c: u16) -> Result<(), Error> {
        match (self.pending_surrogate, (0xD800..=0xDFFF).contains(&c)) {
            (0, false) => match decode_utf16(once(c)).next() {
                Some(Ok(c)) => self.out.push(c),
                _ => return Err(bad_escape()),
            },
            (_, false) => return Err(bad_escape()),
            (0, true) => self.pending_surrogate = c,
            (prev, true) => match decode_utf16(once(prev).chain(once(c))).next() {
                Some(Ok(c)) => {
                    self.out.push(c);
                    self.pending_surrogate = 0;
                }
                _ => return Err(bad_escape()),
            },
        }
        Ok(())
    }

    fn push_char(&mut self, c: char) -> Result<(), Error> {
        if self.pending_surrogate != 0 {
            Err(bad_escape())
        } else {
            self.out.push(c);
            Ok(())
        }
    }
}

fn bad_escape() -> Error {
    Error::new(ErrorKind::SyntaxError, "bad string escape")
}

/// Un-escape the body of a double quoted string literal.
pub fn unescape(s: &str) -> Result<String, Error> {
    Unescaper {
        out: String::new(),
        pending_surrogate: 0,
    }
    .unescape(s)
}

/// Splits a path into the base name and all of its extensions.
///
/// The directory part is kept on the base:
/// `layouts/main.html.bham` becomes `("layouts/main", ["html", "bham"])`.
pub fn split_extensions(path: &str) -> (&str, Vec<&str>) {
    let file_start = path.rfind(['/', '\\']).map_or(0, |idx| idx + 1);
    let file = &path[file_start..];
    let stem_len = match file[1.min(file.len())..].find('.') {
        Some(idx) => idx + 1.min(file.len()),
        None => file.len(),
    };
    let base = &path[..file_start + stem_len];
    let exts = file[stem_len..]
        .split('.')
        .filter(|ext| !ext.is_empty())
        .collect();
    (base, exts)
}

/// Computes the logical name of a template source.
///
/// Every extension for which `is_front_end` returns `true` is dropped from
/// the name; the last of them is returned as the front end to parse the
/// source with.  All other extensions stay part of the logical name.
pub fn logical_name<'a, F>(path: &'a str, is_front_end: F) -> (String, Option<&'a str>)
where
    F: Fn(&str) -> bool,
{
    let (base, exts) = split_extensions(path);
    let mut name = base.to_string();
    let mut front_end = None;
    for ext in exts {
        if is_front_end(ext) {
            front_end = Some(ext);
        } else {
            name.push('.');
            name.push_str(ext);
        }
    }
    (name, front_end)
}
