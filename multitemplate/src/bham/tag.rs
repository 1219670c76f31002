use crate::error::{Error, ErrorKind};
use crate::settings::Delimiters;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Segment {
    Name,
    Class,
    Id,
}

/// The parsed form of a compact tag line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescription {
    name: String,
    classes: Vec<String>,
    id_parts: Vec<String>,
    attributes: Vec<String>,
    executable: bool,
}

impl Default for TagDescription {
    fn default() -> Self {
        TagDescription {
            name: "div".into(),
            classes: Vec::new(),
            id_parts: Vec::new(),
            attributes: Vec::new(),
            executable: false,
        }
    }
}

impl TagDescription {
    fn add(&mut self, segment: Segment, value: &str) {
        if value.is_empty() {
            return;
        }
        match segment {
            Segment::Name => self.name = value.into(),
            Segment::Class => self.classes.push(value.into()),
            Segment::Id => self.id_parts.push(value.into()),
        }
    }

    fn push_attribute(&mut self, value: &mut String) {
        if !value.is_empty() {
            self.attributes.push(std::mem::take(value));
        }
    }

    /// The element name.
    #[cfg(any(test, feature = "unstable_machinery"))]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shorthand classes in source order.
    #[cfg(any(test, feature = "unstable_machinery"))]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// The shorthand id parts in source order.
    #[cfg(any(test, feature = "unstable_machinery"))]
    pub fn id_parts(&self) -> &[String] {
        &self.id_parts
    }

    /// The literal attributes (`name` or `name="value"`) in source order.
    #[cfg(any(test, feature = "unstable_machinery"))]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Returns `true` if an attribute value embeds an interpolation.
    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Renders the opening tag.
    ///
    /// Shorthand classes are prepended to an explicit `class` attribute,
    /// shorthand ids to an explicit `id` attribute.  Whatever is left is
    /// appended as new attributes.
    pub fn opening(&self, id_join: &str) -> String {
        let mut classes = self.classes.as_slice();
        let mut id_parts = self.id_parts.as_slice();
        let mut rv = format!("<{}", self.name);

        for attr in &self.attributes {
            if !classes.is_empty() && attr.starts_with("class=\"") {
                rv.push_str(&format!(" class=\"{} {}", classes.join(" "), &attr[7..]));
                classes = &[];
            } else if !id_parts.is_empty() && attr.starts_with("id=\"") {
                rv.push_str(&format!(" id=\"{}{}{}", id_parts.join(id_join), id_join, &attr[4..]));
                id_parts = &[];
            } else {
                rv.push(' ');
                rv.push_str(attr);
            }
        }

        if !classes.is_empty() {
            rv.push_str(&format!(" class=\"{}\"", classes.join(" ")));
        }
        if !id_parts.is_empty() {
            rv.push_str(&format!(" id=\"{}\"", id_parts.join(id_join)));
        }
        rv.push('>');
        rv
    }

    /// Renders the closing tag.
    pub fn closing(&self) -> String {
        format!("</{}>", self.name)
    }
}

/// Finds the end of a name, class or id segment.
///
/// A `-` only ends a segment if whitespace, `=` or the end of the line
/// follows, otherwise it is part of the name (`%my-element`).
fn segment_end(s: &str) -> usize {
    let mut chars = s.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '.' | '#' | '(' | '=' => return idx,
            '-' => match chars.peek() {
                None => return idx,
                Some(&(_, next)) if next == '=' || next.is_whitespace() => return idx,
                Some(_) => {}
            },
            c if c.is_whitespace() => return idx,
            _ => {}
        }
    }
    s.len()
}

fn missing_quotes(what: &str, content: &str) -> Error {
    Error::new(
        ErrorKind::MissingAttributeQuotes,
        format!("attribute values must have {}quotation marks for {}", what, content),
    )
}

/// Reads a quoted attribute value into `value`.
///
/// Interpolations are copied verbatim so that quotes inside of them do not
/// end the value.  Returns the number of bytes consumed.
fn read_quoted(
    s: &str,
    value: &mut String,
    executable: &mut bool,
    content: &str,
    delimiters: &Delimiters,
) -> Result<usize, Error> {
    let body = match s.strip_prefix('"') {
        Some(body) => body,
        None => return Err(missing_quotes("", content)),
    };
    value.push('"');
    let mut pos = 0;
    loop {
        let rest = &body[pos..];
        if rest.starts_with(delimiters.left()) {
            let inner = &rest[delimiters.left().len()..];
            if let Some(end) = inner.find(delimiters.right()) {
                let span = delimiters.left().len() + end + delimiters.right().len();
                value.push_str(&rest[..span]);
                pos += span;
                *executable = true;
                continue;
            }
        }
        match rest.chars().next() {
            Some('"') => {
                value.push('"');
                return Ok(pos + 2);
            }
            Some(c) => {
                value.push(c);
                pos += c.len_utf8();
            }
            None => return Err(missing_quotes("closing ", content)),
        }
    }
}

/// Parses an attribute list (after the opening parenthesis).
///
/// Returns the remainder of the line after the closing parenthesis.
fn parse_attributes<'c>(
    tag: &mut TagDescription,
    s: &'c str,
    content: &str,
    delimiters: &Delimiters,
) -> Result<&'c str, Error> {
    let mut value = String::new();
    let mut pos = 0;
    while let Some(c) = s[pos..].chars().next() {
        match c {
            ')' => {
                tag.push_attribute(&mut value);
                return Ok(&s[pos + 1..]);
            }
            ' ' => {
                tag.push_attribute(&mut value);
                pos += 1;
            }
            '=' => {
                value.push('=');
                pos += 1;
                pos += ok!(read_quoted(
                    &s[pos..],
                    &mut value,
                    &mut tag.executable,
                    content,
                    delimiters
                ));
                tag.push_attribute(&mut value);
            }
            c => {
                value.push(c);
                pos += c.len_utf8();
            }
        }
    }
    Err(Error::new(
        ErrorKind::UnterminatedAttributes,
        format!("unterminated attributes for {}", content),
    ))
}

/// Parses a tag line into its description and the trailing content.
///
/// The line has to start with `%name`, `.class` or `#id`.  The trailing
/// content starts at the first `=`, `-` or whitespace after the
/// segments, or right after the attribute list, and is returned verbatim
/// (including the character that started it).  `%a.nav(href="/") Home`
/// opens as `<a href="/" class="nav">` and leaves ` Home`.
pub fn parse_tag<'c>(
    content: &'c str,
    delimiters: &Delimiters,
) -> Result<(TagDescription, &'c str), Error> {
    let mut tag = TagDescription::default();
    let mut segment = match content.chars().next() {
        Some('%') => Segment::Name,
        Some('.') => Segment::Class,
        Some('#') => Segment::Id,
        _ => {
            return Err(Error::new(
                ErrorKind::SyntaxError,
                format!("tag lines must start with %, . or # in {}", content),
            ))
        }
    };
    let mut rest = &content[1..];

    loop {
        let end = segment_end(rest);
        tag.add(segment, &rest[..end]);
        rest = &rest[end..];
        match rest.chars().next() {
            None => return Ok((tag, "")),
            Some('.') => segment = Segment::Class,
            Some('#') => segment = Segment::Id,
            Some('(') => {
                let rest = ok!(parse_attributes(&mut tag, &rest[1..], content, delimiters));
                return Ok((tag, rest));
            }
            Some(_) => return Ok((tag, rest)),
        }
        rest = &rest[1..];
    }
}
