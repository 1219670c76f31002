use std::borrow::Cow;

use crate::error::{Error, ErrorKind};

/// A logical source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'s> {
    /// Indentation in levels.
    pub indent: usize,
    /// The content without indentation, continuations joined.
    pub content: Cow<'s, str>,
    /// One based number of the physical line the logical line starts on.
    pub lineno: usize,
}

impl<'s> Line<'s> {
    fn first_char_in(&self, chars: &str) -> bool {
        self.content.chars().next().map_or(false, |c| chars.contains(c))
    }

    pub(crate) fn is_tag(&self) -> bool {
        self.first_char_in("%.#")
    }

    pub(crate) fn is_actionable(&self) -> bool {
        self.first_char_in("=-")
    }

    /// The statement of an actionable line: one sigil stripped and trimmed.
    pub(crate) fn statement(&self) -> &str {
        if self.is_actionable() {
            self.content[1..].trim()
        } else {
            &self.content
        }
    }

    fn needs_continuation(&self) -> bool {
        (self.is_actionable() && self.statement().ends_with('\\'))
            || (self.is_tag() && self.content.ends_with('\\'))
    }

    fn continue_with(&mut self, next: &str) {
        let head = self.content.trim_end();
        let head = head.strip_suffix('\\').unwrap_or(head).trim();
        self.content = Cow::Owned(format!("{} {}", head, next.trim()));
    }
}

/// Measures the indentation of a physical line.
///
/// A level is a tab, or two spaces unless indentation is strict.
fn indentation(line: &str, strict: bool) -> (usize, &str) {
    let mut level = 0;
    let mut rest = line;
    loop {
        if let Some(after) = rest.strip_prefix('\t') {
            rest = after;
        } else if let Some(after) = rest.strip_prefix("  ").filter(|_| !strict) {
            rest = after;
        } else {
            return (level, rest);
        }
        level += 1;
    }
}

/// Splits a source into logical lines.
///
/// Blank lines are dropped.  A statement line (`=`/`-`) or a tag line that
/// ends with a backslash continues on the following physical line; the
/// backslash is removed and both parts are joined with a single space.
pub fn classify_lines(source: &str, strict: bool) -> Result<Vec<Line<'_>>, Error> {
    let mut rv = Vec::new();
    let mut physical = source.lines().enumerate().map(|(idx, line)| (idx + 1, line));
    let mut current_level = 0;

    while let Some((lineno, raw)) = physical.next() {
        if raw.trim().is_empty() {
            continue;
        }
        let (indent, content) = indentation(raw, strict);
        if indent > current_level + 1 {
            let mut err = Error::new(
                ErrorKind::LineOverindented,
                format!("line {} is overindented", lineno),
            );
            err.set_lineno(lineno);
            return Err(err);
        }
        let mut line = Line {
            indent,
            content: Cow::Borrowed(content),
            lineno,
        };
        while line.needs_continuation() {
            match physical.next() {
                Some((_, next)) => line.continue_with(next),
                None => {
                    let mut err = Error::new(
                        ErrorKind::LineNotCompleted,
                        format!("line {} is not completed", lineno),
                    );
                    err.set_lineno(lineno);
                    return Err(err);
                }
            }
        }
        current_level = indent;
        rv.push(line);
    }

    Ok(rv)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn summary(source: &str, strict: bool) -> Vec<(usize, String)> {
        classify_lines(source, strict)
            .unwrap()
            .into_iter()
            .map(|line| (line.indent, line.content.into_owned()))
            .collect()
    }

    #[test]
    fn test_levels() {
        assert_eq!(
            summary("%html\n\t%head\n\n\t\t%title wat", false),
            vec![
                (0, "%html".to_string()),
                (1, "%head".to_string()),
                (2, "%title wat".to_string()),
            ]
        );
        assert_eq!(
            summary("%html\n  %head\n    %title", false),
            vec![(0, "%html".to_string()), (1, "%head".to_string()), (2, "%title".to_string())]
        );
    }

    #[test]
    fn test_strict_only_counts_tabs() {
        assert_eq!(
            summary("%html\n  %head", true),
            vec![(0, "%html".to_string()), (0, "  %head".to_string())]
        );
    }

    #[test]
    fn test_continuation() {
        let lines = classify_lines("= if and .A \\\n   .B\n\t%p(a=\"b\" \\\nc=\"d\")", false).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content.as_ref(), "= if and .A .B");
        assert_eq!(lines[1].content.as_ref(), "%p(a=\"b\" c=\"d\")");
        assert_eq!(lines[1].lineno, 3);
        // plain text never continues
        assert_eq!(summary("a \\\nb", false).len(), 2);
    }

    #[test]
    fn test_errors() {
        let err = classify_lines("%html\n\t\t%body", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LineOverindented);
        assert_eq!(err.detail(), Some("line 2 is overindented"));

        let err = classify_lines("%p\n%a(href=\"x\" \\", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LineNotCompleted);
        assert_eq!(err.detail(), Some("line 2 is not completed"));
    }
}
