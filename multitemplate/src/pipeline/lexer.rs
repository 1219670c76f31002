use crate::error::{Error, ErrorKind};
use crate::pipeline::tokens::{Span, Token};
use crate::utils::unescape;

/// Tokenizes a single pipeline statement.
pub struct Tokenizer<'s> {
    rest: &'s str,
    current_offset: u32,
}

#[cfg(feature = "unicode")]
fn lex_identifier(s: &str) -> usize {
    s.chars()
        .enumerate()
        .map_while(|(idx, c)| {
            let cont = if c == '_' {
                true
            } else if idx == 0 {
                unicode_ident::is_xid_start(c)
            } else {
                unicode_ident::is_xid_continue(c)
            };
            cont.then(|| c.len_utf8())
        })
        .sum::<usize>()
}

#[cfg(not(feature = "unicode"))]
fn lex_identifier(s: &str) -> usize {
    s.as_bytes()
        .iter()
        .enumerate()
        .take_while(|&(idx, &c)| {
            if c == b'_' {
                true
            } else if idx == 0 {
                c.is_ascii_alphabetic()
            } else {
                c.is_ascii_alphanumeric()
            }
        })
        .count()
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer for a statement.
    pub fn new(source: &'s str) -> Tokenizer<'s> {
        Tokenizer {
            rest: source,
            current_offset: 0,
        }
    }

    /// Returns the offset of the next unconsumed byte.
    pub fn offset(&self) -> usize {
        self.current_offset as usize
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Option<(Token<'s>, Span)>, Error> {
        self.skip_whitespace();
        let start = self.current_offset;
        let token = match self.rest_bytes() {
            [] => return Ok(None),
            [b'|', ..] => {
                self.advance(1);
                Token::Pipe
            }
            [b',', ..] => {
                self.advance(1);
                Token::Comma
            }
            [b'(', ..] => {
                self.advance(1);
                Token::ParenOpen
            }
            [b')', ..] => {
                self.advance(1);
                Token::ParenClose
            }
            [b':', b'=', ..] => {
                self.advance(2);
                Token::Declare
            }
            [b'=', ..] => {
                self.advance(1);
                Token::Assign
            }
            [b'.', b'0'..=b'9', ..] => ok!(self.eat_number()),
            [b'.', ..] => {
                self.advance(1);
                let ident_len = lex_identifier(self.rest);
                if ident_len > 0 {
                    Token::Field(self.advance(ident_len))
                } else {
                    Token::Dot
                }
            }
            [b'$', ..] => {
                self.advance(1);
                let ident_len = lex_identifier(self.rest);
                Token::Var(self.advance(ident_len))
            }
            [b'"', ..] => ok!(self.eat_string()),
            [b'`', ..] => ok!(self.eat_raw_string()),
            [b'0'..=b'9', ..] | [b'-' | b'+', b'0'..=b'9' | b'.', ..] => ok!(self.eat_number()),
            _ => {
                let ident_len = lex_identifier(self.rest);
                if ident_len == 0 {
                    return Err(self.syntax_error(&format!(
                        "unexpected character {:?}",
                        self.rest.chars().next().unwrap_or_default()
                    )));
                }
                Token::Ident(self.advance(ident_len))
            }
        };
        Ok(Some((token, self.span(start))))
    }

    #[inline]
    fn rest_bytes(&self) -> &[u8] {
        self.rest.as_bytes()
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        self.current_offset += bytes as u32;
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn span(&self, start_offset: u32) -> Span {
        Span {
            start_offset,
            end_offset: self.current_offset,
        }
    }

    #[inline]
    fn syntax_error(&self, msg: &str) -> Error {
        Error::new(ErrorKind::SyntaxError, msg.to_string())
    }

    fn eat_number(&mut self) -> Result<Token<'s>, Error> {
        let sign_len = match self.rest_bytes().first() {
            Some(b'-' | b'+') => 1,
            _ => 0,
        };
        let radix = match self.rest_bytes().get(sign_len..sign_len + 2) {
            Some(b"0x" | b"0X") => 16,
            Some(b"0o" | b"0O") => 8,
            Some(b"0b" | b"0B") => 2,
            _ => 10,
        };
        let prefix_len = sign_len + if radix == 10 { 0 } else { 2 };
        let mut is_float = false;
        let mut prev = b' ';
        let num_len = self.rest_bytes()[prefix_len..]
            .iter()
            .take_while(|&&c| {
                let accept = match c {
                    b'0'..=b'9' | b'_' => true,
                    b'a'..=b'f' | b'A'..=b'F' if radix == 16 => true,
                    b'.' if radix == 10 => {
                        is_float = true;
                        true
                    }
                    b'e' | b'E' if radix == 10 => {
                        is_float = true;
                        true
                    }
                    b'+' | b'-' => matches!(prev, b'e' | b'E') && radix == 10,
                    _ => false,
                };
                prev = c;
                accept
            })
            .count();
        let raw = self.advance(prefix_len + num_len);
        if raw.ends_with('_') {
            return Err(self.syntax_error("'_' may not occur at end of number"));
        }
        let num = raw.replace('_', "");
        if is_float {
            num.parse()
                .map(Token::Float)
                .map_err(|_| self.syntax_error(&format!("invalid number {raw:?}")))
        } else {
            let negative = num.starts_with('-');
            let digits = &num[prefix_len..];
            i64::from_str_radix(digits, radix)
                .map(|x| Token::Int(if negative { -x } else { x }))
                .map_err(|_| self.syntax_error(&format!("invalid number {raw:?}")))
        }
    }

    fn eat_string(&mut self) -> Result<Token<'s>, Error> {
        let mut escaped = false;
        let mut has_escapes = false;
        let str_len = self
            .rest_bytes()
            .iter()
            .skip(1)
            .take_while(|&&c| match (escaped, c) {
                (true, _) => {
                    escaped = false;
                    true
                }
                (_, b'\\') => {
                    escaped = true;
                    has_escapes = true;
                    true
                }
                (_, b'"') | (_, b'\n') => false,
                _ => true,
            })
            .count();
        if escaped || self.rest_bytes().get(str_len + 1) != Some(&b'"') {
            return Err(self.syntax_error("unterminated quoted string"));
        }
        let s = self.advance(str_len + 2);
        Ok(if has_escapes {
            Token::String(ok!(unescape(&s[1..s.len() - 1])))
        } else {
            Token::Str(&s[1..s.len() - 1])
        })
    }

    fn eat_raw_string(&mut self) -> Result<Token<'s>, Error> {
        match self.rest[1..].find('`') {
            Some(len) => {
                let s = self.advance(len + 2);
                Ok(Token::Str(&s[1..s.len() - 1]))
            }
            None => Err(self.syntax_error("unterminated raw quoted string")),
        }
    }

    fn skip_whitespace(&mut self) {
        let skipped = self
            .rest
            .chars()
            .map_while(|c| c.is_whitespace().then(|| c.len_utf8()))
            .sum();
        if skipped > 0 {
            self.advance(skipped);
        }
    }
}

/// Utility function to quickly tokenize into an iterator.
#[cfg(any(test, feature = "unstable_machinery"))]
pub fn tokenize(input: &str) -> impl Iterator<Item = Result<(Token<'_>, Span), Error>> {
    let mut tokenizer = Tokenizer::new(input);
    std::iter::from_fn(move || tokenizer.next_token().transpose())
}
