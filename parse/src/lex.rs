// lex.rs - Minimal C tokenizer
//
// Recognizes identifiers, integer literals and single-character punctuation.
// Enough for the macro, enum and prototype idioms found in SDK headers; not a
// C preprocessor.

use std::ops::Range;

/// Token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Punct(char),
    /// Anything else (non-ASCII characters)
    Other,
}

/// A token borrowed from its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte range in the tokenized text
    pub span: Range<usize>,
}

impl Token<'_> {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct(ch)
    }

    fn opens(&self) -> bool {
        matches!(self.kind, TokenKind::Punct('(' | '[' | '{'))
    }

    fn closes(&self) -> bool {
        matches!(self.kind, TokenKind::Punct(')' | ']' | '}'))
    }
}

/// Split a piece of text into tokens. Whitespace is dropped.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        let start = pos;

        let kind = if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        } else if b.is_ascii_alphabetic() || b == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Ident
        } else if b.is_ascii_digit() {
            // Covers hex digits and integer suffixes (0x1Fu, 10UL)
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Number
        } else if b == b'"' {
            pos += 1;
            while pos < bytes.len() && bytes[pos] != b'"' {
                if bytes[pos] == b'\\' {
                    pos += 1;
                }
                pos += 1;
            }
            pos = (pos + 1).min(bytes.len());
            TokenKind::Str
        } else if b.is_ascii() {
            pos += 1;
            TokenKind::Punct(b as char)
        } else {
            let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
            pos += ch_len;
            TokenKind::Other
        };

        tokens.push(Token {
            kind,
            text: &text[start..pos],
            span: start..pos,
        });
    }

    tokens
}

/// Parse a C integer literal (decimal or hex, optional u/l suffixes)
pub fn parse_int(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

/// Parse a literal only if it carries the `0x` prefix
pub fn parse_hex(text: &str) -> Option<u64> {
    if text.starts_with("0x") || text.starts_with("0X") {
        parse_int(text)
    } else {
        None
    }
}

/// Split tokens on a separator that is not nested inside (), [] or {}
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>], sep: char) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.opens() {
            depth += 1;
        } else if tok.closes() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && tok.is_punct(sep) {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Index of the token closing the group opened at `open`
pub fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.opens() {
            depth += 1;
        } else if tok.closes() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Source text covered by a run of tokens
pub fn span_text<'a>(text: &'a str, tokens: &[Token<'_>]) -> &'a str {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => &text[first.span.start..last.span.end],
        _ => "",
    }
}

/// Collapse runs of whitespace into single spaces
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A `#define NAME VALUE` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define<'a> {
    pub name: &'a str,
    /// First value token with grouping parentheses removed
    pub value: Option<&'a Token<'a>>,
}

/// Recognize a `#define` directive in a tokenized line
pub fn parse_define<'a>(tokens: &'a [Token<'a>]) -> Option<Define<'a>> {
    match tokens {
        [hash, define, name, rest @ ..]
            if hash.is_punct('#') && define.is_ident("define") && name.kind == TokenKind::Ident =>
        {
            // `#define F(x)` with no space is a function-like macro, not a value
            if rest.first().is_some_and(|t| t.is_punct('(') && t.span.start == name.span.end) {
                return None;
            }
            let value = rest.iter().find(|t| !t.is_punct('(') && !t.is_punct(')'));
            Some(Define {
                name: name.text,
                value,
            })
        }
        _ => None,
    }
}
