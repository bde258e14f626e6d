// svcs.rs - SVC number resolver
//
// Second pass: walk the SVC enumerations and turn each member into a concrete
// number using the range table. Three idioms are recognized:
//
// - `enum ..._SVCS { A = X_SVC_BASE, B, C = Y_SVC_BASE + 4, ... }`: each
//   assignment switches the base; implicit members count up from it.
// - every enum in the vendor interface file (ant_interface.h): the first
//   assignment fixes the base for the whole block.
// - `#define SD_RADIO_REQUEST (0x..)` style literals, bound as-is.
//
// The resulting table lives only for the current run.

use crate::dialect::Dialect;
use crate::error::{Construct, Diagnostic, Diagnostics};
use crate::lex::{self, Token, TokenKind};
use crate::ranges::RangeTable;
use crate::source::{LineCursor, SourceFile};
use std::collections::HashMap;
use tracing::trace;

/// Function name -> SVC number
#[derive(Debug, Clone, Default)]
pub struct SvcTable {
    numbers: HashMap<String, String>,
}

impl SvcTable {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.numbers.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    fn bind(&mut self, name: &str, number: String) {
        trace!(name, %number, "svc bound");
        self.numbers.insert(name.to_string(), number);
    }
}

/// How members of one enum block get their numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numbering {
    /// Every `= BASE` switches the base and restarts the count
    Declared,
    /// The first `= BASE` holds for the whole block
    Fixed,
}

/// Right-hand side of an enum member assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assigned<'a> {
    Base(&'a str),
    Offset { base: &'a str, offset: u64 },
    Other,
}

fn classify<'a>(mut tokens: &[Token<'a>]) -> Assigned<'a> {
    // Drop parentheses wrapping the whole expression
    while tokens.len() >= 2
        && tokens[0].is_punct('(')
        && lex::matching_close(tokens, 0) == Some(tokens.len() - 1)
    {
        tokens = &tokens[1..tokens.len() - 1];
    }

    match tokens {
        [name] if name.kind == TokenKind::Ident => Assigned::Base(name.text),
        [name, plus, k]
            if name.kind == TokenKind::Ident && plus.is_punct('+') && k.kind == TokenKind::Number =>
        {
            match lex::parse_int(k.text) {
                Some(offset) => Assigned::Offset {
                    base: name.text,
                    offset,
                },
                None => Assigned::Other,
            }
        }
        _ => Assigned::Other,
    }
}

/// Line number of the end of `prefix`, which starts on `line`
fn line_after(line: usize, prefix: &str) -> usize {
    line + prefix.matches('\n').count()
}

/// Outcome of reading an enum from its keyword onwards. Line numbers are
/// those of the first character of `body` and `rest`.
enum EnumScan {
    Block {
        body: String,
        body_line: usize,
        rest: String,
        rest_line: usize,
    },
    /// `enum X x;` and the like; no braces before the statement ends
    NotABlock { rest: String, rest_line: usize },
    Unterminated,
}

/// Read from an `enum` keyword at the start of `text`, found on `line`, to
/// its closing brace, pulling continuation lines from the cursor
fn read_enum(text: String, line: usize, cursor: &mut LineCursor<'_>) -> EnumScan {
    let mut buf = text;
    loop {
        let tokens = lex::tokenize(&buf);
        if let Some(open) = tokens
            .iter()
            .position(|t| t.is_punct('{') || t.is_punct(';'))
        {
            let open_end = tokens[open].span.end;
            if tokens[open].is_punct(';') {
                return EnumScan::NotABlock {
                    rest: buf[open_end..].to_string(),
                    rest_line: line_after(line, &buf[..open_end]),
                };
            }
            if let Some(close) = lex::matching_close(&tokens, open) {
                let close_span = tokens[close].span.clone();
                return EnumScan::Block {
                    body: buf[open_end..close_span.start].to_string(),
                    body_line: line_after(line, &buf[..open_end]),
                    rest: buf[close_span.end..].to_string(),
                    rest_line: line_after(line, &buf[..close_span.end]),
                };
            }
        }

        match cursor.next_line() {
            Some(next) => {
                buf.push('\n');
                buf.push_str(&next.text);
            }
            None => return EnumScan::Unterminated,
        }
    }
}

/// Enum body with preprocessor lines blanked; line breaks are kept so
/// member line numbers stay right
fn without_directives(body: &str) -> String {
    body.split('\n')
        .map(|line| if line.trim_start().starts_with('#') { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

struct Resolver<'r> {
    ranges: &'r RangeTable,
    dialect: &'r Dialect,
    table: SvcTable,
}

impl Resolver<'_> {
    fn resolve_file(&mut self, file: &SourceFile, diags: &mut Diagnostics) {
        let vendor_file = file.file_name() == self.dialect.vendor_enum_file;
        let mut cursor = file.cursor();

        while let Some(line) = cursor.next_line() {
            let text: &str = &line.text;
            let tokens = lex::tokenize(text);
            let enum_at = tokens.iter().find(|t| t.is_ident("enum")).map(|t| t.span.start);

            let numbering = match enum_at {
                Some(_) if text.contains(&self.dialect.enum_marker) => Some(Numbering::Declared),
                Some(_) if vendor_file => Some(Numbering::Fixed),
                _ => None,
            };

            if let (Some(start), Some(numbering)) = (enum_at, numbering) {
                let pending = text[start..].to_string();
                self.scan_enums(pending, line.number, numbering, &mut cursor, file, diags);
                continue;
            }

            if let Some(define) = lex::parse_define(&tokens) {
                if self.dialect.is_direct_number(define.name) {
                    match define.value {
                        Some(value) if value.kind == TokenKind::Number => {
                            self.table.bind(define.name, value.text.to_string());
                        }
                        _ => trace!(name = define.name, "redefinition without a literal"),
                    }
                }
            }
        }
    }

    /// Number every enum starting in `pending`, including further enums that
    /// share the line the previous one closed on
    fn scan_enums(
        &mut self,
        mut pending: String,
        mut line: usize,
        numbering: Numbering,
        cursor: &mut LineCursor<'_>,
        file: &SourceFile,
        diags: &mut Diagnostics,
    ) {
        loop {
            match read_enum(pending, line, cursor) {
                EnumScan::Block {
                    body,
                    body_line,
                    rest,
                    rest_line,
                } => {
                    self.number_members(&body, body_line, numbering, file, diags);
                    pending = rest;
                    line = rest_line;
                }
                EnumScan::NotABlock { rest, rest_line } => {
                    pending = rest;
                    line = rest_line;
                }
                EnumScan::Unterminated => {
                    diags.report(Diagnostic::UnterminatedConstruct {
                        path: file.path.clone(),
                        line,
                        construct: Construct::Enum,
                    });
                    return;
                }
            }

            if numbering == Numbering::Declared && !pending.contains(&self.dialect.enum_marker) {
                return;
            }
            let next = lex::tokenize(&pending)
                .iter()
                .find(|t| t.is_ident("enum"))
                .map(|t| t.span.start);
            match next {
                Some(start) => {
                    line = line_after(line, &pending[..start]);
                    pending.replace_range(..start, "");
                }
                None => return,
            }
        }
    }

    fn number_members(
        &mut self,
        body: &str,
        body_line: usize,
        numbering: Numbering,
        file: &SourceFile,
        diags: &mut Diagnostics,
    ) {
        let body = without_directives(body);
        let tokens = lex::tokenize(&body);
        let mut declared: Option<Assigned<'_>> = None;
        let mut ordinal: u64 = 0;

        for member in lex::split_top_level(&tokens, ',') {
            let Some(name) = member.iter().find(|t| t.kind == TokenKind::Ident) else {
                continue;
            };
            let line = line_after(body_line, &body[..name.span.start]);
            let assigned = member
                .iter()
                .position(|t| t.is_punct('='))
                .map(|eq| classify(&member[eq + 1..]));

            let mut declared_here = false;
            match (numbering, assigned) {
                (_, None) => {}
                (Numbering::Fixed, Some(_)) if declared.is_some() => {}
                (_, Some(Assigned::Other)) => declared = None,
                (_, Some(expr)) => {
                    if let Assigned::Base(_) = expr {
                        ordinal = 0;
                    }
                    declared = Some(expr);
                    declared_here = true;
                }
            }

            // `BASE + k` stays the declared base and takes no ordinal
            let (base, offset) = match declared {
                Some(Assigned::Base(base)) => {
                    ordinal += 1;
                    (base, ordinal - 1)
                }
                Some(Assigned::Offset { base, offset }) => (base, offset),
                _ => continue,
            };

            match self.ranges.base_value(base) {
                Some(value) => match value.checked_add(offset) {
                    Some(number) => self.table.bind(name.text, format!("{:#x}", number)),
                    None => diags.report(Diagnostic::UnresolvedSymbol {
                        path: file.path.clone(),
                        line,
                        symbol: name.text.to_string(),
                    }),
                },
                None if declared_here => diags.report(Diagnostic::UnresolvedSymbol {
                    path: file.path.clone(),
                    line,
                    symbol: base.to_string(),
                }),
                None => {}
            }
        }
    }
}

/// Resolve SVC numbers across all headers of a variant
pub fn resolve(
    files: &[SourceFile],
    ranges: &RangeTable,
    dialect: &Dialect,
    diags: &mut Diagnostics,
) -> SvcTable {
    let mut resolver = Resolver {
        ranges,
        dialect,
        table: SvcTable::default(),
    };
    for file in files {
        resolver.resolve_file(file, diags);
    }
    tracing::debug!(count = resolver.table.len(), "svc numbers resolved");
    resolver.table
}
