// structs.rs - `typedef struct` extractor
//
// Collects each structure's member declarations in order. A nested union or
// struct member becomes one pseudo-member `union name(m1,m2,...)`.

use crate::error::{Construct, Diagnostic, Diagnostics};
use crate::lex::{self, Token, TokenKind};
use crate::model::{FirmwareSignature, StructureArgument, StructureRecord};
use crate::source::{LineCursor, SourceFile};
use tracing::debug;

/// A structure and its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub record: StructureRecord,
    pub arguments: Vec<StructureArgument>,
}

/// Members of one brace block, plus the text after its closing brace
#[derive(Debug, Default)]
struct Block {
    members: Vec<String>,
    tail: String,
    has_union: bool,
    has_struct: bool,
}

impl Block {
    fn push_nested(&mut self, keyword: &str, inner: Block) {
        match keyword {
            "union" => self.has_union = true,
            _ => self.has_struct = true,
        }
        self.has_union |= inner.has_union;
        self.has_struct |= inner.has_struct;
        self.members.push(format!(
            "{} {}({})",
            keyword,
            trailing_ident(&inner.tail),
            inner.members.join(",")
        ));
    }

    fn push_declarations(&mut self, text: &str) {
        self.members.extend(
            text.split(';')
                .map(lex::squash_whitespace)
                .filter(|decl| !decl.is_empty()),
        );
    }
}

fn has_punct(tokens: &[Token<'_>], ch: char) -> bool {
    tokens.iter().any(|t| t.is_punct(ch))
}

fn is_typedef_struct(tokens: &[Token<'_>]) -> bool {
    tokens
        .windows(2)
        .any(|w| w[0].is_ident("typedef") && w[1].is_ident("struct"))
}

/// Keyword of a member line that opens a nested union/struct block.
/// `struct foo *next;` is an ordinary member.
fn nested_keyword(tokens: &[Token<'_>], text: &str) -> Option<&'static str> {
    let keyword = tokens.iter().find_map(|t| match t.text {
        "union" if t.kind == TokenKind::Ident => Some("union"),
        "struct" if t.kind == TokenKind::Ident => Some("struct"),
        _ => None,
    })?;
    if has_punct(tokens, '{') || !text.ends_with(';') {
        Some(keyword)
    } else {
        None
    }
}

/// Last identifier in `text`, empty if there is none
fn trailing_ident(text: &str) -> String {
    lex::tokenize(text)
        .iter()
        .rev()
        .find(|t| t.kind == TokenKind::Ident)
        .map(|t| t.text.to_string())
        .unwrap_or_default()
}

/// A block opened and closed on a single line: `union { a; b; } u;`
fn inline_block(text: &str) -> Option<Block> {
    let tokens = lex::tokenize(text);
    let open = tokens.iter().position(|t| t.is_punct('{'))?;
    let close = lex::matching_close(&tokens, open)?;
    let mut block = Block {
        tail: text[tokens[close].span.end..].to_string(),
        ..Default::default()
    };
    block.push_declarations(&text[tokens[open].span.end..tokens[close].span.start]);
    Some(block)
}

/// Read member lines up to the closing brace. `None` if the file ends first.
fn read_block(cursor: &mut LineCursor<'_>) -> Option<Block> {
    let mut block = Block::default();
    loop {
        let line = cursor.next_line()?;
        let text = line.trimmed();
        if text.is_empty() || text == "{" || text.starts_with('#') {
            continue;
        }
        if let Some(tail) = text.strip_prefix('}') {
            block.tail = tail.to_string();
            return Some(block);
        }

        let tokens = lex::tokenize(text);
        match nested_keyword(&tokens, text) {
            Some(keyword) => {
                let inner = if has_punct(&tokens, '{') && has_punct(&tokens, '}') {
                    inline_block(text)?
                } else {
                    read_block(cursor)?
                };
                block.push_nested(keyword, inner);
            }
            None => block.push_declarations(text),
        }
    }
}

/// Structures defined in one header
pub fn extract(
    file: &SourceFile,
    signature: &FirmwareSignature,
    diags: &mut Diagnostics,
) -> Vec<Structure> {
    let mut structures = Vec::new();
    let mut cursor = file.cursor();

    while let Some(line) = cursor.next_line() {
        let text = line.trimmed();
        let tokens = lex::tokenize(text);
        if !is_typedef_struct(&tokens) {
            continue;
        }

        let opens = has_punct(&tokens, '{');
        let block = if opens && has_punct(&tokens, '}') {
            inline_block(text)
        } else if !opens && text.ends_with(';') {
            // typedef struct foo_s foo_t;
            continue;
        } else {
            read_block(&mut cursor)
        };

        let Some(block) = block else {
            diags.report(Diagnostic::UnterminatedConstruct {
                path: file.path.clone(),
                line: line.number,
                construct: Construct::Struct,
            });
            continue;
        };

        let mut name = trailing_ident(&block.tail);
        if name.is_empty() {
            // Fall back to the tag: typedef struct tag { ... };
            name = tokens
                .windows(2)
                .find(|w| w[0].is_ident("struct") && w[1].kind == TokenKind::Ident)
                .map(|w| w[1].text.to_string())
                .unwrap_or_default();
        }
        if name.is_empty() {
            debug!(path = %file.path.display(), line = line.number, "anonymous structure skipped");
            continue;
        }

        let arguments = block
            .members
            .into_iter()
            .enumerate()
            .map(|(ordinal_position, text)| StructureArgument {
                struct_name: name.clone(),
                text,
                ordinal_position,
                signature: signature.clone(),
            })
            .collect();

        structures.push(Structure {
            record: StructureRecord {
                name,
                contains_union: block.has_union,
                contains_struct: block.has_struct,
                signature: signature.clone(),
            },
            arguments,
        });
    }

    structures
}
