// source.rs - Header and linker script sources
//
// Files are read once per run. Every pass walks them through a LineCursor,
// which yields comment-free lines and lets sub-parsers peek or pull the
// continuation lines of a multi-line construct.

use crate::error::Diagnostic;
use std::borrow::Cow;
use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::Lines;

/// A text file read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a file from disk
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        if !path.exists() {
            return Err(Diagnostic::MissingInput {
                path: path.to_path_buf(),
            });
        }
        // SDK headers are ASCII in practice; tolerate stray Latin-1 bytes
        let bytes = std::fs::read(path).map_err(|err| Diagnostic::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(path, String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Final path component, empty if there is none
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
    }

    /// A fresh cursor over the file's code lines
    pub fn cursor(&self) -> LineCursor<'_> {
        LineCursor::new(&self.text)
    }
}

/// One source line with comments removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine<'a> {
    /// 1-based line number
    pub number: usize,
    pub text: Cow<'a, str>,
}

impl CodeLine<'_> {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Iterator over code lines, carrying block comment state across lines
pub struct CodeLines<'a> {
    lines: Enumerate<Lines<'a>>,
    in_comment: bool,
}

impl<'a> CodeLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            in_comment: false,
        }
    }
}

impl<'a> Iterator for CodeLines<'a> {
    type Item = CodeLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, raw) = self.lines.next()?;
        Some(CodeLine {
            number: idx + 1,
            text: strip_comments(raw, &mut self.in_comment),
        })
    }
}

/// Remove `//` and `/* */` comments from a line. A comment is replaced by a
/// single space so tokens on either side stay apart.
fn strip_comments<'a>(line: &'a str, in_comment: &mut bool) -> Cow<'a, str> {
    if !*in_comment && !line.contains("/*") && !line.contains("//") {
        return Cow::Borrowed(line);
    }

    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut keep_from = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        if *in_comment {
            if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                *in_comment = false;
                i += 2;
                keep_from = i;
                out.push(' ');
            } else {
                i += 1;
            }
            continue;
        }

        match bytes[i] {
            b'"' => {
                in_string = !in_string;
                i += 1;
            }
            b'\\' if in_string => i += 2,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&line[keep_from..i]);
                return Cow::Owned(out);
            }
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&line[keep_from..i]);
                *in_comment = true;
                i += 2;
            }
            _ => i += 1,
        }
    }

    if !*in_comment {
        out.push_str(&line[keep_from.min(line.len())..]);
    }
    Cow::Owned(out)
}

/// Cursor over code lines. Sub-parsers pull the continuation lines of a
/// multi-line construct from the cursor the outer loop is walking.
pub struct LineCursor<'a> {
    lines: CodeLines<'a>,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: CodeLines::new(text),
        }
    }

    pub fn next_line(&mut self) -> Option<CodeLine<'a>> {
        self.lines.next()
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = CodeLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(text: &str) -> Vec<String> {
        CodeLines::new(text).map(|l| l.text.trim().to_string()).collect()
    }

    #[test]
    fn test_line_comments_removed() {
        assert_eq!(code("uint8_t a; // note"), ["uint8_t a;"]);
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let lines = code("int a; /**< starts\n still } comment\n ends */ int b;");
        assert_eq!(lines, ["int a;", "", "int b;"]);
    }

    #[test]
    fn test_comment_markers_inside_strings_kept() {
        assert_eq!(code(r#"x = "a//b";"#), [r#"x = "a//b";"#]);
    }

    #[test]
    fn test_cursor_shared_by_outer_and_inner_loops() {
        let mut cursor = LineCursor::new("enum X\n/* skipped\n */ {\nA\n}");
        let first = cursor.next_line().unwrap();
        assert_eq!((first.number, first.trimmed()), (1, "enum X"));

        // An inner reader takes a line; the outer loop resumes after it
        let inner = cursor.next_line().unwrap();
        assert_eq!((inner.number, inner.trimmed()), (2, ""));
        let rest: Vec<(usize, String)> = cursor.map(|l| (l.number, l.trimmed().to_string())).collect();
        assert_eq!(rest, [(3, "{".to_string()), (4, "A".to_string()), (5, "}".to_string())]);
    }

    #[test]
    fn test_missing_file() {
        let err = SourceFile::load(Path::new("/nonexistent/ble.h")).unwrap_err();
        assert!(matches!(err, Diagnostic::MissingInput { .. }));
    }
}
