//! Lexical helpers for script sources.
//!
//! Everything here works on byte offsets into the original text so that line
//! numbers computed after masking still point at the original source.

/// Replace comments with spaces, keeping newlines and byte offsets intact.
///
/// Handles `//` and `/* */` comments (JSX `{/* */}` included) while leaving
/// string and template literals untouched, including code inside `${..}`.
pub fn mask_comments(content: &str) -> String {
    #[derive(Clone, Copy)]
    enum Mode {
        Code { braces: usize },
        Str(u8),
        Template,
        LineComment,
        BlockComment,
    }

    let bytes = content.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut stack = vec![Mode::Code { braces: 0 }];
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let depth = stack.len();
        let Some(mode) = stack.last_mut() else {
            break;
        };

        match mode {
            Mode::Code { braces } => match (b, next) {
                (b'/', Some(b'/')) => {
                    stack.push(Mode::LineComment);
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'/', Some(b'*')) => {
                    stack.push(Mode::BlockComment);
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                (b'\'' | b'"', _) => stack.push(Mode::Str(b)),
                (b'`', _) => stack.push(Mode::Template),
                (b'{', _) => *braces += 1,
                (b'}', _) => {
                    if *braces == 0 {
                        // Closing a `${..}` interpolation.
                        if depth > 1 {
                            stack.pop();
                        }
                    } else {
                        *braces -= 1;
                    }
                }
                _ => {}
            },
            Mode::Str(quote) => {
                let quote = *quote;
                if b == b'\\' {
                    out.push(b);
                    if let Some(n) = next {
                        out.push(n);
                    }
                    i += 2;
                    continue;
                }
                if b == quote || b == b'\n' {
                    stack.pop();
                }
            }
            Mode::Template => {
                if b == b'\\' {
                    out.push(b);
                    if let Some(n) = next {
                        out.push(n);
                    }
                    i += 2;
                    continue;
                }
                if b == b'`' {
                    stack.pop();
                } else if b == b'$' && next == Some(b'{') {
                    out.extend_from_slice(b"${");
                    stack.push(Mode::Code { braces: 0 });
                    i += 2;
                    continue;
                }
            }
            Mode::LineComment => {
                if b == b'\n' {
                    stack.pop();
                    out.push(b'\n');
                } else {
                    out.push(b' ');
                }
                i += 1;
                continue;
            }
            Mode::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    stack.pop();
                    out.extend_from_slice(b"  ");
                    i += 2;
                    continue;
                }
                out.push(if b == b'\n' { b'\n' } else { b' ' });
                i += 1;
                continue;
            }
        }

        out.push(b);
        i += 1;
    }

    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

/// A string literal found in script source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLit {
    /// Raw contents between the quotes (template interpolations kept verbatim).
    pub value: String,
    /// True when the literal is a template literal with `${..}`.
    pub interpolated: bool,
    /// Offset one past the closing quote.
    pub end: usize,
}

/// Parse the string literal starting at `start` (which must be a quote).
pub fn parse_string_literal(src: &str, start: usize) -> Option<StringLit> {
    let bytes = src.as_bytes();
    let quote = *bytes.get(start)?;
    if !matches!(quote, b'\'' | b'"' | b'`') {
        return None;
    }

    let mut i = start + 1;
    let mut interpolated = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return None,
            b'$' if quote == b'`' && bytes.get(i + 1) == Some(&b'{') => {
                interpolated = true;
                let close = matching_delimiter(src, i + 1)?;
                i = close + 1;
            }
            b if b == quote => {
                return Some(StringLit {
                    value: src[start + 1..i].to_string(),
                    interpolated,
                    end: i + 1,
                });
            }
            _ => i += 1,
        }
    }
    None
}

/// Find the offset of the delimiter closing the one at `open`.
///
/// Supports `(`, `[`, `{`; string literals in between are skipped.
pub fn matching_delimiter(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let (open_b, close_b) = match *bytes.get(open)? {
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        b'{' => (b'{', b'}'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if matches!(b, b'\'' | b'"' | b'`') {
            match parse_string_literal(src, i) {
                Some(lit) => {
                    i = lit.end;
                    continue;
                }
                None => {
                    i += 1;
                    continue;
                }
            }
        }
        if b == open_b {
            depth += 1;
        } else if b == close_b {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Split the arguments of the call whose `(` is at `open` on top-level commas.
///
/// Returns `(offset, trimmed_text)` per argument; offsets point at the first
/// non-whitespace byte of each argument.
pub fn split_call_args(src: &str, open: usize) -> Option<Vec<(usize, &str)>> {
    let close = matching_delimiter(src, open)?;
    let bytes = src.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut i = open + 1;

    while i < close {
        let b = bytes[i];
        if matches!(b, b'\'' | b'"' | b'`') {
            if let Some(lit) = parse_string_literal(src, i) {
                i = lit.end;
                continue;
            }
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                push_arg(src, start, i, &mut args);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    push_arg(src, start, close, &mut args);
    Some(args)
}

fn push_arg<'a>(src: &'a str, start: usize, end: usize, args: &mut Vec<(usize, &'a str)>) {
    let raw = &src[start..end];
    let trimmed = raw.trim_start();
    let offset = start + (raw.len() - trimmed.len());
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        args.push((offset, trimmed));
    }
}

/// Skip ASCII whitespace from `from`, returning the next offset.
pub fn skip_whitespace(src: &str, from: usize) -> usize {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
