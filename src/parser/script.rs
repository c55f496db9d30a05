//! Structural facts about JavaScript/TypeScript sources.
//!
//! This is deliberately not a full parser: it recognises function definitions,
//! imports, call expressions and JSX element names well enough for route and
//! authorization-primitive extraction. All functions expect comment-masked
//! input (see [`super::source::mask_comments`]).

use super::source::{matching_delimiter, skip_whitespace};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

static FUNCTION_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>()]*>)?\s*\(")
        .expect("function declaration regex")
});

static ARROW_PAREN_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=\s*(?:async\s+)?(?:function\b[^(\n]*)?\(",
    )
    .expect("arrow declaration regex")
});

static ARROW_BARE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?[A-Za-z_$][\w$]*\s*=>")
        .expect("bare arrow declaration regex")
});

static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").expect("call regex"));

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?([^;'"]+?)\s+from\s+['"]([^'"]+)['"]"#)
        .expect("import regex")
});

static JSX_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Z][\w$]*)(?:\.[\w$]+)*[\s/>]").expect("jsx regex"));

const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "await", "new",
    "super", "import", "require", "with", "delete", "void", "yield", "in", "of",
];

/// Index of function bodies defined at any level of a source file.
#[derive(Debug, Default, Clone)]
pub struct FunctionIndex {
    bodies: FxHashMap<String, Range<usize>>,
}

impl FunctionIndex {
    pub fn build(src: &str) -> Self {
        let mut bodies = FxHashMap::default();

        for caps in FUNCTION_DECL.captures_iter(src) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let paren = whole.end() - 1;
            if let Some(body) = body_after_params(src, paren, false) {
                bodies.entry(name.as_str().to_string()).or_insert(body);
            }
        }

        for caps in ARROW_PAREN_DECL.captures_iter(src) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let paren = whole.end() - 1;
            if let Some(body) = body_after_params(src, paren, true) {
                bodies.entry(name.as_str().to_string()).or_insert(body);
            }
        }

        for caps in ARROW_BARE_DECL.captures_iter(src) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(body) = arrow_body(src, whole.end()) {
                bodies.entry(name.as_str().to_string()).or_insert(body);
            }
        }

        Self { bodies }
    }

    pub fn body(&self, name: &str) -> Option<Range<usize>> {
        self.bodies.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// Body of a function expression starting at `from` (`async (e) => ..`,
/// `function (e) {..}`, `e => ..`).
pub fn inline_function_body(src: &str, from: usize) -> Option<Range<usize>> {
    let mut i = skip_whitespace(src, from);
    let rest = src.get(i..)?;
    if let Some(after) = rest.strip_prefix("async") {
        i += 5 + (after.len() - after.trim_start().len());
    }
    let rest = src.get(i..)?;
    if rest.starts_with("function") {
        let paren = i + rest.find('(')?;
        return body_after_params(src, paren, false);
    }
    if rest.starts_with('(') {
        return body_after_params(src, i, true);
    }
    // Bare single-parameter arrow: `e => ..`.
    let ident_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    if ident_len == 0 {
        return None;
    }
    let after = skip_whitespace(src, i + ident_len);
    if src.get(after..)?.starts_with("=>") {
        return arrow_body(src, after + 2);
    }
    None
}

/// Locate a function body given the offset of its parameter list `(`.
fn body_after_params(src: &str, paren: usize, arrow_allowed: bool) -> Option<Range<usize>> {
    let close = matching_delimiter(src, paren)?;
    let bytes = src.as_bytes();
    let mut i = close + 1;
    // Skip a return type annotation up to the body or arrow.
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let end = matching_delimiter(src, i)?;
                return Some(i..end + 1);
            }
            b'=' if arrow_allowed && bytes.get(i + 1) == Some(&b'>') => {
                return arrow_body(src, i + 2);
            }
            b';' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Body of an arrow function whose `=>` ends right before `from`.
fn arrow_body(src: &str, from: usize) -> Option<Range<usize>> {
    let start = skip_whitespace(src, from);
    let bytes = src.as_bytes();
    if start >= bytes.len() {
        return None;
    }
    if bytes[start] == b'{' {
        let end = matching_delimiter(src, start)?;
        return Some(start..end + 1);
    }
    let end = src[start..]
        .find(['\n', ';'])
        .map(|n| start + n)
        .unwrap_or(src.len());
    Some(start..end)
}

/// A call expression `name(` found in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    /// Offset of the callee name.
    pub offset: usize,
    /// Offset of the opening parenthesis.
    pub paren: usize,
}

/// All call expressions inside `range`, in source order.
///
/// Member calls (`obj.method(`) report the method name; keywords are skipped.
pub fn calls_in(src: &str, range: Range<usize>) -> Vec<CallSite> {
    let start = range.start.min(src.len());
    let end = range.end.min(src.len());
    let slice = &src[start..end];
    CALL.captures_iter(slice)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let whole = caps.get(0)?;
            if KEYWORDS.contains(&name.as_str()) {
                return None;
            }
            // `function foo(` is a declaration, not a call.
            let before = slice[..name.start()].trim_end();
            if before.ends_with("function") {
                return None;
            }
            Some(CallSite {
                name: name.as_str().to_string(),
                offset: start + name.start(),
                paren: start + whole.end() - 1,
            })
        })
        .collect()
}

/// One imported binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Local name the binding is visible as.
    pub local: String,
    /// Module specifier (`./OrgWidgetsAdmin`).
    pub source: String,
    pub offset: usize,
}

pub fn imports(src: &str) -> Vec<Import> {
    let mut out = Vec::new();
    for caps in IMPORT.captures_iter(src) {
        let (Some(clause), Some(source), Some(whole)) = (caps.get(1), caps.get(2), caps.get(0))
        else {
            continue;
        };
        let source = source.as_str().to_string();
        let offset = whole.start();
        let clause = clause.as_str().trim();

        let (default_part, named_part) = match clause.find('{') {
            Some(idx) => (
                clause[..idx].trim().trim_end_matches(',').trim(),
                clause[idx + 1..].trim_end_matches('}').trim(),
            ),
            None => (clause, ""),
        };

        if !default_part.is_empty() && !default_part.starts_with('*') {
            out.push(Import {
                local: default_part.to_string(),
                source: source.clone(),
                offset,
            });
        }

        for item in named_part.split(',') {
            let item = item.trim().trim_start_matches("type ").trim();
            if item.is_empty() {
                continue;
            }
            let local = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item,
            };
            out.push(Import {
                local: local.to_string(),
                source: source.clone(),
                offset,
            });
        }
    }
    out
}

/// Capitalised JSX element names rendered in `src`, in first-seen order.
pub fn jsx_components(src: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in JSX_ELEMENT.captures_iter(src) {
        if let Some(name) = caps.get(1) {
            let name = name.as_str().to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

/// Name of the component/function a module exports as its primary symbol.
pub fn primary_export(src: &str) -> Option<String> {
    static EXPORT: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"\bexport\s+(?:default\s+)?(?:async\s+)?(?:function|const|class|let)\s+([A-Z][\w$]*)",
        )
        .expect("export regex")
    });
    EXPORT
        .captures(src)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_index_declarations() {
        let src = r#"
async function getWidget(event) {
  await requireSystemAdmin(event);
  return load(event);
}
export const listWidgets = async (event: Event): Promise<Res> => {
  return list();
};
const shortOne = async event => check(event);
function typed<T>(x: T): T { return x; }
"#;
        let index = FunctionIndex::build(src);
        let body = index.body("getWidget").unwrap();
        assert!(src[body].contains("requireSystemAdmin"));
        let body = index.body("listWidgets").unwrap();
        assert!(src[body].contains("list()"));
        let body = index.body("shortOne").unwrap();
        assert_eq!(&src[body], "check(event)");
        assert!(index.contains("typed"));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_calls_in_skips_keywords_and_declarations() {
        let src = "function a() { if (x) { foo(1); obj.bar(2); } return baz(); }";
        let calls = calls_in(src, 0..src.len());
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar", "baz"]);
        assert_eq!(&src[calls[0].paren..calls[0].paren + 1], "(");
    }

    #[test]
    fn test_imports() {
        let src = r#"
import OrgWidgetsAdmin from '../../components/OrgWidgetsAdmin';
import { A, B as C } from "./lib";
import React, { useState } from 'react';
import * as ns from './ns';
import type { Props } from './types';
"#;
        let imports = imports(src);
        let locals: Vec<&str> = imports.iter().map(|i| i.local.as_str()).collect();
        assert_eq!(
            locals,
            vec!["OrgWidgetsAdmin", "A", "C", "React", "useState", "Props"]
        );
        assert_eq!(imports[0].source, "../../components/OrgWidgetsAdmin");
    }

    #[test]
    fn test_inline_function_body() {
        let src = "{ 'GET /a': async (event) => { return load(event); }, 'GET /b': e => other(e), }";
        let a = src.find("async").unwrap();
        let body = inline_function_body(src, a).unwrap();
        assert_eq!(&src[body], "{ return load(event); }");
        let b = src.find("e =>").unwrap();
        let body = inline_function_body(src, b).unwrap();
        assert!(src[body].starts_with("other(e)"));
        assert_eq!(inline_function_body(src, src.find("load").unwrap()), None);
    }

    #[test]
    fn test_jsx_components() {
        let src = "return (<Layout><OrgWidgetsAdmin /><div/><Ui.Button>x</Ui.Button></Layout>);";
        assert_eq!(jsx_components(src), vec!["Layout", "OrgWidgetsAdmin", "Ui"]);
    }

    #[test]
    fn test_primary_export() {
        assert_eq!(
            primary_export("export default function OrgWidgetsAdmin() {}"),
            Some("OrgWidgetsAdmin".to_string())
        );
        assert_eq!(
            primary_export("export const WidgetTable = () => null;"),
            Some("WidgetTable".to_string())
        );
        assert_eq!(primary_export("const x = 1;"), None);
    }
}
