//! Handler tier: dispatch branches and the authorization primitives each one
//! reaches.

use super::{ExtractPatterns, ExtractedHandlerRoute, PrimitiveCall, ScanError, ScannedFile, Tier};
use crate::config::Config;
use crate::parser::script::{calls_in, inline_function_body};
use crate::parser::source::{matching_delimiter, parse_string_literal, skip_whitespace};
use crate::parser::{FunctionIndex, LineIndex, mask_comments};
use crate::routes::HttpVerb;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::trace;

static CASE_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bcase\s+(['"`])([A-Za-z]+|\*)\s+(/[^'"`]*)(['"`])\s*:"#)
        .expect("case route regex")
});

/// Object keys only: the literal must open an object literal or follow a comma.
static TABLE_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[{,]\s*(['"`])([A-Za-z]+|\*)\s+(/[^'"`]*)(['"`])\s*:"#)
        .expect("table route regex")
});

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:case\b[^:\n]*|default\s*):").expect("label regex"));

/// Levels of same-file function bodies followed from a branch: the handling
/// function and one level of helpers.
const MAX_DEPTH: usize = 2;

/// Extract dispatch branches from one handler file.
pub fn extract(
    relative: &str,
    content: &str,
    config: &Config,
    patterns: &ExtractPatterns,
) -> ScannedFile {
    let masked = mask_comments(content);
    let lines = LineIndex::new(content);
    let functions = FunctionIndex::build(&masked);
    let exempt = patterns.is_async_handler(content, &masked);
    let ctx = BranchContext {
        masked: &masked,
        lines: &lines,
        functions: &functions,
        config,
    };

    let mut out = ScannedFile::new(relative, Tier::Handler);

    for caps in CASE_ROUTE.captures_iter(&masked) {
        let (Some(whole), Some(q1), Some(q2)) = (caps.get(0), caps.get(1), caps.get(4)) else {
            continue;
        };
        if q1.as_str() != q2.as_str() {
            continue;
        }
        let Some((verb, path)) = route_parts(&caps, relative, &lines, whole.start(), &mut out)
        else {
            continue;
        };

        let body = case_body(&masked, whole.end());
        out.handler_routes
            .push(ctx.branch(relative, verb, path, whole.start(), body, exempt, None));
    }

    for caps in TABLE_ROUTE.captures_iter(&masked) {
        let (Some(whole), Some(q1), Some(q2)) = (caps.get(0), caps.get(1), caps.get(4)) else {
            continue;
        };
        if q1.as_str() != q2.as_str() {
            continue;
        }
        let key_start = q1.start();
        let Some((verb, path)) = route_parts(&caps, relative, &lines, key_start, &mut out) else {
            continue;
        };

        let value_start = skip_whitespace(&masked, whole.end());
        let value = table_value(&masked, value_start);
        let (body, named) = match &value {
            TableValue::Named(name) => (
                functions.body(name.rsplit('.').next().unwrap_or(name)),
                Some(name.clone()),
            ),
            TableValue::Inline(range) => (Some(range.clone()), None),
            TableValue::Other => (None, None),
        };

        let mut route = ctx.branch(
            relative,
            verb,
            path,
            key_start,
            body.clone().unwrap_or(value_start..value_start),
            exempt,
            named.clone(),
        );
        // A named entry points straight at the handling function (depth 1).
        if let Some(name) = &named {
            if ctx.is_sub_router(name) {
                route.forwarded_to = Some(name.clone());
                route.primitives.clear();
            } else if route.forwarded_to.is_none()
                && let Some(body) = body
            {
                route.primitives = ctx.primitives_in(body, 1, &mut vec![name.clone()]);
            }
        }
        out.handler_routes.push(route);
    }

    out.handler_routes.sort();
    trace!(
        file = relative,
        branches = out.handler_routes.len(),
        functions = functions.len(),
        exempt,
        "Extracted handler file"
    );
    out
}

fn route_parts<'a>(
    caps: &regex::Captures<'a>,
    relative: &str,
    lines: &LineIndex,
    start: usize,
    out: &mut ScannedFile,
) -> Option<(HttpVerb, &'a str)> {
    let verb = caps.get(2)?.as_str();
    let path = caps.get(3)?.as_str().trim();
    match verb.parse::<HttpVerb>() {
        Ok(verb) => Some((verb, path)),
        Err(message) => {
            // Upper-case words are meant as verbs; anything else is unrelated text.
            if verb.chars().all(|c| c.is_ascii_uppercase()) {
                let error = ScanError::Declaration {
                    path: relative.to_string(),
                    line: lines.line_of(start),
                    message,
                };
                out.warnings.push((&error).into());
            }
            None
        }
    }
}

struct BranchContext<'a> {
    masked: &'a str,
    lines: &'a LineIndex,
    functions: &'a FunctionIndex,
    config: &'a Config,
}

impl BranchContext<'_> {
    #[allow(clippy::too_many_arguments)]
    fn branch(
        &self,
        relative: &str,
        verb: HttpVerb,
        path: &str,
        label: usize,
        body: Range<usize>,
        exempt: bool,
        handler_fn: Option<String>,
    ) -> ExtractedHandlerRoute {
        let forwarded_to = self.forward_target(&body);
        let handler_fn = handler_fn.or_else(|| {
            calls_in(self.masked, body.clone())
                .into_iter()
                .map(|c| c.name)
                .find(|name| {
                    self.functions.contains(name) && self.config.primitives.classify(name).is_none()
                })
        });
        let primitives = if forwarded_to.is_some() {
            Vec::new()
        } else {
            self.primitives_in(body, 0, &mut Vec::new())
        };

        ExtractedHandlerRoute {
            verb,
            path: path.to_string(),
            file: relative.to_string(),
            branch_line: self.lines.line_of(label),
            handler_fn,
            primitives,
            forwarded_to,
            exempt,
        }
    }

    /// Primitive calls in `range`, following same-file functions up to
    /// [`MAX_DEPTH`] and splicing their primitives in at the call position.
    fn primitives_in(
        &self,
        range: Range<usize>,
        depth: usize,
        stack: &mut Vec<String>,
    ) -> Vec<PrimitiveCall> {
        let mut found = Vec::new();
        for call in calls_in(self.masked, range) {
            if let Some(kind) = self.config.primitives.classify(&call.name) {
                found.push(PrimitiveCall {
                    name: call.name,
                    kind,
                    line: self.lines.line_of(call.offset),
                });
                continue;
            }
            if depth >= MAX_DEPTH || stack.contains(&call.name) {
                continue;
            }
            if let Some(body) = self.functions.body(&call.name) {
                stack.push(call.name.clone());
                found.extend(self.primitives_in(body, depth + 1, stack));
                stack.pop();
            }
        }
        found
    }

    fn is_sub_router(&self, name: &str) -> bool {
        let last = name.rsplit('.').next().unwrap_or(name);
        let first = name.split('.').next().unwrap_or(name);
        self.config
            .handler
            .sub_router_suffixes
            .iter()
            .any(|suffix| last.ends_with(suffix.as_str()) || first.ends_with(suffix.as_str()))
    }

    /// Sub-router name when the branch does nothing but forward to it.
    fn forward_target(&self, body: &Range<usize>) -> Option<String> {
        let text = self.masked.get(body.clone())?;
        let mut statement = text.trim();
        statement = statement.strip_prefix('{').unwrap_or(statement);
        statement = statement.strip_suffix('}').unwrap_or(statement).trim();
        statement = statement.strip_suffix("break;").unwrap_or(statement).trim();
        statement = statement.trim_end_matches(';').trim();
        statement = statement.strip_prefix("return").unwrap_or(statement).trim_start();
        statement = statement.strip_prefix("await").unwrap_or(statement).trim_start();

        let callee_len = statement
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'))
            .unwrap_or(statement.len());
        let callee = &statement[..callee_len];
        if callee.is_empty() || !self.is_sub_router(callee) {
            return None;
        }

        // The call must be the whole statement.
        let rest = statement[callee_len..].trim_start();
        if !rest.starts_with('(') {
            return None;
        }
        let open = statement.len() - rest.len();
        let close = matching_delimiter(statement, open)?;
        statement[close + 1..]
            .trim()
            .is_empty()
            .then(|| callee.to_string())
    }
}

/// Body of a switch case: up to the next label or the end of the switch.
/// Empty fall-through labels extend into the following case.
fn case_body(masked: &str, from: usize) -> Range<usize> {
    let bytes = masked.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    let mut seen_code = false;

    while i < bytes.len() {
        let b = bytes[i];
        if matches!(b, b'\'' | b'"' | b'`') {
            if let Some(lit) = parse_string_literal(masked, i) {
                seen_code = true;
                i = lit.end;
                continue;
            }
        }
        match b {
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => {
                if depth == 0 {
                    return from..i;
                }
                depth -= 1;
            }
            _ if depth == 0 && (b == b'c' || b == b'd') => {
                if (i == 0 || !is_ident_byte(bytes[i - 1]))
                    && let Some(label) = LABEL.find(&masked[i..])
                {
                    if seen_code {
                        return from..i;
                    }
                    i += label.end();
                    continue;
                }
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            seen_code = true;
        }
        i += 1;
    }
    from..bytes.len()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

enum TableValue {
    Named(String),
    Inline(Range<usize>),
    Other,
}

fn table_value(masked: &str, start: usize) -> TableValue {
    if let Some(body) = inline_function_body(masked, start) {
        return TableValue::Inline(body);
    }
    let rest = &masked[start.min(masked.len())..];
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'))
        .unwrap_or(rest.len());
    if len == 0 {
        return TableValue::Other;
    }
    TableValue::Named(rest[..len].to_string())
}
