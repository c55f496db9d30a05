//! Client tier: wrapper call sites, component route metadata, direct network
//! calls, and page structure.

use super::{
    ExtractPatterns, ExtractedCallSite, ExtractedComponentRoute, ExtractedDirectCall, PageFacts,
    PathExpr, ScannedFile, Tier, excerpt,
};
use crate::config::Config;
use crate::parser::script::{calls_in, imports, jsx_components, primary_export};
use crate::parser::source::{parse_string_literal, split_call_args};
use crate::parser::{LineIndex, mask_comments};
use crate::routes::HttpVerb;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::trace;

static ROUTE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@route\s+([A-Za-z*]+)\s+(/\S*)(?:\s+\[?\s*scope\s*=\s*([A-Za-z-]+)\s*\]?)?")
        .expect("route annotation regex")
});

static DIRECT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(fetch|axios(?:\s*\.\s*(?:get|post|put|patch|delete|head|options|request))?)\s*\(|\bnew\s+(XMLHttpRequest)\b",
    )
    .expect("direct call regex")
});

static METHOD_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmethod\s*:\s*['"`]([A-Za-z]+)['"`]"#).expect("method option regex")
});

/// Extract every client-tier observation from one file.
///
/// `page_route` is set when the file lives under a page root.
pub fn extract(
    relative: &str,
    content: &str,
    page_route: Option<String>,
    config: &Config,
    patterns: &ExtractPatterns,
) -> ScannedFile {
    let masked = mask_comments(content);
    let lines = LineIndex::new(content);
    let mut out = ScannedFile::new(relative, Tier::Client);

    out.call_sites = wrapper_calls(relative, &masked, &lines, patterns);
    out.direct_calls = direct_calls(relative, &masked, &lines, patterns);
    out.component_routes = component_routes(relative, content, &masked, &lines);

    if let Some(route) = page_route {
        let called: Vec<String> = calls_in(&masked, 0..masked.len())
            .into_iter()
            .map(|c| c.name)
            .collect();
        let rendered = jsx_components(&masked);

        let has_role_check = called
            .iter()
            .chain(rendered.iter())
            .any(|name| config.primitives.is_client_role_check(name));
        let has_data_fetch = !out.call_sites.is_empty()
            || !out.direct_calls.is_empty()
            || called.iter().any(|name| config.primitives.is_data_fetch(name));

        out.page = Some(PageFacts {
            route,
            imports: imports(&masked),
            rendered,
            has_data_fetch,
            has_role_check,
        });
    }

    trace!(
        file = relative,
        call_sites = out.call_sites.len(),
        direct_calls = out.direct_calls.len(),
        annotations = out.component_routes.len(),
        "Extracted client file"
    );
    out
}

fn wrapper_calls(
    relative: &str,
    masked: &str,
    lines: &LineIndex,
    patterns: &ExtractPatterns,
) -> Vec<ExtractedCallSite> {
    let mut sites = Vec::new();

    for caps in patterns.wrapper_call.captures_iter(masked) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if is_declaration(masked, whole.start()) {
            continue;
        }
        let paren = whole.end() - 1;
        let line = lines.line_of(whole.start());
        let Some(args) = split_call_args(masked, paren) else {
            sites.push(ExtractedCallSite {
                verb: HttpVerb::Any,
                path: PathExpr::Unresolved("unterminated call".to_string()),
                file: relative.to_string(),
                line,
            });
            continue;
        };

        let method_verb = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<HttpVerb>().ok());

        let (verb, path) = match method_verb {
            // apiRequest.get('/path')
            Some(verb) => (verb, path_expr(masked, args.first().copied())),
            None => classify_plain_call(masked, &args),
        };

        sites.push(ExtractedCallSite {
            verb,
            path,
            file: relative.to_string(),
            line,
        });
    }

    sites
}

/// `apiRequest('GET', path)` or `apiRequest(path, { method })`.
fn classify_plain_call(masked: &str, args: &[(usize, &str)]) -> (HttpVerb, PathExpr) {
    let Some(&(first_offset, first_text)) = args.first() else {
        return (
            HttpVerb::Any,
            PathExpr::Unresolved("call without arguments".to_string()),
        );
    };

    if let Some(lit) = whole_literal(masked, first_offset, first_text) {
        if let Ok(verb) = lit.parse::<HttpVerb>()
            && !lit.contains('/')
        {
            return (verb, path_expr(masked, args.get(1).copied()));
        }
        let verb = args
            .get(1)
            .and_then(|(_, options)| METHOD_OPTION.captures(options))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<HttpVerb>().ok())
            .unwrap_or(HttpVerb::Get);
        return (verb, PathExpr::Resolved(lit));
    }

    // Dynamic first argument: a verb variable followed by a literal path is
    // still unresolvable because the verb is unknown.
    let reason = if args.len() >= 2 {
        format!("dynamic HTTP method `{}`", excerpt(first_text))
    } else {
        format!("dynamic path `{}`", excerpt(first_text))
    };
    (HttpVerb::Any, PathExpr::Unresolved(reason))
}

fn path_expr(masked: &str, arg: Option<(usize, &str)>) -> PathExpr {
    match arg {
        None => PathExpr::Unresolved("missing path argument".to_string()),
        Some((offset, text)) => match whole_literal(masked, offset, text) {
            Some(value) => PathExpr::Resolved(value),
            None => PathExpr::Unresolved(format!("dynamic path `{}`", excerpt(text))),
        },
    }
}

/// The argument's value when it is exactly one string or template literal.
fn whole_literal(masked: &str, offset: usize, text: &str) -> Option<String> {
    let lit = parse_string_literal(masked, offset)?;
    (lit.end == offset + text.len()).then_some(lit.value)
}

/// `function apiRequest(` and `.apiRequest = function(` are definitions.
fn is_declaration(masked: &str, start: usize) -> bool {
    let before = masked[..start].trim_end();
    before.ends_with("function") || before.ends_with("async")
}

fn direct_calls(
    relative: &str,
    masked: &str,
    lines: &LineIndex,
    patterns: &ExtractPatterns,
) -> Vec<ExtractedDirectCall> {
    let mut calls = Vec::new();

    for caps in DIRECT_CALL.captures_iter(masked) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        // `client.fetch(` and `function fetch(` are not the global;
        // `window.fetch(` is.
        let before = masked[..whole.start()].trim_end();
        if before.ends_with("function") {
            continue;
        }
        let receiver = match before.strip_suffix('.') {
            Some(object) => match global_receiver(object) {
                Some(global) => Some(global),
                None => continue,
            },
            None => None,
        };

        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().split_whitespace().collect::<String>())
            .unwrap_or_default();
        let callee = match receiver {
            Some(global) => format!("{global}.{name}"),
            None => name,
        };

        let call_text = call_text(masked, whole.start(), whole.end());
        let whitelisted = patterns
            .direct_call_whitelist
            .iter()
            .any(|re| re.is_match(call_text));

        calls.push(ExtractedDirectCall {
            callee,
            file: relative.to_string(),
            line: lines.line_of(whole.start()),
            whitelisted,
        });
    }

    calls
}

/// `window`, `globalThis` or `self` ending `object`, unless it is itself a
/// property access.
fn global_receiver(object: &str) -> Option<&'static str> {
    const GLOBALS: &[&str] = &["window", "globalThis", "self"];
    let object = object.trim_end();
    let global = GLOBALS.iter().find(|g| object.ends_with(**g))?;
    let rest = object[..object.len() - global.len()].trim_end();
    let bounded = rest
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'));
    bounded.then_some(*global)
}

/// Text of the call expression, through its closing parenthesis when found.
fn call_text(masked: &str, start: usize, match_end: usize) -> &str {
    let paren = match_end.saturating_sub(1);
    if masked.as_bytes().get(paren) == Some(&b'(')
        && let Some(close) = crate::parser::source::matching_delimiter(masked, paren)
    {
        return &masked[start..=close];
    }
    let end = masked[start..]
        .find('\n')
        .map(|n| start + n)
        .unwrap_or(masked.len());
    &masked[start..end]
}

fn component_routes(
    relative: &str,
    content: &str,
    masked: &str,
    lines: &LineIndex,
) -> Vec<ExtractedComponentRoute> {
    let component = primary_export(masked).unwrap_or_else(|| file_stem(relative));
    let mut routes = Vec::new();

    for caps in ROUTE_ANNOTATION.captures_iter(content) {
        let (Some(whole), Some(verb), Some(path)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        // Annotations only count inside comments, which masking blanks out.
        if masked.as_bytes().get(whole.start()) != Some(&b' ') {
            continue;
        }
        let Ok(verb) = verb.as_str().parse::<HttpVerb>() else {
            continue;
        };
        let scope = caps.get(3).and_then(|s| s.as_str().parse().ok());

        routes.push(ExtractedComponentRoute {
            verb,
            path: path.as_str().trim_end_matches([']', ',']).to_string(),
            component: component.clone(),
            scope,
            file: relative.to_string(),
            line: lines.line_of(whole.start()),
        });
    }

    routes
}

fn file_stem(relative: &str) -> String {
    Path::new(relative)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".d").to_string())
        .unwrap_or_default()
}
