//! Infra tier: serverless function declarations.

use super::{ExtractedAsyncTrigger, ExtractedInfraRoute, ScanError, ScannedFile, Tier};
use crate::parser::LineIndex;
use crate::routes::HttpVerb;
use serde_yaml::Value;
use tracing::{debug, trace};

const ASYNC_EVENTS: &[&str] = &["sqs", "sns", "schedule", "eventBridge", "stream"];

/// Extract HTTP routes and async triggers from one declaration file.
///
/// Files without a top-level `functions:` map yield nothing. Malformed YAML is
/// a scan warning. A function that serves any HTTP event is not recorded as an
/// async trigger, even when it also consumes a queue or schedule.
pub fn extract(relative: &str, content: &str, infra_dir: &str) -> ScannedFile {
    let mut out = ScannedFile::new(relative, Tier::Infra);

    let doc: Value = match serde_yaml::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            let error = ScanError::Yaml {
                path: relative.to_string(),
                message: e.to_string(),
            };
            debug!(file = relative, error = %e, "Malformed infra YAML");
            out.warnings.push((&error).into());
            return out;
        }
    };

    let Some(functions) = doc.get("functions").and_then(Value::as_mapping) else {
        return out;
    };

    let locator = Locator::new(content);
    let functions_line = locator.key_line("functions", 1).unwrap_or(1);

    for (name, def) in functions {
        let Some(name) = name.as_str() else {
            continue;
        };
        let target_ref = def
            .get("handler")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        let fn_line = locator
            .key_line(name, functions_line + 1)
            .unwrap_or(functions_line);
        let mut cursor = fn_line;
        let mut serves_http = false;
        let mut consumes_async = false;

        let events = def
            .get("events")
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for event in events {
            let Some(event_map) = event.as_mapping() else {
                continue;
            };
            for (kind, spec) in event_map {
                let Some(kind) = kind.as_str() else {
                    continue;
                };
                match kind {
                    "httpApi" | "http" => {
                        serves_http = true;
                        match http_event(spec, kind == "httpApi") {
                            Ok((verb, path, is_public)) => {
                                let line = locator.text_line(&path, cursor).unwrap_or(fn_line);
                                cursor = line + 1;
                                out.infra_routes.push(ExtractedInfraRoute {
                                    verb,
                                    path,
                                    target_ref: target_ref.clone(),
                                    is_public,
                                    file: relative.to_string(),
                                    line,
                                });
                            }
                            Err(message) => {
                                let error = ScanError::Declaration {
                                    path: relative.to_string(),
                                    line: fn_line,
                                    message,
                                };
                                out.warnings.push((&error).into());
                            }
                        }
                    }
                    k if ASYNC_EVENTS.contains(&k) => consumes_async = true,
                    _ => {}
                }
            }
        }

        if consumes_async {
            if serves_http {
                debug!(
                    file = relative,
                    function = name,
                    "Function serves HTTP and async events; not exempt"
                );
                continue;
            }
            let trigger = ExtractedAsyncTrigger::new(target_ref, relative, infra_dir);
            if !out.async_triggers.contains(&trigger) {
                out.async_triggers.push(trigger);
            }
        }
    }

    trace!(
        file = relative,
        routes = out.infra_routes.len(),
        triggers = out.async_triggers.len(),
        "Extracted infra file"
    );
    out
}

/// `(verb, raw path, is_public)` of an `httpApi` or `http` event.
fn http_event(spec: &Value, http_api: bool) -> Result<(HttpVerb, String, bool), String> {
    match spec {
        // httpApi: 'GET /path' | '*'    http: 'get path'
        Value::String(s) => {
            let s = s.trim();
            if s == "*" {
                return Ok((HttpVerb::Any, "*".to_string(), false));
            }
            let (verb, path) = s
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("expected 'METHOD /path', got '{s}'"))?;
            Ok((parse_verb(verb)?, leading_slash(path.trim()), false))
        }
        Value::Mapping(_) => {
            let verb = match spec.get("method").and_then(Value::as_str) {
                Some(m) => parse_verb(m)?,
                None if http_api => HttpVerb::Any,
                None => return Err("http event without method".to_string()),
            };
            let path = spec
                .get("path")
                .and_then(Value::as_str)
                .map(|p| leading_slash(p.trim()))
                .ok_or_else(|| "http event without path".to_string())?;
            Ok((verb, path, is_public(spec)))
        }
        _ => Err("unsupported http event shape".to_string()),
    }
}

fn parse_verb(verb: &str) -> Result<HttpVerb, String> {
    verb.parse::<HttpVerb>()
}

fn leading_slash(path: &str) -> String {
    if path.starts_with('/') || path == "*" {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn is_public(spec: &Value) -> bool {
    let explicit = spec.get("public").and_then(Value::as_bool).unwrap_or(false);
    let no_authorizer = spec
        .get("authorizer")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("none"));
    explicit || no_authorizer
}

/// Best-effort line lookup; serde_yaml keeps no spans.
struct Locator<'a> {
    content: &'a str,
    lines: LineIndex,
}

impl<'a> Locator<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            lines: LineIndex::new(content),
        }
    }

    fn offset_of_line(&self, line: usize) -> usize {
        self.content
            .split_inclusive('\n')
            .take(line.saturating_sub(1))
            .map(str::len)
            .sum()
    }

    /// Line of `key:` (indented, not a comment) at or after `from_line`.
    fn key_line(&self, key: &str, from_line: usize) -> Option<usize> {
        let start = self.offset_of_line(from_line.max(1));
        let mut offset = start;
        for line in self.content[start..].split_inclusive('\n') {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix(key)
                && rest.trim_start().starts_with(':')
            {
                return Some(self.lines.line_of(offset));
            }
            offset += line.len();
        }
        None
    }

    /// First line at or after `from_line` containing `needle`.
    fn text_line(&self, needle: &str, from_line: usize) -> Option<usize> {
        let needle = needle.trim_start_matches('/');
        if needle.is_empty() {
            return None;
        }
        let start = self.offset_of_line(from_line.max(1));
        self.content[start..]
            .find(needle)
            .map(|n| self.lines.line_of(start + n))
    }
}
