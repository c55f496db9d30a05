//! Canonical path-template notation shared by every tier.
//!
//! Each tier spells parameters differently: handler dispatch tables and infra
//! declarations use `{name}`, client template literals produce `${expr}`, page
//! files use `[name]`, and hand-written paths sometimes use `:name`. All of them
//! are rewritten here, and only here, into the canonical tokens `{}` (one
//! segment) and `{+}` (greedy tail).

/// Canonical single-segment parameter token.
pub const PARAM: &str = "{}";
/// Canonical greedy (rest-of-path) parameter token.
pub const GREEDY: &str = "{+}";

/// Normalize a path template into its canonical form.
///
/// Total and idempotent: every input yields a canonical template and
/// `normalize(&normalize(p)) == normalize(p)`.
pub fn normalize(template: &str) -> String {
    let trimmed = template.trim();
    let without_suffix = strip_query_and_fragment(trimmed);

    let segments: Vec<String> = split_segments(without_suffix)
        .into_iter()
        .map(normalize_segment)
        .collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut out = String::with_capacity(without_suffix.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Returns true when a canonical segment is a parameter (fully or partly).
pub fn is_param_segment(segment: &str) -> bool {
    segment.contains(PARAM) || segment == GREEDY
}

/// Iterate the segments of a canonical path.
pub fn segments(canonical: &str) -> impl Iterator<Item = &str> {
    canonical.split('/').filter(|s| !s.is_empty())
}

fn strip_query_and_fragment(path: &str) -> &str {
    // A `?` or `#` inside a placeholder (`${a ? b : c}`) is not a query marker.
    let mut depth = 0usize;
    for (idx, ch) in path.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '?' | '#' if depth == 0 => return &path[..idx],
            _ => {}
        }
    }
    path
}

/// Split on `/` outside of placeholders, dropping empty segments.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in path.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if idx > start {
                    segments.push(&path[start..idx]);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < path.len() {
        segments.push(&path[start..]);
    }
    segments
}

fn normalize_segment(segment: &str) -> String {
    if segment == "*" || segment == GREEDY {
        return GREEDY.to_string();
    }
    if let Some(inner) = segment.strip_prefix(':')
        && is_identifier(inner)
    {
        return PARAM.to_string();
    }
    if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>'))
        && is_identifier(inner)
    {
        return PARAM.to_string();
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if let Some(rest) = inner.strip_prefix("...")
            && is_identifier(rest)
        {
            return GREEDY.to_string();
        }
        if is_identifier(inner) {
            return PARAM.to_string();
        }
    }
    if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
        && !inner.contains('{')
        && !inner.contains('}')
        && let Some(name) = inner.strip_suffix('+')
        && (name.is_empty() || is_identifier(name))
    {
        return GREEDY.to_string();
    }

    replace_placeholders(segment)
}

/// Replace every `{..}` / `${..}` placeholder inside a segment with `{}`,
/// keeping literal text around it.
fn replace_placeholders(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let opens_template = chars[i] == '$' && chars.get(i + 1) == Some(&'{');
        if chars[i] == '{' || opens_template {
            let open = if opens_template { i + 1 } else { i };
            if let Some(close) = matching_brace(&chars, open) {
                out.push_str(PARAM);
                i = close + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in chars[open..].iter().enumerate() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curly_params() {
        assert_eq!(normalize("/chats/{sessionId}"), "/chats/{}");
        assert_eq!(normalize("/orgs/{orgId}/files/{fileId}"), "/orgs/{}/files/{}");
    }

    #[test]
    fn test_template_literal_params() {
        assert_eq!(normalize("/chats/${id}"), "/chats/{}");
        assert_eq!(normalize("/chats/${chat.id}/messages"), "/chats/{}/messages");
    }

    #[test]
    fn test_template_expression_with_slash() {
        assert_eq!(normalize("/files/${a / b}"), "/files/{}");
    }

    #[test]
    fn test_colon_bracket_angle_params() {
        assert_eq!(normalize("/users/:userId"), "/users/{}");
        assert_eq!(normalize("/users/[userId]"), "/users/{}");
        assert_eq!(normalize("/users/<userId>"), "/users/{}");
    }

    #[test]
    fn test_greedy_params() {
        assert_eq!(normalize("/files/{proxy+}"), "/files/{+}");
        assert_eq!(normalize("/docs/[...slug]"), "/docs/{+}");
        assert_eq!(normalize("/assets/*"), "/assets/{+}");
    }

    #[test]
    fn test_mixed_segment_keeps_literal() {
        assert_eq!(normalize("/exports/${id}.json"), "/exports/{}.json");
        assert_eq!(normalize("/exports/{id}.json"), "/exports/{}.json");
    }

    #[test]
    fn test_slashes_query_and_fragment() {
        assert_eq!(normalize("widgets//list/"), "/widgets/list");
        assert_eq!(normalize("/widgets?limit=10"), "/widgets");
        assert_eq!(normalize("/widgets#top"), "/widgets");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn test_literals_are_case_sensitive() {
        assert_ne!(normalize("/Widgets"), normalize("/widgets"));
    }

    #[test]
    fn test_idempotent_over_samples() {
        let samples = [
            "/chats/{sessionId}",
            "/chats/${id}",
            "/a/:b/[c]/<d>/{e+}/[...f]/*",
            "/exports/${id}.json?x=1",
            "//weird//{}//{+}/",
            "/files/${a ? '/x' : '/y'}",
            "relative/path",
            "/{unterminated",
            "/$",
            "/${}",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample}");
        }
    }

    #[test]
    fn test_is_param_segment() {
        assert!(is_param_segment("{}"));
        assert!(is_param_segment("{+}"));
        assert!(is_param_segment("{}.json"));
        assert!(!is_param_segment("widgets"));
    }
}
