//! Placeholder path expressions: `name`, `a.b.c`, `servers[0].host`.

use opslib_json_pointer::{get, Path, PathSegment};
use serde_json::Value;

fn is_segment_char(c: char) -> bool {
    !matches!(c, '.' | '[' | ']' | '{' | '}')
}

/// Parse a path expression. Returns `None` when the expression is malformed.
pub fn parse_expression(expr: &str) -> Option<Path> {
    let expr = expr.trim();
    let mut path = Path::new();
    let mut rest = expr;
    let mut first = true;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('[') {
            let end = tail.find(']')?;
            let digits = &tail[..end];
            if first || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            path.push(PathSegment::Index(digits.parse().ok()?));
            rest = &tail[end + 1..];
        } else {
            let body = if first { rest } else { rest.strip_prefix('.')? };
            let len = body.find(|c: char| !is_segment_char(c)).unwrap_or(body.len());
            if len == 0 {
                return None;
            }
            path.push(PathSegment::Key(body[..len].to_string()));
            rest = &body[len..];
        }
        first = false;
    }
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Value at `path` in the first context that has one.
pub fn resolve<'a>(contexts: &'a [Value], path: &[PathSegment]) -> Option<&'a Value> {
    contexts.iter().find_map(|ctx| get(ctx, path))
}
