//! Logging helpers that keep authored world content on a single log line.

const MAX_PREVIEW: usize = 300;

/// Escape backslashes and control characters (`\n`, `\t`, `\u{1b}`, ...) so a
/// value fits on one log line. Output past 300 characters ends in an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for ch in s.chars().take(MAX_PREVIEW) {
        if ch == '\\' || ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    if s.chars().nth(MAX_PREVIEW).is_some() {
        out.push('…');
    }
    out
}

/// Render a command parameter list as `a, b, c` for debug traces.
pub fn format_params(params: &[String]) -> String {
    params
        .iter()
        .map(|p| escape_log(p))
        .collect::<Vec<_>>()
        .join(", ")
}
