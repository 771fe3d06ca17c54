//! Export file naming.

/// Make a recording title safe to use as a file name stem
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, runs of `_` collapse
/// into one, and leading/trailing `_` are dropped. An empty result
/// becomes `recording`.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "recording".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<sanitized title>_<millis>.<extension>`
pub fn export_file_name(title: &str, millis: i64, extension: &str) -> String {
    format!("{}_{}.{}", sanitize_title(title), millis, extension)
}
