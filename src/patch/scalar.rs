//! Scalar rendering.
//!
//! # Responsibilities
//! - Keep the quoting style of the value being replaced
//! - Fall back to double quotes when a plain scalar would change meaning
//!
//! # Design Decisions
//! - A value that YAML would resolve to a number, bool or null is quoted,
//!   so `tag: 1234567` never turns a commit hash into an integer
//! - Rendering is a pure function of (value, style): patching twice with
//!   the same value gives the same bytes

use crate::patch::types::PatchError;

/// Quoting style of a single-line scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

/// Reject values YAML cannot carry in a scalar.
pub fn check_value(value: &str) -> Result<(), PatchError> {
    match value
        .chars()
        .find(|c| c.is_control() && *c != '\t' && *c != '\n')
    {
        Some(c) => Err(PatchError::InvalidValue(format!(
            "control character U+{:04X}",
            c as u32
        ))),
        None => Ok(()),
    }
}

/// Render `value` as a scalar, preferring `style`.
pub fn render(value: &str, style: ScalarStyle) -> String {
    match style {
        ScalarStyle::Plain if is_plain_safe(value) => value.to_owned(),
        ScalarStyle::SingleQuoted if !value.contains(['\n', '\t']) => {
            format!("'{}'", value.replace('\'', "''"))
        }
        _ => double_quoted(value),
    }
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// True when `value` can be written unquoted and still reads back as the
/// same string.
pub fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };

    if value.trim() != value || value.contains(['\n', '\t']) {
        return false;
    }
    if "[]{},#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        let rest = &value[1..];
        if rest.is_empty() || rest.starts_with(' ') {
            return false;
        }
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    if value == "---" || value == "..." {
        return false;
    }

    !resolves_to_non_string(value)
}

/// YAML 1.1/1.2 core schema values that a plain scalar would not keep as a
/// string.
fn resolves_to_non_string(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "~" | "null" | "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n"
    ) {
        return true;
    }
    if matches!(lower.as_str(), ".inf" | "+.inf" | "-.inf" | ".nan") {
        return true;
    }
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return true;
    }

    let digits = value.trim_start_matches(['+', '-']);
    let numeric = !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_' | '+' | '-'))
        && digits.chars().any(|c| c.is_ascii_digit());
    numeric || value.parse::<f64>().is_ok()
}
