// src/sanitize.rs
//
// Value sanitization for accepted field input, plus the escaping applied to
// anything the validator echoes back in messages.

use html_escape::encode_text;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::patterns::{
    DANGEROUS_ELEMENTS, DANGEROUS_TAG_FRAGMENTS, EVENT_HANDLER_ATTRIBUTES, SCRIPT_SCHEMES,
};

/// Characters of user input echoed back in a message preview
pub const PREVIEW_CHARS: usize = 4;

static ABSOLUTE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(/[a-zA-Z0-9_\-\.]+)+").unwrap_or_else(|e| panic!("path pattern is invalid: {e}"))
});

/// Neutralizes dangerous constructs in a field value
///
/// Applies, until nothing changes:
/// - Removal of control characters other than newline and tab
/// - Removal of complete `<script>`, `<iframe>` and `<object>` elements, then
///   of any unpaired fragments of those tags
/// - Removal of `on*=` handler attributes with their value
/// - Removal of `javascript:` / `vbscript:` schemes
/// - Trimming of surrounding whitespace
///
/// Iterating to a fixed point makes the function idempotent: removing one
/// construct cannot reassemble another that survives the result.
///
/// # Arguments
/// * `value` - Raw field value
///
/// # Returns
/// * `String` - Sanitized value
///
/// # Examples
///
/// ```
/// use cardguard::sanitize::sanitize_value;
///
/// assert_eq!(sanitize_value("  hello<script>alert(1)</script> "), "hello");
/// ```
pub fn sanitize_value(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(value: &str) -> String {
    let mut out = strip_control(value);

    for element in DANGEROUS_ELEMENTS.iter() {
        out = element.replace_all(&out, "").into_owned();
    }
    out = DANGEROUS_TAG_FRAGMENTS.replace_all(&out, "").into_owned();
    out = EVENT_HANDLER_ATTRIBUTES.replace_all(&out, "").into_owned();
    out = SCRIPT_SCHEMES.replace_all(&out, "").into_owned();

    out.trim().to_string()
}

fn strip_control(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Short, HTML-escaped preview of user input for error messages
///
/// Only the first few characters are kept; the remainder is replaced by a
/// fixed marker so that messages never carry the full payload.
pub fn preview(value: &str) -> String {
    let head: String = strip_control(value).chars().take(PREVIEW_CHARS).collect();
    format!("{}…", encode_text(&head))
}

/// Sanitizes internal error text before it is exposed in a result
///
/// Control characters are dropped, HTML is escaped and absolute paths are
/// replaced with `[REDACTED_PATH]`.
///
/// # Arguments
/// * `error` - Error message to sanitize
///
/// # Returns
/// * `String` - Sanitized error message
pub fn sanitize_error(error: &str) -> String {
    let filtered = error.replace(|c: char| c.is_control(), "");
    let escaped = encode_text(&filtered).to_string();
    ABSOLUTE_PATH
        .replace_all(&escaped, "[REDACTED_PATH]")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_text() {
        assert_eq!(sanitize_value("新宿駅で紛失"), "新宿駅で紛失");
        assert_eq!(sanitize_value("  padded  "), "padded");
        assert_eq!(sanitize_value("line one\nline two"), "line one\nline two");
        assert_eq!(sanitize_value("bell\u{7}char\r"), "bellchar");
    }

    #[test]
    fn test_sanitize_removes_elements() {
        assert_eq!(sanitize_value("a<script>alert(1)</script>b"), "ab");
        assert_eq!(sanitize_value("a<IFRAME src=x></iframe>b"), "ab");
        assert_eq!(sanitize_value("a<object data=x>payload</object>b"), "ab");
        assert_eq!(sanitize_value("<script src=x>"), "");
    }

    #[test]
    fn test_sanitize_reassembled_payloads() {
        let out = sanitize_value("<scr<script>x</script>ipt>alert(1)</script>");
        assert!(!out.to_lowercase().contains("<script"));

        let out = sanitize_value("javajavascript:script:alert(1)");
        assert!(!out.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn test_sanitize_handlers_and_schemes() {
        assert_eq!(sanitize_value(r#"<img src=x onerror="alert(1)">"#), "<img src=x >");
        assert_eq!(sanitize_value("<body onload=init()>"), "<body >");
        assert_eq!(sanitize_value("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_value("VBScript:msgbox"), "msgbox");
        assert_eq!(sanitize_value("java\tscript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_value("jav\na\tscript:go()"), "go()");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "plain",
            " <script>x</script> trailing ",
            "<a href='javascript:go()' onclick='x()'>link</a>",
            "\u{1}\u{2}  spaced\t",
            "<scr<script>x</script>ipt>",
        ];
        for input in inputs {
            let once = sanitize_value(input);
            assert_eq!(sanitize_value(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("<script>alert(1)</script>"), "&lt;scr…");
        assert_eq!(preview("ab"), "ab…");
    }

    #[test]
    fn test_sanitize_error() {
        assert_eq!(
            sanitize_error("Error at /home/user/projects/cardguard/src/file.rs"),
            "Error at [REDACTED_PATH]"
        );
        assert_eq!(sanitize_error("bad <input>\n"), "bad &lt;input&gt;");
    }
}
