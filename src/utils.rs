//! String helpers shared by the pipeline stages.
//!
//! - Markdown fence stripping for model output
//! - HTML escaping for text embedded in the fallback page
//! - String truncation for logging

/// Opening fence the model tends to wrap its HTML in.
const HTML_FENCE: &str = "```html";
/// Bare fence, used for closing (and sometimes opening) a block.
const FENCE: &str = "```";

/// Strip markdown code fences from a model response and trim it.
///
/// Every occurrence of ```` ```html ```` is removed first, then every
/// remaining ```` ``` ````, wherever they appear. Text without fences is only
/// trimmed. Applying this twice gives the same result as applying it once.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_report("```html\nBODY\n```"), "BODY");
/// assert_eq!(sanitize_report("  <p>hi</p>\n"), "<p>hi</p>");
/// ```
pub fn sanitize_report(raw: &str) -> String {
    // A run of n backticks shrinks to n % 3, so no fence survives one pass.
    raw.replace(HTML_FENCE, "")
        .replace(FENCE, "")
        .trim()
        .to_string()
}

/// Escape text for use inside an HTML element.
///
/// Only `&`, `<` and `>` are replaced, so quotes in the text survive
/// verbatim. Not safe for attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary with
/// an ellipsis and the dropped byte count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
