//! Markup output helpers
//!
//! Output is plain text with exactly three characters escaped
//! (`&`, `<`, `>`) and `<span class="...">` wrappers.

pub const CLOSE_SPAN: &str = "</span>";

/// Append `text` to `out`, escaping markup characters
pub fn escape_into(out: &mut String, text: &str) {
    let mut last = 0;
    for (i, ch) in text.char_indices() {
        let entity = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            _ => continue,
        };
        out.push_str(&text[last..i]);
        out.push_str(entity);
        last = i + 1;
    }
    out.push_str(&text[last..]);
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

pub fn open_span(out: &mut String, class: &str) {
    out.push_str("<span class=\"");
    out.push_str(class);
    out.push_str("\">");
}

/// Append `text` escaped and wrapped in a span
pub fn wrap_into(out: &mut String, class: &str, text: &str) {
    open_span(out, class);
    escape_into(out, text);
    out.push_str(CLOSE_SPAN);
}
