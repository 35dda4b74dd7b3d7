//! Free-text sanitization applied to lines before validation.

use super::types::AccountingLine;

/// Escapes HTML-significant characters and trims surrounding whitespace.
///
/// `<`, `>`, `"` and `'` become `&lt;`, `&gt;`, `&quot;` and `&#39;`.
#[must_use]
pub fn no_html(text: &str) -> String {
    let trimmed = text.trim();
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Sanitizes the free-text fields of a line in place.
///
/// Concept, tax id and document are escaped; sub-account and counterpart
/// codes are trimmed.
pub fn sanitize_line(line: &mut AccountingLine) {
    line.concept = no_html(&line.concept);
    line.tax_id = line.tax_id.as_deref().map(no_html);
    line.document = line.document.as_deref().map(no_html);
    line.subaccount_code = line.subaccount_code.trim().to_string();
    line.counterpart_code = line
        .counterpart_code
        .as_deref()
        .map(|code| code.trim().to_string());
}
