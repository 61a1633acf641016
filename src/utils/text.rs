use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Canonical form of a user-entered ticker: trimmed, upper-cased, no inner whitespace.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_uppercase())
}

/// Cut `text` so it occupies at most `width` terminal columns.
pub fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

/// Left-align `text` in a column of `width` display cells; CJK names count double.
pub fn pad_width(text: &str, width: usize) -> String {
    let fitted = fit_width(text, width);
    let padding = width.saturating_sub(fitted.width());
    format!("{}{}", fitted, " ".repeat(padding))
}
