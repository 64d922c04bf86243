//! Scalar-to-SQL-literal quoting.
//!
//! All query text in this crate is assembled as plain SQL; values are quoted
//! into the text rather than bound as parameters.

/// Quote `text` as a SQL string literal, doubling embedded single quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Quote an optional raw column value; `None` (SQL NULL) quotes as `''`,
/// matching the raw driver's empty-text rendering of NULL.
#[must_use]
pub fn quote_opt(raw: Option<&str>) -> String {
    quote(raw.unwrap_or(""))
}
