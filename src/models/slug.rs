//! URL-safe identifiers derived from a wine's name and vintage.

use std::fmt::Display;

/// Characters replaced by a hyphen, in addition to any whitespace.
const SEPARATORS: &[char] = &[
    '&', '/', '\\', '#', ',', '+', '(', ')', '$', '~', '%', '.', '\'', '"', ':', '*', '?', '<',
    '>', '{', '}',
];

/// Build the slug for `name` and `vintage`.
///
/// The two parts are joined with `-` and lowercased, every whitespace or separator
/// character becomes `-`, runs of hyphens collapse to one and leading/trailing
/// hyphens are stripped. Nothing else is touched: accented letters and
/// punctuation outside the separator set survive as-is.
pub fn derive_slug(name: &str, vintage: impl Display) -> String {
    let raw = format!("{}-{}", name, vintage).to_lowercase();

    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_whitespace() || SEPARATORS.contains(&c) {
            '-'
        } else {
            c
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}
