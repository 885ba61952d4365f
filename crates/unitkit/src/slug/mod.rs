//! Identifier normalisation.
//!
//! Operation and unit ids are derived from human-readable names exactly once,
//! at registration. Lookups never normalise, so the host must send the slug.

/// Converts a display name into a slug.
///
/// The name is lowercased, spaces become hyphens, and every character other
/// than an ASCII lowercase letter, digit or hyphen is dropped.
///
/// # Example
///
/// ```
/// use unitkit::slug::slugify;
///
/// assert_eq!(slugify("Read File"), "read-file");
/// assert_eq!(slugify("Ping! (v2)"), "ping-v2");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Returns `true` when `id` is already in slug form.
#[must_use]
pub fn is_slug(id: &str) -> bool {
    id.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
