//! Decorative cards shown by hosts alongside a compound unit's actions.

use serde::{Deserialize, Serialize};

/// A pre-rendered HTML fragment listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Card id, unique within the unit by convention.
    pub id: String,
    /// HTML fragment inserted by the host as-is.
    pub html: String,
}

impl Card {
    /// Wraps an already rendered fragment.
    #[must_use]
    pub fn custom(id: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            html: html.into(),
        }
    }

    /// Renders the default card layout, a link to `href` showing the unit
    /// name, a title and a description.
    ///
    /// ```
    /// use unitkit::Card;
    ///
    /// let card = Card::linked("open", "Files", "Open <files>", "", "/extension/action/files/open");
    /// assert!(card.html.starts_with("<a href=\"/extension/action/files/open\" class=\"card\">"));
    /// assert!(card.html.contains("Open &lt;files&gt;"));
    /// ```
    #[must_use]
    pub fn linked(
        id: impl Into<String>,
        unit_name: &str,
        title: &str,
        description: &str,
        href: &str,
    ) -> Self {
        let html = format!(
            concat!(
                "<a href=\"{href}\" class=\"card\">",
                "<div class=\"card__header\">",
                "<div class=\"card__extension-name\">{unit}</div>",
                "</div>",
                "<div class=\"card__title\">{title}</div>",
                "<div class=\"card__description\">{description}</div>",
                "</a>",
            ),
            href = escape(href),
            unit = escape(unit_name),
            title = escape(title),
            description = escape(description),
        );
        Self::custom(id, html)
    }

    /// Prepends a `<style>` element holding `css`, inserted verbatim. An
    /// empty stylesheet leaves the card unchanged.
    #[must_use]
    pub fn with_style(mut self, css: &str) -> Self {
        if !css.is_empty() {
            self.html = format!("<style>{css}</style>{}", self.html);
        }
        self
    }
}

/// Escapes text for use in HTML content and double-quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
