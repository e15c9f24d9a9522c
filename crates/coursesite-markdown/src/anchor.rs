//! Heading anchors.
//!
//! Gives every heading an `id` derived from its text so pages can link to
//! sections directly.

use std::collections::HashSet;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};

/// Options for the heading-anchor extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnchorOptions {
    /// Append a self-link with this symbol to each heading
    pub permalink_symbol: Option<String>,
}

/// Assign ids to all headings in an event stream.
///
/// Ids are unique within the document: repeated slugs get `-1`, `-2`, ...
/// appended in order of appearance.
pub fn assign_heading_ids(events: &mut Vec<Event<'_>>, options: &AnchorOptions) {
    let mut used = HashSet::new();
    let mut i = 0;

    while i < events.len() {
        let has_id = match &events[i] {
            Event::Start(Tag::Heading { id, .. }) => id.is_some(),
            _ => {
                i += 1;
                continue;
            }
        };

        // Gather heading text up to the matching end
        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() {
            match &events[end] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
            end += 1;
        }

        let slug = unique_slug(&slugify(&text), &mut used);

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            if !has_id {
                *id = Some(CowStr::from(slug.clone()));
            }
        }

        if let Some(symbol) = &options.permalink_symbol {
            if end < events.len() {
                let link = format!(
                    r##" <a class="header-anchor" href="#{}" aria-hidden="true">{}</a>"##,
                    slug, symbol
                );
                events.insert(end, Event::InlineHtml(CowStr::from(link)));
                end += 1;
            }
        }

        i = end + 1;
    }
}

fn unique_slug(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };

    let mut candidate = base.to_string();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }

    used.insert(candidate.clone());
    candidate
}

/// Characters left as-is in slugs, matching `encodeURIComponent`.
const SLUG_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Convert a heading to a slug.
///
/// The text is trimmed and lowercased, whitespace runs become `-` and
/// everything outside the URI-safe set is percent-encoded.
pub fn slugify(text: &str) -> String {
    let joined = text
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    utf8_percent_encode(&joined, SLUG_SAFE).to_string()
}
