//! Bare URL, domain and email autolinking.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;

/// Generic top-level domains plus two-letter country codes.
const TLDS: &str = concat!(
    "com|org|net|edu|gov|biz|info|pro|name|aero|asia|coop|museum|shop|web|xxx|",
    "a[cdefgilmnoqrstuwxz]|b[abdefghijmnorstvwyz]|c[acdfghiklmnoruvwxyz]|d[ejkmoz]|",
    "e[cegrstu]|f[ijkmor]|g[abdefghilmnpqrstuwy]|h[kmnrtu]|i[delmnoqrst]|j[emop]|",
    "k[eghimnprwyz]|l[abcikrstuvy]|m[acdeghklmnopqrstuvwxyz]|n[acefgilopruz]|om|",
    "p[aefghklmnrstwy]|qa|r[eosuw]|s[abcdeghijklmnortuvxyz]|t[cdfghjklmnortvwz]|",
    "u[agksyz]|v[aceginu]|w[fs]|y[et]|z[amw]",
);

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let host = format!(r"(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:{})\b", TLDS);
    Regex::new(&format!(
        r"(?i)(?P<url>\b(?:https?://|www\.)[^\s<>]+)|(?P<email>\b[a-z0-9._%+-]+@{host})|(?P<domain>\b{host}(?::\d{{1,5}})?(?:[/?#][^\s<>]*)?)",
        host = host
    ))
    .expect("link pattern is valid")
});

static HTML_LINK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<a[\s>]").expect("link open pattern is valid"));

static HTML_LINK_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^</a\s*>").expect("link close pattern is valid"));

/// Turn bare URLs, domains and email addresses in text into links.
///
/// Text inside existing links (markdown or raw `<a>` tags), images and code
/// blocks is left alone.
pub fn linkify_events<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut pending = String::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in events {
        if link_depth == 0 && !in_code_block {
            if let Event::Text(text) = &event {
                // Adjacent text events are merged so URLs split by the parser still match
                pending.push_str(text);
                continue;
            }
        }
        flush(&mut pending, &mut out);

        match &event {
            Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1)
            }
            Event::InlineHtml(raw) if HTML_LINK_OPEN.is_match(raw) => link_depth += 1,
            Event::InlineHtml(raw) if HTML_LINK_CLOSE.is_match(raw) => {
                link_depth = link_depth.saturating_sub(1)
            }
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            _ => {}
        }

        out.push(event);
    }

    flush(&mut pending, &mut out);
    out
}

fn flush<'a>(pending: &mut String, out: &mut Vec<Event<'a>>) {
    if pending.is_empty() {
        return;
    }
    let text = std::mem::take(pending);
    push_linked(&text, out);
}

/// Push `text` as events, wrapping each link it contains.
fn push_linked<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;

    for caps in LINK_PATTERN.captures_iter(text) {
        let Some(found) = caps.get(0) else {
            continue;
        };
        let start = found.start();

        let fuzzy = caps.name("url").is_none();
        if fuzzy && !fuzzy_start_allowed(&text[..start]) {
            continue;
        }

        let url = trim_trailing_punctuation(found.as_str());
        if url.is_empty() {
            continue;
        }
        let end = start + url.len();

        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }

        let (link_type, href) = if caps.name("email").is_some() {
            (LinkType::Email, url.to_string())
        } else if caps.name("domain").is_some()
            || (url.len() >= 4 && url[..4].eq_ignore_ascii_case("www."))
        {
            (LinkType::Autolink, format!("http://{}", url))
        } else {
            (LinkType::Autolink, url.to_string())
        };

        out.push(Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::from(href),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));

        last = end;
    }

    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Schemeless links must not continue a path, a host or an address.
fn fuzzy_start_allowed(before: &str) -> bool {
    !matches!(
        before.chars().last(),
        Some(c) if c.is_alphanumeric() || matches!(c, '.' | ':' | '/' | '\\' | '-' | '_' | '@')
    )
}

/// Drop sentence punctuation that follows a URL, keeping balanced parentheses.
fn trim_trailing_punctuation(url: &str) -> &str {
    let mut end = url.len();

    loop {
        let candidate = &url[..end];
        let Some(last) = candidate.chars().last() else {
            break;
        };

        let strip = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' => true,
            ')' => candidate.matches('(').count() < candidate.matches(')').count(),
            _ => false,
        };

        if !strip {
            break;
        }
        end -= last.len_utf8();
    }

    &url[..end]
}
