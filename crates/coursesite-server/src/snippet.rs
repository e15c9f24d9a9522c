//! HTML response rewriting.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"<body\b[^>]*>")
        .case_insensitive(true)
        .build()
        .expect("body pattern is valid")
});

/// Where a snippet goes relative to the matched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Inserts a snippet next to the first match of a pattern.
#[derive(Debug, Clone)]
pub struct SnippetRule {
    pattern: Regex,
    snippet: String,
    placement: Placement,
}

impl SnippetRule {
    /// Create a rule from a regular expression.
    pub fn new(
        pattern: &str,
        snippet: impl Into<String>,
        placement: Placement,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            snippet: snippet.into(),
            placement,
        })
    }

    /// Insert `snippet` in front of the first match of `pattern`.
    pub fn before(pattern: &str, snippet: impl Into<String>) -> Result<Self, regex::Error> {
        Self::new(pattern, snippet, Placement::Before)
    }

    /// Insert `snippet` after the first match of `pattern`.
    pub fn after(pattern: &str, snippet: impl Into<String>) -> Result<Self, regex::Error> {
        Self::new(pattern, snippet, Placement::After)
    }

    /// The pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The inserted text.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// Rewrite `html`. Without a match the input is returned unchanged.
    pub fn rewrite(&self, html: &str) -> String {
        let Some(found) = self.pattern.find(html) else {
            return html.to_string();
        };

        let at = match self.placement {
            Placement::Before => found.start(),
            Placement::After => found.end(),
        };

        let mut out = String::with_capacity(html.len() + self.snippet.len());
        out.push_str(&html[..at]);
        out.push_str(&self.snippet);
        out.push_str(&html[at..]);
        out
    }
}

/// Apply `rules` in order.
pub fn apply_snippet_rules(html: &str, rules: &[SnippetRule]) -> String {
    rules
        .iter()
        .fold(html.to_string(), |html, rule| rule.rewrite(&html))
}

/// Insert the reload client right after the opening `<body>` tag.
///
/// Documents without a `<body>` tag get the client appended.
pub fn inject_client(html: &str, script: &str) -> String {
    let tag = format!("<script>{}</script>", script);

    match BODY_OPEN.find(html) {
        Some(found) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..found.end()]);
            out.push_str(&tag);
            out.push_str(&html[found.end()..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BLOCKER: &str = "<script>blocked()</script>";

    fn body_rule() -> SnippetRule {
        SnippetRule::before("(?i)</body>", BLOCKER).unwrap()
    }

    #[test]
    fn inserts_before_closing_body() {
        let html = "<html><body><p>Hi</p></body></html>";

        assert_eq!(
            body_rule().rewrite(html),
            "<html><body><p>Hi</p><script>blocked()</script></body></html>"
        );
    }

    #[test]
    fn matches_case_insensitively() {
        let html = "<BODY>x</BODY>";
        assert_eq!(body_rule().rewrite(html), "<BODY>x<script>blocked()</script></BODY>");
    }

    #[test]
    fn leaves_documents_without_match_unchanged() {
        let html = "<p>fragment</p>";
        assert_eq!(body_rule().rewrite(html), html);
    }

    #[test]
    fn rewrites_first_match_only() {
        let html = "<body>a</body><body>b</body>";
        assert_eq!(
            body_rule().rewrite(html),
            "<body>a<script>blocked()</script></body><body>b</body>"
        );
    }

    #[test]
    fn inserts_after_match() {
        let rule = SnippetRule::after("(?i)<head>", "<meta name=x>").unwrap();
        assert_eq!(rule.rewrite("<head></head>"), "<head><meta name=x></head>");
    }

    #[test]
    fn applies_rules_in_order() {
        let rules = vec![
            SnippetRule::before("</body>", "1").unwrap(),
            SnippetRule::before("</body>", "2").unwrap(),
        ];
        assert_eq!(apply_snippet_rules("<body></body>", &rules), "<body>12</body>");
    }

    #[test]
    fn injects_client_after_body_tag() {
        let html = r#"<html><body class="x"><p>Hi</p></body></html>"#;

        assert_eq!(
            inject_client(html, "client()"),
            r#"<html><body class="x"><script>client()</script><p>Hi</p></body></html>"#
        );
    }

    #[test]
    fn client_runs_before_blocker() {
        let html = inject_client("<body><p>Hi</p></body>", "client()");
        let html = apply_snippet_rules(&html, &[body_rule()]);

        let client = html.find("client()").unwrap();
        let blocker = html.find("blocked()").unwrap();
        assert!(client < blocker);
    }

    #[test]
    fn appends_client_without_body() {
        assert_eq!(inject_client("<p>x</p>", "c()"), "<p>x</p><script>c()</script>");
    }
}
