//! Markdown to HTML rendering.

use std::sync::Arc;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::anchor::{assign_heading_ids, AnchorOptions};
use crate::highlight::{HighlightError, Highlighter};
use crate::linkify::linkify_events;

/// Options for the markdown renderer.
///
/// The defaults are the conservative ones: no raw HTML, no soft-break
/// conversion, no autolinking, no heading anchors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkdownOptions {
    /// Pass raw HTML in the source through unchanged
    pub html: bool,

    /// Render single newlines inside paragraphs as `<br />`
    pub breaks: bool,

    /// Turn bare URLs, domains and email addresses into links
    pub linkify: bool,

    /// Heading-anchor extension
    pub anchors: Option<AnchorOptions>,
}

/// Errors that can occur while rendering markdown.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// Markdown renderer.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
    highlighter: Option<Arc<Highlighter>>,
}

impl MarkdownRenderer {
    /// Create a renderer with the given options.
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            highlighter: None,
        }
    }

    /// Highlight fenced code blocks with `highlighter`.
    pub fn with_highlighter(mut self, highlighter: Arc<Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// The options this renderer was built with.
    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Render a markdown document to HTML.
    pub fn render(&self, source: &str) -> Result<String, RenderError> {
        let parser_options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        let mut events: Vec<Event> = Parser::new_ext(source, parser_options).collect();

        if !self.options.html {
            events = escape_raw_html(events);
        }

        if self.options.breaks {
            for event in events.iter_mut() {
                if matches!(event, Event::SoftBreak) {
                    *event = Event::HardBreak;
                }
            }
        }

        if self.options.linkify {
            events = linkify_events(events);
        }

        if let Some(anchors) = &self.options.anchors {
            assign_heading_ids(&mut events, anchors);
        }

        if let Some(highlighter) = &self.highlighter {
            events = highlight_code_blocks(events, highlighter)?;
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }
}

/// Render raw HTML as text, with HTML blocks becoming paragraphs.
fn escape_raw_html(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::HtmlBlock) => Event::Start(Tag::Paragraph),
            Event::End(TagEnd::HtmlBlock) => Event::End(TagEnd::Paragraph),
            other => other,
        })
        .collect()
}

/// Replace each code block with its highlighted HTML.
fn highlight_code_blocks<'a>(
    events: Vec<Event<'a>>,
    highlighter: &Highlighter,
) -> Result<Vec<Event<'a>>, HighlightError> {
    let mut out = Vec::with_capacity(events.len());
    let mut current: Option<(String, String)> = None; // (info, code)

    for event in events {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                current = Some((info, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, code)) = current.take() {
                    let html = highlighter.highlight(&code, &info)?;
                    out.push(Event::Html(CowStr::from(html)));
                }
            }
            Event::Text(text) if current.is_some() => {
                if let Some((_, code)) = current.as_mut() {
                    code.push_str(&text);
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}
