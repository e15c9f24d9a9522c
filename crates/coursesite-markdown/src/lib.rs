//! Markdown library for coursesite.
//!
//! Parses YAML frontmatter and renders markdown to HTML with the options the
//! site needs: raw HTML passthrough, soft breaks as `<br />`, bare URL
//! autolinking, heading anchors and syntax-highlighted code blocks.

pub mod anchor;
pub mod frontmatter;
pub mod highlight;
pub mod linkify;
pub mod render;

pub use anchor::{slugify, AnchorOptions};
pub use frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError, Permalink};
pub use highlight::{HighlightError, HighlightOptions, Highlighter};
pub use render::{MarkdownOptions, MarkdownRenderer, RenderError};
