//! Frontmatter extraction and parsing.

use serde_json::{Map, Value};

/// Where a page is written, as requested by its frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Permalink {
    /// Derive the output path from the input path
    #[default]
    Default,
    /// `permalink: false`: render the page but do not write it
    Disabled,
    /// Explicit output path relative to the output directory
    Path(String),
}

/// Parsed frontmatter from a content or layout file.
///
/// The well-known keys are pulled out into typed fields; every key,
/// including the well-known ones, stays available in `data` for templates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frontmatter {
    /// Page title
    pub title: Option<String>,

    /// Layout template, resolved under the includes directory
    pub layout: Option<String>,

    /// Tags, each of which becomes a collection
    pub tags: Vec<String>,

    /// Page date as written in the file
    pub date: Option<String>,

    /// Output path override
    pub permalink: Permalink,

    /// Keep the page out of every collection
    pub exclude_from_collections: bool,

    /// All frontmatter keys
    pub data: Map<String, Value>,
}

impl Frontmatter {
    /// Build frontmatter from an already parsed key/value map.
    pub fn from_data(data: Map<String, Value>) -> Self {
        let title = data.get("title").and_then(value_to_string);
        let layout = data.get("layout").and_then(value_to_string);
        let date = data.get("date").and_then(value_to_string);

        let tags = match data.get("tags") {
            Some(Value::String(tag)) => vec![tag.clone()],
            Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
            _ => Vec::new(),
        };

        let permalink = match data.get("permalink") {
            Some(Value::Bool(false)) => Permalink::Disabled,
            Some(Value::String(path)) if !path.is_empty() => Permalink::Path(path.clone()),
            _ => Permalink::Default,
        };

        let exclude_from_collections = matches!(
            data.get("eleventyExcludeFromCollections"),
            Some(Value::Bool(true))
        );

        Self {
            title,
            layout,
            tags,
            date,
            permalink,
            exclude_from_collections,
            data,
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract frontmatter from a source file.
///
/// Returns the parsed frontmatter and the remaining content after the frontmatter block.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    // Find the closing ---
    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let data = if yaml_content.is_empty() {
        Map::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml_content)
            .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?
        {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(FrontmatterError::NotAMapping),
        }
    };

    Ok((Some(Frontmatter::from_data(data)), remaining.trim_start()))
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),

    #[error("Frontmatter must be a mapping of keys to values")]
    NotAMapping,
}
