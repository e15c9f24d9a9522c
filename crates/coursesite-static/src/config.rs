//! Site configuration and the registration handle that produces it.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use coursesite_markdown::{HighlightOptions, MarkdownOptions};
use minijinja::Value;

use crate::collections::{CollectionApi, CollectionItem};
use crate::glob::{Glob, GlobError};

/// A template language the builder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    /// Markdown (`.md`)
    Md,
    /// Nunjucks-style templates (`.njk`), rendered with minijinja
    Njk,
    /// Plain HTML (`.html`)
    Html,
}

impl TemplateFormat {
    /// Format for a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "md" => Some(Self::Md),
            "njk" => Some(Self::Njk),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Njk => "njk",
            Self::Html => "html",
        }
    }
}

/// Directory layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirConfig {
    /// Content directory
    pub input: PathBuf,

    /// Output directory
    pub output: PathBuf,

    /// Includes and layouts, relative to `input`
    pub includes: PathBuf,

    /// Global data files, relative to `input`
    pub data: PathBuf,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("_site"),
            includes: PathBuf::from("_includes"),
            data: PathBuf::from("_data"),
        }
    }
}

impl DirConfig {
    /// Includes directory relative to the project root.
    pub fn includes_dir(&self) -> PathBuf {
        normalize(&self.input.join(&self.includes))
    }

    /// Data directory relative to the project root.
    pub fn data_dir(&self) -> PathBuf {
        normalize(&self.input.join(&self.data))
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Files copied unchanged into the output directory.
#[derive(Debug, Clone)]
pub struct PassthroughRule {
    pub glob: Glob,
}

/// Selects the items of a named collection.
pub type CollectionSelector =
    Arc<dyn Fn(&CollectionApi<'_>) -> Result<Vec<CollectionItem>, GlobError> + Send + Sync>;

/// A named collection.
#[derive(Clone)]
pub struct CollectionDef {
    pub name: String,
    pub selector: CollectionSelector,
}

impl fmt::Debug for CollectionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A template filter function.
pub type FilterFn = fn(Value) -> String;

/// A named template filter.
#[derive(Debug, Clone)]
pub struct FilterDef {
    pub name: String,
    pub func: FilterFn,
}

/// Build plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plugin {
    /// Syntax highlighting for fenced code blocks
    SyntaxHighlight(HighlightOptions),
}

/// Directory layout and template engine assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub dir: DirConfig,

    /// Extensions treated as pages
    pub template_formats: Vec<TemplateFormat>,

    /// Engine that preprocesses markdown before it is rendered
    pub markdown_template_engine: Option<TemplateFormat>,

    /// Engine that renders `.html` pages
    pub html_template_engine: Option<TemplateFormat>,

    /// Engine that renders templated frontmatter values such as `permalink`
    pub data_template_engine: Option<TemplateFormat>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            dir: DirConfig::default(),
            template_formats: vec![TemplateFormat::Md, TemplateFormat::Njk, TemplateFormat::Html],
            markdown_template_engine: Some(TemplateFormat::Njk),
            html_template_engine: Some(TemplateFormat::Njk),
            data_template_engine: Some(TemplateFormat::Njk),
        }
    }
}

/// Complete, immutable site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub settings: SiteSettings,
    pub passthrough: Vec<PassthroughRule>,
    pub collections: Vec<CollectionDef>,
    pub filters: Vec<FilterDef>,
    pub markdown: MarkdownOptions,
    pub plugins: Vec<Plugin>,
    pub global_data: serde_json::Map<String, serde_json::Value>,
}

impl SiteConfig {
    /// Directory layout.
    pub fn dir(&self) -> &DirConfig {
        &self.settings.dir
    }

    /// Whether files with `format` are treated as pages.
    pub fn accepts(&self, format: TemplateFormat) -> bool {
        self.settings.template_formats.contains(&format)
    }

    /// Options of the syntax-highlight plugin, if registered.
    pub fn highlight_options(&self) -> Option<&HighlightOptions> {
        self.plugins.iter().find_map(|plugin| match plugin {
            Plugin::SyntaxHighlight(options) => Some(options),
        })
    }
}

/// Errors in the site configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid passthrough copy pattern: {0}")]
    Passthrough(#[source] GlobError),

    #[error("No template formats configured")]
    NoTemplateFormats,

    #[error("{0:?} cannot be used as a template engine, only Njk renders templates")]
    UnsupportedEngine(TemplateFormat),
}

/// Registration handle used to declare a site's customisations.
///
/// Registrations are collected and validated once by [`ConfigBuilder::finish`],
/// which yields the immutable [`SiteConfig`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    passthrough: Vec<String>,
    collections: Vec<CollectionDef>,
    filters: Vec<FilterDef>,
    markdown: Option<MarkdownOptions>,
    plugins: Vec<Plugin>,
    global_data: serde_json::Map<String, serde_json::Value>,
}

impl ConfigBuilder {
    /// Create an empty registration handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy files matching `pattern` into the output directory unchanged.
    pub fn add_passthrough_copy(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.passthrough.push(pattern.into());
        self
    }

    /// Register a named collection. A later registration with the same name wins.
    pub fn add_collection<F>(&mut self, name: impl Into<String>, selector: F) -> &mut Self
    where
        F: Fn(&CollectionApi<'_>) -> Result<Vec<CollectionItem>, GlobError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.collections.retain(|c| c.name != name);
        self.collections.push(CollectionDef {
            name,
            selector: Arc::new(selector),
        });
        self
    }

    /// Register a template filter. A later registration with the same name wins.
    pub fn add_filter(&mut self, name: impl Into<String>, func: FilterFn) -> &mut Self {
        let name = name.into();
        self.filters.retain(|f| f.name != name);
        self.filters.push(FilterDef { name, func });
        self
    }

    /// Replace the markdown renderer options.
    pub fn set_markdown_library(&mut self, options: MarkdownOptions) -> &mut Self {
        self.markdown = Some(options);
        self
    }

    /// Install a build plugin.
    pub fn add_plugin(&mut self, plugin: Plugin) -> &mut Self {
        self.plugins.retain(|p| p != &plugin);
        self.plugins.push(plugin);
        self
    }

    /// Make `value` available to every template as `key`.
    pub fn add_global_data(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> &mut Self {
        self.global_data.insert(key.into(), value);
        self
    }

    /// Validate the registrations and produce the final configuration.
    pub fn finish(self, settings: SiteSettings) -> Result<SiteConfig, ConfigError> {
        if settings.template_formats.is_empty() {
            return Err(ConfigError::NoTemplateFormats);
        }

        for engine in [
            settings.markdown_template_engine,
            settings.html_template_engine,
            settings.data_template_engine,
        ]
        .into_iter()
        .flatten()
        {
            if engine != TemplateFormat::Njk {
                return Err(ConfigError::UnsupportedEngine(engine));
            }
        }

        let passthrough = self
            .passthrough
            .iter()
            .map(|pattern| {
                Glob::new(pattern)
                    .map(|glob| PassthroughRule { glob })
                    .map_err(ConfigError::Passthrough)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SiteConfig {
            settings,
            passthrough,
            collections: self.collections,
            filters: self.filters,
            markdown: self.markdown.unwrap_or_default(),
            plugins: self.plugins,
            global_data: self.global_data,
        })
    }
}
