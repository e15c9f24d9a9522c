//! Static site builder.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde_json::{json, Map, Value};
use walkdir::{DirEntry, WalkDir};

use coursesite_markdown::{
    extract_frontmatter, Frontmatter, HighlightError, Highlighter, MarkdownRenderer, Permalink,
};

use crate::assets::AssetPipeline;
use crate::collections::{sort_items, CollectionApi, CollectionItem, PageData};
use crate::config::{normalize, SiteConfig, TemplateFormat};
use crate::filters::parse_date;
use crate::glob::{to_slash, GlobError};
use crate::passthrough::{copy_passthrough, CopyError};
use crate::templates::TemplateEngine;

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages written
    pub pages: usize,

    /// Number of passthrough files copied
    pub copied: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read input: {0}")]
    ReadError(String),

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to render markdown in {path}: {message}")]
    RenderError { path: String, message: String },

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to build collection {name:?}: {source}")]
    CollectionError {
        name: String,
        #[source]
        source: GlobError,
    },

    #[error("Layout error in {path}: {message}")]
    LayoutError { path: String, message: String },

    #[error("{first} and {second} both write to {output}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// A page to be built.
#[derive(Debug)]
struct PageInfo {
    /// Template format of the source file
    format: TemplateFormat,

    /// Parsed frontmatter (empty when the file has none)
    frontmatter: Frontmatter,

    /// Source after the frontmatter block
    body: String,

    /// Absolute output path, `None` for `permalink: false`
    output_path: Option<PathBuf>,

    /// Data exposed to templates as `page`
    page: PageData,
}

/// Static site builder.
///
/// Holds the immutable site configuration; each [`StaticBuilder::build`]
/// rediscovers content and renders the whole site from scratch.
pub struct StaticBuilder {
    root: PathBuf,
    config: Arc<SiteConfig>,
    markdown: MarkdownRenderer,
    highlighter: Option<Arc<Highlighter>>,
}

impl StaticBuilder {
    /// Create a builder for the project at `root`.
    pub fn new(root: impl Into<PathBuf>, config: Arc<SiteConfig>) -> Result<Self, BuildError> {
        let highlighter = config
            .highlight_options()
            .map(Highlighter::new)
            .transpose()?
            .map(Arc::new);

        let mut markdown = MarkdownRenderer::new(config.markdown.clone());
        if let Some(highlighter) = &highlighter {
            markdown = markdown.with_highlighter(Arc::clone(highlighter));
        }

        Ok(Self {
            root: root.into(),
            config,
            markdown,
            highlighter,
        })
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Site configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Absolute input directory.
    pub fn input_dir(&self) -> PathBuf {
        self.root.join(normalize(&self.config.dir().input))
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(normalize(&self.config.dir().output))
    }

    /// Absolute includes directory.
    pub fn includes_dir(&self) -> PathBuf {
        self.root.join(self.config.dir().includes_dir())
    }

    /// Build the static site.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let output_dir = self.output_dir();

        fs::create_dir_all(&output_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let templates = TemplateEngine::new(self.includes_dir(), &self.config.filters);
        let globals = self.load_global_data()?;

        let pages = self.discover_pages(&templates, &globals)?;
        check_duplicate_outputs(&self.root, &pages)?;
        tracing::debug!("Discovered {} pages", pages.len());

        let collections = self.build_collections(&pages)?;

        let results: Vec<Result<bool, BuildError>> = pages
            .par_iter()
            .map(|page| self.build_page(page, &templates, &globals, &collections))
            .collect();

        let mut written = 0;
        for result in results {
            if result? {
                written += 1;
            }
        }

        let copied = copy_passthrough(&self.root, self.config.dir(), &self.config.passthrough)?;

        self.generate_assets(&output_dir)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: written,
            copied,
            duration_ms: duration.as_millis() as u64,
            output_dir,
        })
    }

    /// Remove the build output. Returns `false` if there was nothing to remove.
    ///
    /// Passthrough sources that live inside the output directory, such as
    /// prebuilt stylesheets, are kept. Generated assets written next to them
    /// are removed, as are directories left empty.
    pub fn clean(&self) -> Result<bool, BuildError> {
        let output_dir = self.output_dir();
        if !output_dir.exists() {
            return Ok(false);
        }

        let kept: Vec<PathBuf> = self
            .config
            .passthrough
            .iter()
            .map(|rule| self.root.join(rule.glob.base()))
            .filter(|source| source.starts_with(&output_dir))
            .collect();

        let result = if kept.is_empty() {
            fs::remove_dir_all(&output_dir)
        } else {
            AssetPipeline::remove_generated(&output_dir, self.highlighter.is_some())
                .and_then(|_| remove_except(&output_dir, &kept))
                .and_then(|()| prune_empty_dirs(&output_dir).map(|_| ()))
        };
        result.map_err(|e| BuildError::WriteError(format!("{}: {}", output_dir.display(), e)))?;

        Ok(true)
    }

    /// Global data: registered values, overridden by `<data dir>/*.json`.
    fn load_global_data(&self) -> Result<Map<String, Value>, BuildError> {
        let mut globals = self.config.global_data.clone();
        let data_dir = self.root.join(self.config.dir().data_dir());

        if !data_dir.is_dir() {
            return Ok(globals);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&data_dir)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", data_dir.display(), e)))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        files.sort();

        for path in files {
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;
            let value: Value =
                serde_json::from_str(&content).map_err(|e| BuildError::ParseError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            globals.insert(key.to_string(), value);
        }

        Ok(globals)
    }

    /// Discover all pages in the input directory.
    fn discover_pages(
        &self,
        templates: &TemplateEngine,
        globals: &Map<String, Value>,
    ) -> Result<Vec<PageInfo>, BuildError> {
        let input_dir = self.input_dir();

        if !input_dir.exists() {
            return Err(BuildError::ReadError(format!(
                "Input directory not found: {}",
                input_dir.display()
            )));
        }

        let skipped = [
            self.output_dir(),
            self.includes_dir(),
            self.root.join(self.config.dir().data_dir()),
        ];

        let mut pages = Vec::new();

        for entry in WalkDir::new(&input_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(e, &skipped))
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(TemplateFormat::from_extension)
            else {
                continue;
            };
            if !self.config.accepts(format) {
                continue;
            }

            let content = fs::read_to_string(path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            let (frontmatter, body) =
                extract_frontmatter(&content).map_err(|e| BuildError::ParseError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            let frontmatter = frontmatter.unwrap_or_default();

            let input_path = to_slash(path.strip_prefix(&self.root).unwrap_or(path));
            let relative = path.strip_prefix(&input_dir).unwrap_or(path);
            let date = page_date(path, &frontmatter)?;

            let stem = relative
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("index");
            let parent = relative.parent().unwrap_or(Path::new(""));

            let file_slug = if stem == "index" {
                parent
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .to_string()
            } else {
                stem.to_string()
            };
            let file_path_stem = format!("/{}", to_slash(&parent.join(stem)));

            let mut page = PageData {
                url: None,
                input_path,
                output_path: None,
                file_slug,
                file_path_stem,
                date,
            };

            let target =
                self.resolve_permalink(templates, globals, &frontmatter, &page, parent, stem)?;
            let output_path = target.map(|(url, file)| {
                page.url = Some(url);
                let output = self.output_dir().join(file);
                page.output_path = Some(to_slash(
                    output.strip_prefix(&self.root).unwrap_or(&output),
                ));
                output
            });

            pages.push(PageInfo {
                format,
                frontmatter,
                body: body.to_string(),
                output_path,
                page,
            });
        }

        pages.sort_by(|a, b| a.page.input_path.cmp(&b.page.input_path));

        Ok(pages)
    }

    /// URL and output file (relative to the output directory) for a page.
    fn resolve_permalink(
        &self,
        templates: &TemplateEngine,
        globals: &Map<String, Value>,
        frontmatter: &Frontmatter,
        page: &PageData,
        parent: &Path,
        stem: &str,
    ) -> Result<Option<(String, PathBuf)>, BuildError> {
        let permalink = match &frontmatter.permalink {
            Permalink::Disabled => return Ok(None),
            Permalink::Default => {
                let dir = if stem == "index" {
                    parent.to_path_buf()
                } else {
                    parent.join(stem)
                };
                let dir = to_slash(&dir);
                let url = if dir.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}/", dir)
                };
                return Ok(Some((url, Path::new(&dir).join("index.html"))));
            }
            Permalink::Path(permalink) => permalink,
        };

        let templated = self.config.settings.data_template_engine.is_some();
        let rendered = if templated && is_templated(permalink) {
            let mut context = globals.clone();
            context.extend(frontmatter.data.clone());
            context.insert(
                "page".to_string(),
                json!({
                    "inputPath": page.input_path,
                    "fileSlug": page.file_slug,
                    "filePathStem": page.file_path_stem,
                }),
            );
            templates
                .render_data(permalink, &context)
                .map_err(|e| BuildError::TemplateError(format!("{}: {}", page.input_path, e)))?
        } else {
            permalink.clone()
        };

        let trimmed = rendered.trim().trim_start_matches('/');
        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(BuildError::ParseError {
                path: page.input_path.clone(),
                message: format!("permalink {:?} leaves the output directory", rendered),
            });
        }

        if trimmed.is_empty() || trimmed.ends_with('/') {
            let file = Path::new(trimmed).join("index.html");
            return Ok(Some((format!("/{}", trimmed), file)));
        }

        let url = match trimmed.strip_suffix("index.html") {
            Some(dir) if dir.is_empty() || dir.ends_with('/') => format!("/{}", dir),
            _ => format!("/{}", trimmed),
        };
        Ok(Some((url, PathBuf::from(trimmed))))
    }

    /// Evaluate `all`, the tag collections and the registered collections.
    fn build_collections(&self, pages: &[PageInfo]) -> Result<Value, BuildError> {
        let mut items: Vec<CollectionItem> = pages
            .iter()
            .filter(|p| !p.frontmatter.exclude_from_collections)
            .map(|p| CollectionItem {
                page: p.page.clone(),
                data: p.frontmatter.data.clone(),
                raw_input: p.body.clone(),
                tags: p.frontmatter.tags.clone(),
            })
            .collect();
        sort_items(&mut items);

        let api = CollectionApi::new(&items);
        let mut collections: Map<String, Value> = Map::new();

        collections.insert("all".to_string(), to_json(&api.all())?);

        let tags: HashSet<&str> = items
            .iter()
            .flat_map(|item| item.tags.iter().map(String::as_str))
            .collect();
        for tag in tags {
            collections.insert(tag.to_string(), to_json(&api.filtered_by_tag(tag))?);
        }

        for def in &self.config.collections {
            let selected = (def.selector)(&api).map_err(|source| BuildError::CollectionError {
                name: def.name.clone(),
                source,
            })?;
            tracing::debug!("Collection {} has {} items", def.name, selected.len());
            collections.insert(def.name.clone(), to_json(&selected)?);
        }

        Ok(Value::Object(collections))
    }

    /// Render a single page. Returns whether a file was written.
    fn build_page(
        &self,
        page: &PageInfo,
        templates: &TemplateEngine,
        globals: &Map<String, Value>,
        collections: &Value,
    ) -> Result<bool, BuildError> {
        let settings = &self.config.settings;
        let name = page.page.input_path.as_str();

        let mut data = globals.clone();
        data.extend(page.frontmatter.data.clone());
        data.insert("page".to_string(), to_json(&page.page)?);
        data.insert("collections".to_string(), collections.clone());

        let render_template = |source: &str| {
            templates
                .render_str(name, source, &data)
                .map_err(|e| BuildError::TemplateError(format!("{}: {:#}", name, e)))
        };

        let mut content = match page.format {
            TemplateFormat::Md => {
                let source = match settings.markdown_template_engine {
                    Some(_) => render_template(&page.body)?,
                    None => page.body.clone(),
                };
                self.markdown
                    .render(&source)
                    .map_err(|e| BuildError::RenderError {
                        path: name.to_string(),
                        message: e.to_string(),
                    })?
            }
            TemplateFormat::Njk => render_template(&page.body)?,
            TemplateFormat::Html => match settings.html_template_engine {
                Some(_) => render_template(&page.body)?,
                None => page.body.clone(),
            },
        };

        let mut layout = page.frontmatter.layout.clone();
        let mut seen = HashSet::new();

        while let Some(current) = layout {
            if !seen.insert(current.clone()) {
                return Err(BuildError::LayoutError {
                    path: name.to_string(),
                    message: format!("layout {:?} includes itself", current),
                });
            }

            let layout_fm = templates
                .layout_frontmatter(&current)
                .map_err(|e| BuildError::LayoutError {
                    path: name.to_string(),
                    message: e.to_string(),
                })?;

            for (key, value) in layout_fm.data {
                data.entry(key).or_insert(value);
            }
            data.insert("content".to_string(), Value::String(content));

            content = templates
                .render_layout(&current, &data)
                .map_err(|e| BuildError::TemplateError(format!("{}: {:#}", current, e)))?;

            layout = layout_fm.layout;
        }

        let Some(output_path) = &page.output_path else {
            tracing::debug!("Rendered {} without writing it", name);
            return Ok(false);
        };

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        fs::write(output_path, content)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", output_path.display(), e)))?;

        tracing::debug!("Wrote {}", output_path.display());
        Ok(true)
    }

    /// Write the highlight theme and default assets.
    fn generate_assets(&self, output_dir: &Path) -> Result<(), BuildError> {
        if let Some(highlighter) = &self.highlighter {
            let css = highlighter.stylesheet()?;
            AssetPipeline::write_highlight_css(output_dir, &css)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        AssetPipeline::write_defaults(output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Hidden entries, `node_modules` and the output, includes and data
/// directories are not content.
fn is_ignored(entry: &DirEntry, skipped: &[PathBuf]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name == "node_modules" {
        return true;
    }
    entry.file_type().is_dir() && skipped.iter().any(|dir| entry.path() == dir.as_path())
}

/// Remove everything under `dir` except the `kept` paths and their parents.
fn remove_except(dir: &Path, kept: &[PathBuf]) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if kept.iter().any(|k| k == &path) {
            continue;
        }
        if kept.iter().any(|k| k.starts_with(&path)) {
            remove_except(&path, kept)?;
            continue;
        }

        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Remove empty directories under `dir`, and `dir` itself if it ends up
/// empty. Returns whether `dir` was removed.
fn prune_empty_dirs(dir: &Path) -> std::io::Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !(entry.file_type()?.is_dir() && prune_empty_dirs(&entry.path())?) {
            empty = false;
        }
    }
    if empty {
        fs::remove_dir(dir)?;
    }
    Ok(empty)
}

fn is_templated(value: &str) -> bool {
    value.contains("{{") || value.contains("{%")
}

/// Frontmatter date, or the file's modification time.
fn page_date(path: &Path, frontmatter: &Frontmatter) -> Result<DateTime<Local>, BuildError> {
    if let Some(date) = &frontmatter.date {
        return parse_date(date).ok_or_else(|| BuildError::ParseError {
            path: path.display().to_string(),
            message: format!("invalid date {:?}", date),
        });
    }

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

    Ok(DateTime::<Local>::from(modified))
}

fn check_duplicate_outputs(root: &Path, pages: &[PageInfo]) -> Result<(), BuildError> {
    let mut seen: HashMap<&Path, &str> = HashMap::new();

    for page in pages {
        let Some(output) = page.output_path.as_deref() else {
            continue;
        };
        if let Some(first) = seen.insert(output, &page.page.input_path) {
            return Err(BuildError::DuplicateOutput {
                output: to_slash(output.strip_prefix(root).unwrap_or(output)),
                first: first.to_string(),
                second: page.page.input_path.clone(),
            });
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, BuildError> {
    serde_json::to_value(value).map_err(|e| BuildError::TemplateError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use coursesite_markdown::{AnchorOptions, HighlightOptions, MarkdownOptions};

    use crate::config::{ConfigBuilder, DirConfig, Plugin, SiteSettings};
    use crate::filters::{date_format, reading_time_filter};

    fn lessons_settings() -> SiteSettings {
        SiteSettings {
            dir: DirConfig {
                input: PathBuf::from("Lessons"),
                output: PathBuf::from("_site"),
                includes: PathBuf::from("../_includes"),
                data: PathBuf::from("_data"),
            },
            ..Default::default()
        }
    }

    fn course_config() -> Arc<SiteConfig> {
        let mut config = ConfigBuilder::new();
        config
            .add_passthrough_copy("Lessons/**/*.{png,jpg,jpeg,gif,svg}")
            .add_collection("courses", |api| api.filtered_by_glob("Lessons/*/README.md"))
            .add_filter("dateFormat", date_format)
            .add_filter("readingTime", reading_time_filter)
            .set_markdown_library(MarkdownOptions {
                html: true,
                breaks: true,
                linkify: true,
                anchors: Some(AnchorOptions::default()),
            })
            .add_global_data("site", json!({ "title": "Courses" }));
        Arc::new(config.finish(lessons_settings()).unwrap())
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, relative: &str) -> String {
        fs::read_to_string(root.join(relative)).unwrap()
    }

    #[test]
    fn builds_course_site() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(
            root,
            "Lessons/a/README.md",
            "---\ntitle: Course A\ndate: 2024-01-01\n---\n# Intro\n\nSee https://example.com.",
        );
        write(
            root,
            "Lessons/b/README.md",
            "---\ntitle: Course B\ndate: 2024-02-01\n---\nLine one\nline two",
        );
        write(root, "Lessons/b/extra.md", "---\ntitle: Extra\ndate: 2024-03-01\n---\nMore");
        write(
            root,
            "_includes/layouts/list.njk",
            "{% for c in collections.courses %}[{{ c.data.title }} {{ c.url | safe }}]{% endfor %}",
        );
        write(root, "Lessons/index.njk", "---\nlayout: layouts/list.njk\n---\n");

        let builder = StaticBuilder::new(root, course_config()).unwrap();
        let result = builder.build().unwrap();

        assert_eq!(result.pages, 4);
        assert_eq!(
            read(root, "_site/index.html"),
            "[Course A /a/README/][Course B /b/README/]"
        );

        let a = read(root, "_site/a/README/index.html");
        assert!(a.contains(r#"<h1 id="intro">Intro</h1>"#));
        assert!(a.contains(r#"<a href="https://example.com">https://example.com</a>."#));

        let b = read(root, "_site/b/README/index.html");
        assert!(b.contains("Line one<br />"));

        assert!(root.join("_site/b/extra/index.html").exists());
    }

    #[test]
    fn copies_lesson_images() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let png = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];

        write(root, "Lessons/a/README.md", "# A");
        fs::create_dir_all(root.join("Lessons/a/img")).unwrap();
        fs::write(root.join("Lessons/a/img/diagram.png"), png).unwrap();

        let result = StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(result.copied, 1);
        assert_eq!(fs::read(root.join("_site/a/img/diagram.png")).unwrap(), png);
    }

    #[test]
    fn renders_builtin_layout_chain() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(
            root,
            "Lessons/a/README.md",
            "---\ntitle: Course A\nlayout: layouts/course.njk\ntags: [rust, intro]\ndate: 2024-03-05\n---\nHello",
        );

        StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap();

        let html = read(root, "_site/a/README/index.html");
        assert!(html.contains("<title>Course A - Courses</title>"));
        assert!(html.contains(r#"<section class="course">"#));
        assert!(html.contains("<li>rust</li>"));
        assert!(html.contains("March 5, 2024"));
        assert!(html.contains("1 min read"));
        assert!(html.contains(r#"<li class="nav-item active">"#));
        assert!(html.contains("</body>"));
    }

    #[test]
    fn layout_cycle_is_an_error() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "_includes/a.njk", "---\nlayout: b.njk\n---\n{{ content | safe }}");
        write(root, "_includes/b.njk", "---\nlayout: a.njk\n---\n{{ content | safe }}");
        write(root, "Lessons/page.md", "---\nlayout: a.njk\n---\nHi");

        let err = StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::LayoutError { .. }));
    }

    #[test]
    fn honours_permalinks() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "---\npermalink: /custom/{{ page.fileSlug }}/\n---\nA");
        write(root, "Lessons/b.md", "---\npermalink: false\n---\nB");
        write(root, "Lessons/c.njk", "---\npermalink: feed.xml\n---\n<feed/>");

        let result = StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(result.pages, 2);
        assert!(root.join("_site/custom/a/index.html").exists());
        assert!(!root.join("_site/b").exists());
        assert_eq!(read(root, "_site/feed.xml"), "<feed/>");
    }

    #[test]
    fn duplicate_output_is_an_error() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "A");
        write(root, "Lessons/b.md", "---\npermalink: /a/\n---\nB");

        let err = StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::DuplicateOutput { .. }));
    }

    #[test]
    fn invalid_frontmatter_date_is_an_error() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "---\ndate: someday\n---\nA");

        let err = StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::ParseError { .. }));
    }

    #[test]
    fn exposes_global_data_files() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/_data/meta.json", r#"{"author": "Ada"}"#);
        write(root, "Lessons/index.njk", "{{ meta.author }} / {{ site.title }}");

        StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(read(root, "_site/index.html"), "Ada / Courses");
        assert!(!root.join("_site/_data").exists());
    }

    #[test]
    fn excluded_pages_stay_out_of_collections() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(
            root,
            "Lessons/a/README.md",
            "---\neleventyExcludeFromCollections: true\n---\nA",
        );
        write(root, "Lessons/b/README.md", "B");
        write(
            root,
            "Lessons/list.njk",
            "{{ collections.courses | length }}/{{ collections.all | length }}",
        );

        StaticBuilder::new(root, course_config())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(read(root, "_site/list/index.html"), "1/2");
    }

    #[test]
    fn escapes_raw_html_when_disabled() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "<div>raw</div>");

        let config = ConfigBuilder::new().finish(lessons_settings()).unwrap();
        StaticBuilder::new(root, Arc::new(config))
            .unwrap()
            .build()
            .unwrap();

        let html = read(root, "_site/a/index.html");
        assert!(html.contains("&lt;div&gt;raw&lt;/div&gt;"));
    }

    #[test]
    fn writes_highlight_stylesheet() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "```rust\nfn main() {}\n```");

        let mut config = ConfigBuilder::new();
        config.add_plugin(Plugin::SyntaxHighlight(HighlightOptions::default()));
        let config = config.finish(lessons_settings()).unwrap();

        StaticBuilder::new(root, Arc::new(config))
            .unwrap()
            .build()
            .unwrap();

        let html = read(root, "_site/a/index.html");
        assert!(html.contains(r#"<pre class="language-rust">"#));
        assert!(!read(root, "_site/css/syntax.css").is_empty());
    }

    #[test]
    fn clean_removes_output() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "A");
        let builder = StaticBuilder::new(root, course_config()).unwrap();
        builder.build().unwrap();

        assert!(builder.clean().unwrap());
        assert!(!root.join("_site").exists());
        assert!(!builder.clean().unwrap());
    }

    #[test]
    fn clean_keeps_passthrough_sources_in_output() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "A");
        write(root, "_site/css/style.css", "body{}");

        let mut config = ConfigBuilder::new();
        config.add_passthrough_copy("_site/css");
        let config = config.finish(lessons_settings()).unwrap();

        let builder = StaticBuilder::new(root, Arc::new(config)).unwrap();
        builder.build().unwrap();
        assert!(builder.clean().unwrap());

        assert_eq!(read(root, "_site/css/style.css"), "body{}");
        assert!(!root.join("_site/a").exists());
        assert!(!root.join("_site/js").exists());
    }

    #[test]
    fn clean_removes_generated_assets_from_passthrough_dirs() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "```rust
fn main() {}
```");
        write(root, "_site/css/custom.css", "p{}");

        let mut config = ConfigBuilder::new();
        config
            .add_passthrough_copy("_site/css")
            .add_passthrough_copy("_site/js")
            .add_plugin(Plugin::SyntaxHighlight(HighlightOptions::default()));
        let config = config.finish(lessons_settings()).unwrap();

        let builder = StaticBuilder::new(root, Arc::new(config)).unwrap();
        builder.build().unwrap();
        assert!(root.join("_site/css/style.css").exists());
        assert!(root.join("_site/css/syntax.css").exists());
        assert!(root.join("_site/js/main.js").exists());

        assert!(builder.clean().unwrap());

        assert_eq!(read(root, "_site/css/custom.css"), "p{}");
        assert!(!root.join("_site/css/style.css").exists());
        assert!(!root.join("_site/css/syntax.css").exists());
        assert!(!root.join("_site/js").exists());
        assert!(!root.join("_site/a").exists());
    }

    #[test]
    fn build_then_clean_leaves_no_output_behind() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "Lessons/a.md", "A");

        let mut config = ConfigBuilder::new();
        config
            .add_passthrough_copy("_site/css")
            .add_passthrough_copy("_site/js");
        let config = config.finish(lessons_settings()).unwrap();

        let builder = StaticBuilder::new(root, Arc::new(config)).unwrap();
        builder.build().unwrap();
        assert!(builder.clean().unwrap());

        assert!(!root.join("_site").exists());
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let temp = tempdir().unwrap();
        let err = StaticBuilder::new(temp.path(), course_config())
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::ReadError(_)));
    }
}
