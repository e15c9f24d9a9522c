//! Template engine for rendering pages and layouts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use coursesite_markdown::{extract_frontmatter, Frontmatter};
use minijinja::{AutoEscape, Environment, Error, ErrorKind};
use serde::Serialize;

use crate::config::FilterDef;

/// Name under which frontmatter values such as `permalink` are rendered.
/// These are not HTML, so they are not escaped.
const DATA_TEMPLATE: &str = "<data>";

/// Template engine using minijinja.
///
/// Includes and layouts are loaded from the includes directory, falling back
/// to the built-in templates. Frontmatter in those files is stripped before
/// compilation; use [`TemplateEngine::layout_frontmatter`] to read it.
pub struct TemplateEngine {
    env: Environment<'static>,
    includes_dir: PathBuf,
}

impl TemplateEngine {
    /// Create a template engine with the given includes directory and filters.
    pub fn new(includes_dir: PathBuf, filters: &[FilterDef]) -> Self {
        let mut env = Environment::new();

        env.set_auto_escape_callback(|name| {
            if name == DATA_TEMPLATE {
                AutoEscape::None
            } else {
                AutoEscape::Html
            }
        });

        let loader_dir = includes_dir.clone();
        env.set_loader(move |name| {
            load_source(&loader_dir, name).and_then(|source| match source {
                Some(source) => strip_frontmatter(name, &source).map(Some),
                None => Ok(None),
            })
        });

        for filter in filters {
            env.add_filter(filter.name.clone(), filter.func);
        }

        Self { env, includes_dir }
    }

    /// Render a template given as a string, such as a page body.
    pub fn render_str<S: Serialize>(
        &self,
        name: &str,
        source: &str,
        context: S,
    ) -> Result<String, Error> {
        self.env.render_named_str(name, source, context)
    }

    /// Render a frontmatter value, such as a templated permalink.
    pub fn render_data<S: Serialize>(&self, source: &str, context: S) -> Result<String, Error> {
        self.env.render_named_str(DATA_TEMPLATE, source, context)
    }

    /// Render a layout from the includes directory.
    pub fn render_layout<S: Serialize>(&self, layout: &str, context: S) -> Result<String, Error> {
        let tmpl = self.env.get_template(layout)?;
        tmpl.render(context)
    }

    /// Frontmatter declared by a layout file.
    pub fn layout_frontmatter(&self, layout: &str) -> Result<Frontmatter, Error> {
        let Some(source) = load_source(&self.includes_dir, layout)? else {
            return Err(Error::new(
                ErrorKind::TemplateNotFound,
                format!("layout {layout:?} not found in {}", self.includes_dir.display()),
            ));
        };

        let (frontmatter, _) = extract_frontmatter(&source)
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("{layout}: {e}")))?;

        Ok(frontmatter.unwrap_or_default())
    }
}

/// Read a template from the includes directory or the built-in set.
fn load_source(includes_dir: &Path, name: &str) -> Result<Option<String>, Error> {
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Ok(None);
    }

    match fs::read_to_string(includes_dir.join(name)) {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(builtin(name).map(str::to_string)),
        Err(e) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read template {name:?}"),
        )
        .with_source(e)),
    }
}

fn strip_frontmatter(name: &str, source: &str) -> Result<String, Error> {
    extract_frontmatter(source)
        .map(|(_, body)| body.to_string())
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("{name}: {e}")))
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "layouts/base.njk" => Some(BASE_LAYOUT),
        "layouts/course.njk" => Some(COURSE_LAYOUT),
        "partials/nav.njk" => Some(NAV_PARTIAL),
        _ => None,
    }
}

const BASE_LAYOUT: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% if title %}{{ title }} - {% endif %}{{ site.title }}</title>
  <link rel="stylesheet" href="/css/syntax.css">
  <link rel="stylesheet" href="/css/style.css">
</head>
<body>
  <div class="layout">
    <nav class="sidebar">
      {% include "partials/nav.njk" %}
    </nav>
    <main class="main">
      <article class="lesson">
        {% if title %}<h1 class="lesson-title">{{ title }}</h1>{% endif %}
        <p class="lesson-meta">
          {% if date %}<time>{{ date | dateFormat }}</time> &middot; {% endif %}{{ content | readingTime }}
        </p>
        {{ content | safe }}
      </article>
    </main>
  </div>
  <script src="/js/main.js" defer></script>
</body>
</html>"##;

const COURSE_LAYOUT: &str = r##"---
layout: layouts/base.njk
---
<section class="course">
  {{ content | safe }}
  {% if tags %}
  <ul class="course-tags">
    {% for tag in tags %}<li>{{ tag }}</li>{% endfor %}
  </ul>
  {% endif %}
</section>"##;

const NAV_PARTIAL: &str = r##"<div class="nav-header">
  <a href="/" class="nav-logo">{{ site.title }}</a>
</div>
<ul class="nav-list">
{% for course in collections.courses %}
  <li class="nav-item{% if course.url == page.url %} active{% endif %}">
    <a href="{{ course.url }}">{{ course.data.title or course.fileSlug }}</a>
  </li>
{% endfor %}
</ul>"##;
