//! Site configuration for the lessons project.
//!
//! Lessons live in `Lessons/`, shared layouts in `_includes/` next to it and
//! the generated site in `_site/`. Prebuilt stylesheets and scripts are kept
//! in `_site/css` and `_site/js` and survive every build.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;

use coursesite_markdown::{AnchorOptions, HighlightOptions, MarkdownOptions};
use coursesite_server::{DevServerOptions, SnippetRule};
use coursesite_static::filters::{date_format, reading_time_filter};
use coursesite_static::{
    ConfigBuilder, DirConfig, Plugin, SiteConfig, SiteSettings, TemplateFormat,
};

/// Lesson images copied as-is, plus the prebuilt CSS and JS.
pub const PASSTHROUGH: [&str; 3] = [
    "Lessons/**/*.{png,jpg,jpeg,gif,svg}",
    "_site/css",
    "_site/js",
];

/// Course landing pages: one `README.md` per lesson directory.
pub const COURSES_GLOB: &str = "Lessons/*/README.md";

/// Inserted before `</body>`; stubs out the reload client's `socket.on` so
/// it never registers its handlers.
pub const RELOAD_BLOCKER: &str = "<script>if(window.___browserSync___){window.___browserSync___.socket.on=function(){};}</script>";

/// Everything the CLI needs to build and serve the site.
#[derive(Debug)]
pub struct ProjectConfig {
    pub site: SiteConfig,
    pub server: DevServerOptions,
}

/// Register the site's customisations and return the final configuration.
pub fn configure(settings: &crate::settings::Settings) -> Result<ProjectConfig> {
    let mut config = ConfigBuilder::new();

    for pattern in PASSTHROUGH {
        config.add_passthrough_copy(pattern);
    }

    config
        .add_collection("courses", |api| api.filtered_by_glob(COURSES_GLOB))
        .add_filter("dateFormat", date_format)
        .add_filter("readingTime", reading_time_filter)
        .set_markdown_library(MarkdownOptions {
            html: true,
            breaks: true,
            linkify: true,
            anchors: Some(AnchorOptions::default()),
        })
        .add_plugin(Plugin::SyntaxHighlight(HighlightOptions::default()))
        .add_global_data("site", json!({ "title": settings.site.title }));

    let site = config
        .finish(SiteSettings {
            dir: DirConfig {
                input: "Lessons".into(),
                output: "_site".into(),
                includes: "../_includes".into(),
                data: "_data".into(),
            },
            template_formats: vec![TemplateFormat::Md, TemplateFormat::Njk, TemplateFormat::Html],
            markdown_template_engine: Some(TemplateFormat::Njk),
            html_template_engine: Some(TemplateFormat::Njk),
            data_template_engine: Some(TemplateFormat::Njk),
        })
        .context("Invalid site configuration")?;

    let server = dev_server_options(settings)?;

    Ok(ProjectConfig { site, server })
}

/// Development server with every live-reload behaviour switched off.
fn dev_server_options(settings: &crate::settings::Settings) -> Result<DevServerOptions> {
    let defaults = DevServerOptions::default();

    let mut options = DevServerOptions {
        host: settings.server.host.clone().unwrap_or(defaults.host),
        port: settings.server.port.unwrap_or(defaults.port),
        notify: false,
        ui: false,
        ghost_mode: false,
        open: false,
        reload_delay: Duration::ZERO,
        reload_debounce: Duration::ZERO,
        inject_changes: false,
        code_sync: false,
        snippet_rules: Vec::new(),
        ready_callbacks: Vec::new(),
    };

    let blocker = SnippetRule::before("(?i)</body>", RELOAD_BLOCKER)
        .context("Invalid snippet pattern")?;

    options.add_snippet_rule(blocker).on_ready(|options| {
        options.notify = false;
        options.reload_delay = Duration::ZERO;
    });

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use coursesite_static::StaticBuilder;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::settings::Settings;

    fn project() -> ProjectConfig {
        configure(&Settings::default()).unwrap()
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn uses_lessons_layout() {
        let site = project().site;
        let dir = site.dir();

        assert_eq!(dir.input, PathBuf::from("Lessons"));
        assert_eq!(dir.output, PathBuf::from("_site"));
        assert_eq!(dir.includes, PathBuf::from("../_includes"));
        assert_eq!(dir.includes_dir(), PathBuf::from("_includes"));
        assert_eq!(
            site.settings.template_formats,
            vec![TemplateFormat::Md, TemplateFormat::Njk, TemplateFormat::Html]
        );
        assert_eq!(site.settings.markdown_template_engine, Some(TemplateFormat::Njk));
        assert_eq!(site.settings.html_template_engine, Some(TemplateFormat::Njk));
        assert_eq!(site.settings.data_template_engine, Some(TemplateFormat::Njk));
    }

    #[test]
    fn registers_passthrough_filters_and_plugins() {
        let site = project().site;

        let patterns: Vec<_> = site.passthrough.iter().map(|r| r.glob.as_str()).collect();
        assert_eq!(patterns, PASSTHROUGH.to_vec());

        let filters: Vec<_> = site.filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(filters, vec!["dateFormat", "readingTime"]);

        let collections: Vec<_> = site.collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(collections, vec!["courses"]);

        assert_eq!(site.highlight_options(), Some(&HighlightOptions::default()));
        assert_eq!(
            site.markdown,
            MarkdownOptions {
                html: true,
                breaks: true,
                linkify: true,
                anchors: Some(AnchorOptions::default()),
            }
        );
        assert_eq!(site.global_data["site"]["title"], "Courses");
    }

    #[test]
    fn filters_format_dates_and_reading_time() {
        let site = project().site;
        let filter = |name: &str| site.filters.iter().find(|f| f.name == name).unwrap().func;

        assert_eq!(filter("dateFormat")("2024-03-05".into()), "March 5, 2024");
        assert_eq!(filter("dateFormat")("not a date".into()), "Invalid Date");

        let words = vec!["word"; 201].join(" ");
        assert_eq!(filter("readingTime")(words.as_str().into()), "2 min read");
        assert_eq!(filter("readingTime")("".into()), "1 min read");
    }

    #[test]
    fn disables_live_reload() {
        let server = project().server;

        assert!(!server.notify);
        assert!(!server.ui);
        assert!(!server.ghost_mode);
        assert!(!server.open);
        assert!(!server.inject_changes);
        assert!(!server.code_sync);
        assert_eq!(server.reload_delay, Duration::ZERO);
        assert_eq!(server.reload_debounce, Duration::ZERO);
        assert_eq!(server.port, 8080);
        assert_eq!(server.snippet_rules.len(), 1);
        assert_eq!(server.ready_callbacks.len(), 1);
    }

    #[test]
    fn blocker_goes_before_closing_body() {
        let server = project().server;
        let rule = &server.snippet_rules[0];

        assert_eq!(
            rule.rewrite("<html><body><p>x</p></BODY></html>"),
            format!("<html><body><p>x</p>{}</BODY></html>", RELOAD_BLOCKER)
        );
        assert_eq!(rule.rewrite("<p>fragment</p>"), "<p>fragment</p>");
    }

    #[test]
    fn ready_callback_resets_notify_and_delay() {
        let mut server = project().server;
        server.notify = true;
        server.reload_delay = Duration::from_secs(2);

        server.run_ready_callbacks();

        assert!(!server.notify);
        assert_eq!(server.reload_delay, Duration::ZERO);
    }

    #[test]
    fn server_address_comes_from_settings() {
        let mut settings = Settings::default();
        settings.server.host = Some("0.0.0.0".to_string());
        settings.server.port = Some(3000);

        let server = configure(&settings).unwrap().server;

        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 3000);
    }

    #[test]
    fn builds_courses_and_copies_images() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let png = [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

        write(
            root,
            "Lessons/intro/README.md",
            "---\ntitle: Intro\ndate: 2024-01-10\n---\n# Welcome\n\nhttps://example.com",
        );
        write(
            root,
            "Lessons/advanced/README.md",
            "---\ntitle: Advanced\ndate: 2024-02-10\n---\n```rust\nfn main() {}\n```",
        );
        write(root, "Lessons/advanced/notes.md", "---\ntitle: Notes\n---\nNot a course");
        write(
            root,
            "_includes/layouts/courses.njk",
            "{% for c in collections.courses %}{{ c.data.title }};{% endfor %}",
        );
        write(root, "Lessons/index.njk", "---\nlayout: layouts/courses.njk\n---\n");
        write(root, "_site/css/style.css", "body{}");
        fs::create_dir_all(root.join("Lessons/intro/img")).unwrap();
        fs::write(root.join("Lessons/intro/img/flow.png"), png).unwrap();

        let builder = StaticBuilder::new(root, Arc::new(project().site)).unwrap();
        let result = builder.build().unwrap();

        assert_eq!(result.pages, 4);
        assert_eq!(
            fs::read_to_string(root.join("_site/index.html")).unwrap(),
            "Intro;Advanced;"
        );
        assert_eq!(fs::read(root.join("_site/intro/img/flow.png")).unwrap(), png);
        assert_eq!(fs::read_to_string(root.join("_site/css/style.css")).unwrap(), "body{}");
        assert!(root.join("_site/css/syntax.css").exists());

        let intro = fs::read_to_string(root.join("_site/intro/README/index.html")).unwrap();
        assert!(intro.contains(r#"<h1 id="welcome">Welcome</h1>"#));
        assert!(intro.contains(r#"<a href="https://example.com">https://example.com</a>"#));

        let advanced = fs::read_to_string(root.join("_site/advanced/README/index.html")).unwrap();
        assert!(advanced.contains(r#"<pre class="language-rust">"#));
    }
}
