//! Asset pipeline for the site stylesheet, script and highlight theme.
//!
//! The built-in layout links `/css/style.css`, `/css/syntax.css` and
//! `/js/main.js`. Prebuilt files already present in the output directory are
//! never overwritten; the defaults here only fill the gaps.

use std::fs;
use std::io;
use std::path::Path;

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Default site stylesheet.
    pub fn generate_css() -> String {
        DEFAULT_CSS.to_string()
    }

    /// Default site script.
    pub fn generate_js() -> String {
        DEFAULT_JS.to_string()
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Write the default stylesheet and script unless prebuilt ones exist.
    ///
    /// Returns the number of files written.
    pub fn write_defaults(output_dir: &Path) -> io::Result<usize> {
        let mut written = 0;

        if write_if_missing(&output_dir.join("css/style.css"), &default_css())? {
            written += 1;
        }
        if write_if_missing(&output_dir.join("js/main.js"), &Self::generate_js())? {
            written += 1;
        }

        Ok(written)
    }

    /// Remove the assets a build generated, leaving prebuilt files alone.
    ///
    /// The highlight theme is always generated when `highlight` is set; the
    /// stylesheet and script only count as generated while they still hold
    /// the defaults. Returns the number of files removed.
    pub fn remove_generated(output_dir: &Path, highlight: bool) -> io::Result<usize> {
        let mut removed = 0;

        if highlight && remove_if_matches(&output_dir.join("css/syntax.css"), None)? {
            removed += 1;
        }
        if remove_if_matches(&output_dir.join("css/style.css"), Some(&default_css()))? {
            removed += 1;
        }
        if remove_if_matches(&output_dir.join("js/main.js"), Some(DEFAULT_JS))? {
            removed += 1;
        }

        Ok(removed)
    }

    /// Write the highlight theme, minified when possible.
    pub fn write_highlight_css(output_dir: &Path, css: &str) -> io::Result<()> {
        let css = match Self::minify_css(css) {
            Ok(minified) => minified,
            Err(e) => {
                tracing::warn!("Keeping unminified highlight stylesheet: {}", e);
                css.to_string()
            }
        };

        let path = output_dir.join("css/syntax.css");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, css)
    }
}

fn default_css() -> String {
    let css = AssetPipeline::generate_css();
    AssetPipeline::minify_css(&css).unwrap_or(css)
}

/// Remove `path` if it is a file whose content is `expected` (any content
/// when `None`).
fn remove_if_matches(path: &Path, expected: Option<&str>) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    if let Some(expected) = expected {
        if fs::read(path)? != expected.as_bytes() {
            return Ok(false);
        }
    }
    fs::remove_file(path)?;
    Ok(true)
}

fn write_if_missing(path: &Path, content: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(true)
}

const DEFAULT_CSS: &str = r#"/* Course site theme */

:root {
  --sidebar-width: 280px;
  --content-max-width: 760px;
  --background: #ffffff;
  --foreground: #1f2328;
  --muted: #f6f8fa;
  --muted-foreground: #59636e;
  --border: #d1d9e0;
  --primary: #0969da;
  --primary-foreground: #ffffff;
  --radius: 0.375rem;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

.layout {
  display: grid;
  grid-template-columns: var(--sidebar-width) 1fr;
  min-height: 100vh;
}

/* Sidebar */
.sidebar {
  background: var(--muted);
  border-right: 1px solid var(--border);
  padding: 1.5rem;
  position: sticky;
  top: 0;
  height: 100vh;
  overflow-y: auto;
}

.nav-logo {
  display: block;
  margin-bottom: 1.5rem;
  font-weight: 700;
  font-size: 1.25rem;
  color: var(--foreground);
  text-decoration: none;
}

.nav-list {
  list-style: none;
  margin: 0;
  padding: 0;
}

.nav-item a {
  display: block;
  padding: 0.5rem 0.75rem;
  color: var(--muted-foreground);
  text-decoration: none;
  border-radius: var(--radius);
}

.nav-item.active > a {
  background: var(--primary);
  color: var(--primary-foreground);
}

/* Lesson content */
.main {
  padding: 2rem;
}

.lesson {
  max-width: var(--content-max-width);
}

.lesson-meta {
  color: var(--muted-foreground);
  font-size: 0.875rem;
}

.lesson h2 {
  border-bottom: 1px solid var(--border);
  padding-bottom: 0.25rem;
}

.header-anchor {
  margin-left: 0.25rem;
  color: var(--muted-foreground);
  text-decoration: none;
}

.lesson pre {
  background: var(--muted);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 1rem;
  overflow-x: auto;
  position: relative;
}

.lesson code {
  font-family: ui-monospace, monospace;
  font-size: 0.875em;
}

.copy-btn {
  position: absolute;
  top: 0.5rem;
  right: 0.5rem;
  padding: 0.25rem 0.75rem;
  font-size: 0.75rem;
  border: 1px solid var(--border);
  border-radius: var(--radius);
  background: var(--background);
  cursor: pointer;
}

.course-tags {
  display: flex;
  gap: 0.5rem;
  list-style: none;
  padding: 0;
}

.course-tags li {
  padding: 0.125rem 0.5rem;
  border-radius: 999px;
  background: var(--muted);
  font-size: 0.75rem;
}

@media (max-width: 1024px) {
  .layout {
    grid-template-columns: 1fr;
  }

  .sidebar {
    position: static;
    height: auto;
  }
}
"#;

const DEFAULT_JS: &str = r#"// Course site runtime
(function() {
  'use strict';

  // Copy button for code blocks
  document.querySelectorAll('.lesson pre').forEach(pre => {
    if (pre.querySelector('.copy-btn')) return;

    const btn = document.createElement('button');
    btn.className = 'copy-btn';
    btn.textContent = 'Copy';
    btn.setAttribute('type', 'button');

    btn.addEventListener('click', async () => {
      const code = pre.querySelector('code');
      const text = code ? code.textContent : pre.textContent;

      try {
        await navigator.clipboard.writeText(text || '');
        btn.textContent = 'Copied!';
      } catch (err) {
        btn.textContent = 'Error';
      }
      setTimeout(() => { btn.textContent = 'Copy'; }, 2000);
    });

    pre.appendChild(btn);
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_css() {
        let css = AssetPipeline::generate_css();
        assert!(css.contains(":root"));
        assert!(css.contains(".nav-item.active"));
    }

    #[test]
    fn minifies_css() {
        let css = r#"
.button {
    background-color: blue;
    padding: 10px;
}
        "#;

        let minified = AssetPipeline::minify_css(css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));
    }

    #[test]
    fn keeps_prebuilt_assets() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css/style.css"), "/* prebuilt */").unwrap();

        let written = AssetPipeline::write_defaults(temp.path()).unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("css/style.css")).unwrap(),
            "/* prebuilt */"
        );
        assert!(temp.path().join("js/main.js").exists());
    }

    #[test]
    fn removes_only_generated_assets() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css/style.css"), "/* prebuilt */").unwrap();
        AssetPipeline::write_defaults(temp.path()).unwrap();
        AssetPipeline::write_highlight_css(temp.path(), ".hl-keyword { color: red; }").unwrap();

        let removed = AssetPipeline::remove_generated(temp.path(), true).unwrap();

        assert_eq!(removed, 2);
        assert!(!temp.path().join("js/main.js").exists());
        assert!(!temp.path().join("css/syntax.css").exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("css/style.css")).unwrap(),
            "/* prebuilt */"
        );
    }

    #[test]
    fn writes_highlight_css() {
        let temp = tempdir().unwrap();
        AssetPipeline::write_highlight_css(temp.path(), ".hl-keyword { color: red; }").unwrap();

        let css = fs::read_to_string(temp.path().join("css/syntax.css")).unwrap();
        assert!(css.contains(".hl-keyword"));
    }
}
