//! Code block syntax highlighting.

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Options for the syntax-highlight plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Name of a bundled syntect theme used for the stylesheet
    pub theme: String,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".to_string(),
        }
    }
}

/// Errors that can occur while highlighting.
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error("Unknown highlight theme: {0}")]
    UnknownTheme(String),

    #[error("Failed to highlight {language} block: {message}")]
    Highlight { language: String, message: String },

    #[error("Failed to generate highlight stylesheet: {0}")]
    Stylesheet(String),
}

/// Class-based code highlighter backed by syntect's bundled grammars.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("syntaxes", &self.syntaxes.syntaxes().len())
            .finish()
    }
}

impl Highlighter {
    /// Load the bundled grammars and the configured theme.
    pub fn new(options: &HighlightOptions) -> Result<Self, HighlightError> {
        let mut themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .remove(&options.theme)
            .ok_or_else(|| HighlightError::UnknownTheme(options.theme.clone()))?;

        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        })
    }

    /// Highlight a fenced code block.
    ///
    /// `info` is the fence info string; its first word names the language.
    /// Unknown languages are emitted as plain text.
    pub fn highlight(&self, code: &str, info: &str) -> Result<String, HighlightError> {
        let language = language_from_info(info);
        let syntax = self.find_syntax(language);

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| HighlightError::Highlight {
                    language: language.to_string(),
                    message: e.to_string(),
                })?;
        }
        let body = generator.finalize();

        Ok(if language.is_empty() {
            format!("<pre><code>{}</code></pre>\n", body)
        } else {
            format!(
                "<pre class=\"language-{lang}\"><code class=\"language-{lang}\">{body}</code></pre>\n",
                lang = language,
                body = body
            )
        })
    }

    /// Stylesheet for the highlight classes in the configured theme.
    pub fn stylesheet(&self) -> Result<String, HighlightError> {
        css_for_theme_with_class_style(&self.theme, CLASS_STYLE)
            .map_err(|e| HighlightError::Stylesheet(e.to_string()))
    }

    fn find_syntax(&self, language: &str) -> &SyntaxReference {
        if language.is_empty() {
            return self.syntaxes.find_syntax_plain_text();
        }

        let token = match language {
            "py" | "python3" => "python",
            "sh" | "shell" | "console" | "zsh" => "bash",
            "yml" => "yaml",
            "js" | "javascript" | "mjs" => "js",
            "dockerfile" | "docker" => "Dockerfile",
            "rs" => "rust",
            other => other,
        };

        self.syntaxes.find_syntax_by_token(token).unwrap_or_else(|| {
            tracing::debug!("No grammar for {:?}, rendering as plain text", language);
            self.syntaxes.find_syntax_plain_text()
        })
    }
}

/// Parse the language name from a code fence info string.
///
/// Only characters safe inside a class attribute are kept.
pub fn language_from_info(info: &str) -> &str {
    let lang = info.split_whitespace().next().unwrap_or("");
    let end = lang
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+' || c == '#'))
        .unwrap_or(lang.len());
    &lang[..end]
}
