//! Passthrough copying of static files.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{DirConfig, PassthroughRule};
use crate::glob::to_slash;

/// Errors that can occur while copying passthrough files.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Copy every file matched by `rules` into the output directory.
///
/// Paths are relative to `root`. Files under the input directory are placed
/// at the same path relative to the output directory; files already inside
/// the output directory are left where they are. Returns the number of files
/// copied.
pub fn copy_passthrough(
    root: &Path,
    dir: &DirConfig,
    rules: &[PassthroughRule],
) -> Result<usize, CopyError> {
    let mut copied = 0;

    for rule in rules {
        let base = root.join(rule.glob.base());
        if !base.exists() {
            if rule.glob.has_wildcards() {
                tracing::debug!("No files for passthrough pattern {}", rule.glob.as_str());
            } else {
                tracing::warn!("Passthrough source not found: {}", base.display());
            }
            continue;
        }

        for entry in WalkDir::new(&base)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if rule.glob.has_wildcards() && !rule.glob.is_match_path(relative) {
                continue;
            }

            let Some(destination) = destination_for(root, dir, relative) else {
                tracing::debug!("{} is already in the output tree", relative.display());
                continue;
            };

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|source| CopyError::Copy {
                    from: path.to_path_buf(),
                    to: destination.clone(),
                    source,
                })?;
            }

            fs::copy(path, &destination).map_err(|source| CopyError::Copy {
                from: path.to_path_buf(),
                to: destination.clone(),
                source,
            })?;

            tracing::debug!("Copied {}", to_slash(relative));
            copied += 1;
        }
    }

    Ok(copied)
}

/// Output location for a project-relative source file.
///
/// `None` when the file already lives in the output directory.
fn destination_for(root: &Path, dir: &DirConfig, relative: &Path) -> Option<PathBuf> {
    let output = crate::config::normalize(&dir.output);
    if relative.starts_with(&output) {
        return None;
    }

    let input = crate::config::normalize(&dir.input);
    let inner = relative.strip_prefix(&input).unwrap_or(relative);

    Some(root.join(output).join(inner))
}
