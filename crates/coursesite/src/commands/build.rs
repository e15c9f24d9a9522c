//! Static site build command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use coursesite_static::StaticBuilder;

use crate::settings::Settings;
use crate::site;

/// Run the build command.
pub async fn run(root: &Path, settings: &Settings) -> Result<()> {
    tracing::info!("Building static site...");

    let project = site::configure(settings)?;
    let builder = Arc::new(StaticBuilder::new(root, Arc::new(project.site))?);

    let result = tokio::task::spawn_blocking(move || builder.build()).await??;

    tracing::info!(
        "Built {} pages and copied {} files in {}ms",
        result.pages,
        result.copied,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
