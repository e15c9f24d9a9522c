//! Output cleanup command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use coursesite_static::StaticBuilder;

use crate::settings::Settings;
use crate::site;

/// Remove the output directory.
pub fn run(root: &Path, settings: &Settings) -> Result<()> {
    let project = site::configure(settings)?;
    let builder = StaticBuilder::new(root, Arc::new(project.site))?;

    if builder.clean()? {
        tracing::info!("Removed {}", builder.output_dir().display());
    } else {
        tracing::info!("Nothing to clean");
    }

    Ok(())
}
