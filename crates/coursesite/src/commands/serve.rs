//! Development server command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use coursesite_server::DevServer;
use coursesite_static::StaticBuilder;

use crate::settings::Settings;
use crate::site;

/// Build the site, then watch and serve it.
pub async fn run(
    root: &Path,
    settings: &Settings,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    let project = site::configure(settings)?;

    let mut options = project.server;
    if let Some(port) = port {
        options.port = port;
    }
    if let Some(host) = host {
        options.host = host;
    }

    tracing::info!("Starting development server on port {}", options.port);

    let builder = StaticBuilder::new(root, Arc::new(project.site))?;
    DevServer::new(options, Arc::new(builder)).start().await?;

    Ok(())
}
