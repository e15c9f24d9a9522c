//! Development server implementation.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::{broadcast, RwLock};
use tower_http::services::ServeDir;

use coursesite_static::{BuildError, BuildResult, StaticBuilder};

use crate::options::DevServerOptions;
use crate::reload::{client_script, ReloadHub, ReloadMessage};
use crate::snippet::{apply_snippet_rules, inject_client};
use crate::watcher::{FileWatcher, WatchEvent};

/// Path of the reload socket.
pub const SOCKET_PATH: &str = "/__coursesite/socket";

/// Path of the status page.
pub const UI_PATH: &str = "/__coursesite/ui";

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Build task failed: {0}")]
    TaskError(String),
}

/// Shared server state.
struct ServerState {
    options: RwLock<DevServerOptions>,
    hub: ReloadHub,
    output_dir: PathBuf,
}

/// Development server.
pub struct DevServer {
    options: DevServerOptions,
    builder: Arc<StaticBuilder>,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(options: DevServerOptions, builder: Arc<StaticBuilder>) -> Self {
        Self { options, builder }
    }

    /// Build the site, then serve it until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let result = rebuild(&self.builder).await?;
        tracing::info!("Built {} pages in {}ms", result.pages, result.duration_ms);

        let host = self.options.host.clone();
        let port = self.options.port;
        let debounce = self.options.reload_debounce;

        let state = Arc::new(ServerState {
            options: RwLock::new(self.options),
            hub: ReloadHub::new(),
            output_dir: self.builder.output_dir(),
        });

        let watch_paths = vec![self.builder.input_dir(), self.builder.includes_dir()];
        let ignored = [state.output_dir.clone()];
        let (watcher, mut rx) = FileWatcher::new(&watch_paths, debounce, &ignored)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let state_clone = Arc::clone(&state);
        let builder = Arc::clone(&self.builder);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&state_clone, &builder, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| ServerError::BindError(format!("{}:{}", host, port), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("{}:{}", host, port), e.to_string()))?;

        let open = {
            let mut options = state.options.write().await;
            options.run_ready_callbacks();
            options.open
        };

        let url = format!("http://{}", addr);
        tracing::info!("Serving {} at {}", state.output_dir.display(), url);

        if open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr.to_string(), e.to_string()))?;

        Ok(())
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(SOCKET_PATH, get(ws_handler))
        .route(UI_PATH, get(ui_handler))
        .fallback_service(ServeDir::new(&state.output_dir))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rewrite_html,
        ))
        .with_state(state)
}

async fn rebuild(builder: &Arc<StaticBuilder>) -> Result<BuildResult, ServerError> {
    let builder = Arc::clone(builder);
    let result = tokio::task::spawn_blocking(move || builder.build())
        .await
        .map_err(|e| ServerError::TaskError(e.to_string()))??;
    Ok(result)
}

/// Messages to send to browsers for a change.
pub fn change_messages(event: &WatchEvent, options: &DevServerOptions) -> Vec<ReloadMessage> {
    if !options.code_sync {
        return Vec::new();
    }

    let name = event
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut messages = Vec::new();

    if options.notify {
        messages.push(ReloadMessage::Notice {
            text: format!("Updated {}", name),
        });
    }

    match event {
        WatchEvent::StyleModified(_) if options.inject_changes => {
            messages.push(ReloadMessage::InjectCss { path: name });
        }
        _ => messages.push(ReloadMessage::Reload),
    }

    messages
}

/// Handle file watch events.
async fn handle_watch_event(
    state: &ServerState,
    builder: &Arc<StaticBuilder>,
    event: WatchEvent,
) {
    tracing::info!("Changed: {}", event.path().display());

    match rebuild(builder).await {
        Ok(result) => {
            tracing::info!("Rebuilt {} pages in {}ms", result.pages, result.duration_ms);
        }
        Err(e) => {
            tracing::error!("Rebuild failed: {}", e);
            return;
        }
    }

    let (messages, delay) = {
        let options = state.options.read().await;
        (change_messages(&event, &options), options.reload_delay)
    };

    if messages.is_empty() {
        return;
    }

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    for message in messages {
        state.hub.send(message);
    }
}

/// Inject the reload client and apply the snippet rules to HTML responses.
async fn rewrite_html(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));

    if !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let html = {
        let options = state.options.read().await;
        let script = client_script(SOCKET_PATH, options.ghost_mode);
        apply_snippet_rules(&inject_client(&html, &script), &options.snippet_rules)
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Handler for the status page.
async fn ui_handler(State(state): State<Arc<ServerState>>) -> Response {
    let options = state.options.read().await;
    if !options.ui {
        return StatusCode::NOT_FOUND.into_response();
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>coursesite dev server</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 640px; margin: 2rem auto; }}
    td {{ padding: 0.25rem 1rem 0.25rem 0; }}
  </style>
</head>
<body>
  <h1>coursesite dev server</h1>
  <table>
    <tr><td>Serving</td><td>{}</td></tr>
    <tr><td>Connected browsers</td><td>{}</td></tr>
    <tr><td>Notify</td><td>{}</td></tr>
    <tr><td>Ghost mode</td><td>{}</td></tr>
    <tr><td>Inject changes</td><td>{}</td></tr>
    <tr><td>Code sync</td><td>{}</td></tr>
    <tr><td>Reload delay</td><td>{}ms</td></tr>
  </table>
</body>
</html>"#,
        state.output_dir.display(),
        state.hub.subscriber_count(),
        options.notify,
        options.ghost_mode,
        options.inject_changes,
        options.code_sync,
        options.reload_delay.as_millis(),
    ))
    .into_response()
}

/// Handler for the reload socket.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a socket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let id = state.hub.next_client_id();
    let mut rx = state.hub.subscribe();

    let Ok(msg) = serde_json::to_string(&ReloadMessage::Connected) else {
        return;
    };
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => handle_client_message(&state, id, text.as_str()).await,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            outgoing = rx.recv() => match outgoing {
                Ok(envelope) => {
                    if envelope.origin == Some(id) {
                        continue;
                    }
                    let Ok(json) = serde_json::to_string(&envelope.message) else {
                        continue;
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Client {} skipped {} messages", id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("Client {} disconnected", id);
}

/// Rebroadcast scroll positions when ghost mode is on.
async fn handle_client_message(state: &ServerState, id: u64, text: &str) {
    let Ok(message) = serde_json::from_str::<ReloadMessage>(text) else {
        tracing::debug!("Ignoring client message: {}", text);
        return;
    };

    if let ReloadMessage::Scroll { .. } = message {
        if state.options.read().await.ghost_mode {
            state.hub.send_from(id, message);
        }
    }
}
