//! Development server for coursesite.
//!
//! Serves the build output, rebuilds on file changes and carries a small
//! reload socket whose behaviour is controlled by [`DevServerOptions`].

pub mod options;
pub mod reload;
pub mod server;
pub mod snippet;
pub mod watcher;

pub use options::{DevServerOptions, ReadyCallback};
pub use reload::{client_script, ReloadHub, ReloadMessage};
pub use server::{change_messages, DevServer, ServerError, SOCKET_PATH, UI_PATH};
pub use snippet::{apply_snippet_rules, inject_client, Placement, SnippetRule};
pub use watcher::{FileWatcher, WatchEvent};
