//! Development server options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::snippet::SnippetRule;

/// Callback run once the server is listening, with the live options.
pub type ReadyCallback = Arc<dyn Fn(&mut DevServerOptions) + Send + Sync>;

/// Options for the development server.
///
/// Defaults enable every convenience: notices, the status page, mirrored
/// scrolling, opening a browser, CSS injection and change messages.
#[derive(Clone)]
pub struct DevServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Show a notice in the browser when files change
    pub notify: bool,

    /// Serve the status page
    pub ui: bool,

    /// Mirror scrolling between connected browsers
    pub ghost_mode: bool,

    /// Open a browser once the server is listening
    pub open: bool,

    /// Wait this long after a rebuild before telling browsers
    pub reload_delay: Duration,

    /// Ignore file events that arrive within this window of the previous one
    pub reload_debounce: Duration,

    /// Swap changed stylesheets in place instead of reloading
    pub inject_changes: bool,

    /// Send change messages to browsers at all
    pub code_sync: bool,

    /// Rewrites applied to every HTML response
    pub snippet_rules: Vec<SnippetRule>,

    /// Run once after the listener is bound
    pub ready_callbacks: Vec<ReadyCallback>,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            notify: true,
            ui: true,
            ghost_mode: true,
            open: true,
            reload_delay: Duration::ZERO,
            reload_debounce: Duration::ZERO,
            inject_changes: true,
            code_sync: true,
            snippet_rules: Vec::new(),
            ready_callbacks: Vec::new(),
        }
    }
}

impl DevServerOptions {
    /// Add a rewrite for HTML responses.
    pub fn add_snippet_rule(&mut self, rule: SnippetRule) -> &mut Self {
        self.snippet_rules.push(rule);
        self
    }

    /// Register a callback to run once the server is listening.
    pub fn on_ready<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut DevServerOptions) + Send + Sync + 'static,
    {
        self.ready_callbacks.push(Arc::new(callback));
        self
    }

    /// Run every ready callback in registration order.
    pub fn run_ready_callbacks(&mut self) {
        let callbacks = self.ready_callbacks.clone();
        for callback in &callbacks {
            callback(self);
        }
    }
}

impl fmt::Debug for DevServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevServerOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("notify", &self.notify)
            .field("ui", &self.ui)
            .field("ghost_mode", &self.ghost_mode)
            .field("open", &self.open)
            .field("reload_delay", &self.reload_delay)
            .field("reload_debounce", &self.reload_debounce)
            .field("inject_changes", &self.inject_changes)
            .field("code_sync", &self.code_sync)
            .field("snippet_rules", &self.snippet_rules)
            .field("ready_callbacks", &self.ready_callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let options = DevServerOptions::default();

        assert_eq!(options.port, 8080);
        assert!(options.notify && options.ui && options.ghost_mode && options.open);
        assert!(options.inject_changes && options.code_sync);
        assert_eq!(options.reload_delay, Duration::ZERO);
    }

    #[test]
    fn ready_callbacks_mutate_live_options() {
        let mut options = DevServerOptions::default();
        options.on_ready(|o| {
            o.notify = false;
            o.reload_delay = Duration::ZERO;
        });
        options.notify = true;
        options.reload_delay = Duration::from_millis(500);

        options.run_ready_callbacks();

        assert!(!options.notify);
        assert_eq!(options.reload_delay, Duration::ZERO);
    }

    #[test]
    fn ready_callbacks_are_idempotent() {
        let mut options = DevServerOptions::default();
        options.on_ready(|o| o.notify = false);

        options.run_ready_callbacks();
        options.run_ready_callbacks();

        assert!(!options.notify);
        assert_eq!(options.ready_callbacks.len(), 1);
    }

    #[test]
    fn debug_lists_callback_count() {
        let mut options = DevServerOptions::default();
        options.on_ready(|_| {});

        let debug = format!("{:?}", options);
        assert!(debug.contains("ready_callbacks: 1"));
    }
}
