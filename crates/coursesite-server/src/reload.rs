//! Reload socket messages and the browser client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages exchanged with connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Re-fetch stylesheets whose URL contains `path`
    InjectCss { path: String },

    /// Show a short notice
    Notice { text: String },

    /// Scroll position, mirrored between browsers
    Scroll { y: f64 },
}

/// A broadcast message and the client it came from.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Sending client, `None` for messages from the server
    pub origin: Option<u64>,
    pub message: ReloadMessage,
}

/// Hub for broadcasting messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<Envelope>,
    next_id: Arc<AtomicU64>,
}

impl ReloadHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Send a message to all connected browsers.
    pub fn send(&self, message: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(Envelope {
            origin: None,
            message,
        });
    }

    /// Send a message from one browser to all the others.
    pub fn send_from(&self, origin: u64, message: ReloadMessage) {
        let _ = self.sender.send(Envelope {
            origin: Some(origin),
            message,
        });
    }

    /// Subscribe to broadcast messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Identifier for a newly connected browser.
    pub fn next_client_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the browser client for the reload socket.
///
/// The client publishes its socket as `window.___browserSync___.socket` and
/// registers its handlers through `socket.on` only after `DOMContentLoaded`,
/// so a page script that replaces `socket.on` disables it.
pub fn client_script(socket_path: &str, ghost_mode: bool) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var handlers = {{}};
  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var ws = new WebSocket(scheme + location.host + '{socket_path}');

  var socket = {{
    on: function(type, handler) {{
      (handlers[type] = handlers[type] || []).push(handler);
    }},
    emit: function(type, data) {{
      if (ws.readyState === 1) {{
        ws.send(JSON.stringify(Object.assign({{ type: type }}, data)));
      }}
    }}
  }};

  window.___browserSync___ = {{ socket: socket }};

  ws.onmessage = function(event) {{
    var msg = JSON.parse(event.data);
    (handlers[msg.type] || []).forEach(function(handler) {{
      handler(msg);
    }});
  }};

  document.addEventListener('DOMContentLoaded', function() {{
    var s = window.___browserSync___.socket;

    s.on('reload', function() {{
      location.reload();
    }});

    s.on('inject_css', function(msg) {{
      document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
        if (link.href.indexOf(msg.path) !== -1) {{
          var url = new URL(link.href);
          url.searchParams.set('v', Date.now());
          link.href = url.toString();
        }}
      }});
    }});

    s.on('notice', function(msg) {{
      var el = document.createElement('div');
      el.textContent = msg.text;
      el.style.cssText = 'position:fixed;top:0;right:0;padding:8px 12px;background:#1f2328;color:#fff;font:13px sans-serif;z-index:9999';
      document.body.appendChild(el);
      setTimeout(function() {{ el.remove(); }}, 2000);
    }});

    s.on('scroll', function(msg) {{
      window.scrollTo(0, msg.y);
    }});

    if ({ghost_mode}) {{
      var pending = false;
      window.addEventListener('scroll', function() {{
        if (pending) return;
        pending = true;
        setTimeout(function() {{
          pending = false;
          s.emit('scroll', {{ y: window.scrollY }});
        }}, 100);
      }});
    }}
  }});
}})();
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(Envelope {
                origin: None,
                message: ReloadMessage::Reload,
            }) => {}
            other => panic!("Expected Reload message, got {:?}", other),
        }
    }

    #[test]
    fn hub_tags_client_messages_with_origin() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        let id = hub.next_client_id();

        hub.send_from(id, ReloadMessage::Scroll { y: 120.0 });

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.origin, Some(id));
        assert_eq!(envelope.message, ReloadMessage::Scroll { y: 120.0 });
        assert_ne!(hub.next_client_id(), id);
    }

    #[test]
    fn serializes_messages() {
        let json = serde_json::to_string(&ReloadMessage::InjectCss {
            path: "style.css".to_string(),
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"inject_css","path":"style.css"}"#);
    }

    #[test]
    fn parses_client_scroll() {
        let msg: ReloadMessage = serde_json::from_str(r#"{"type":"scroll","y":42}"#).unwrap();
        assert_eq!(msg, ReloadMessage::Scroll { y: 42.0 });
    }

    #[test]
    fn client_registers_handlers_after_load() {
        let script = client_script("/__socket", false);

        assert!(script.contains("window.___browserSync___ = { socket: socket };"));
        assert!(script.contains("'/__socket'"));
        assert!(script.contains("DOMContentLoaded"));
        assert!(script.contains("if (false)"));
    }
}
