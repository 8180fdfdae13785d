//! Client transport boundary.
//!
//! Transports are consumed through a deliberately narrow interface: send a
//! JSON-RPC envelope, get the raw JSON reply envelope back. Transports
//! that surface server-initiated traffic (progress notifications,
//! sampling requests) publish it on a broadcast channel.
//!
//! [`LoopbackTransport`] binds a client directly to an in-process
//! [`McpHandler`], which is how the engine tests its own client/server
//! pairing without pipes.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::mcp::handler::McpHandler;

/// Boxed future returned by transport operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A server-initiated message surfaced by a transport.
#[derive(Debug, Clone)]
pub struct PeerNotification {
    /// Notification method name.
    pub method: String,
    /// Notification parameters.
    pub params: Value,
}

/// Minimal "send request, get JSON reply" transport interface.
pub trait Transport: Send + Sync {
    /// Sends a JSON-RPC request envelope, resolving with the raw reply
    /// envelope.
    fn send_request(&self, envelope: Value) -> BoxFuture<'_, Result<Value>>;

    /// Sends a one-way JSON-RPC notification envelope.
    fn send_notification(&self, envelope: Value) -> BoxFuture<'_, Result<()>>;

    /// Subscribes to server-initiated notifications, if the transport
    /// surfaces them.
    fn events(&self) -> broadcast::Receiver<PeerNotification>;
}

/// Produces fresh transports sharing one underlying configuration.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn Transport> + Send + Sync>;

/// In-process transport wired straight into an [`McpHandler`].
pub struct LoopbackTransport {
    handler: Arc<McpHandler>,
    events: broadcast::Sender<PeerNotification>,
    sent_notifications: Mutex<Vec<Value>>,
}

impl LoopbackTransport {
    /// Creates a loopback transport over a handler.
    #[must_use]
    pub fn new(handler: Arc<McpHandler>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            handler,
            events,
            sent_notifications: Mutex::new(Vec::new()),
        })
    }

    /// Injects a server-initiated notification, as a live transport would
    /// when the peer pushes one mid-call.
    pub fn emit(&self, notification: PeerNotification) {
        // A send error only means no receiver is currently subscribed.
        let _ = self.events.send(notification);
    }

    /// Returns the notifications the client has sent so far.
    #[must_use]
    pub fn sent_notifications(&self) -> Vec<Value> {
        self.sent_notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Transport for LoopbackTransport {
    fn send_request(&self, envelope: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move { Ok(self.handler.handle_value(&envelope)) })
    }

    fn send_notification(&self, envelope: Value) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.sent_notifications
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(envelope);
            Ok(())
        })
    }

    fn events(&self) -> broadcast::Receiver<PeerNotification> {
        self.events.subscribe()
    }
}
