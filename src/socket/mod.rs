//! Shared real-time connection, one per process.
//!
//! The channel is a plain WebSocket. A Socket.IO server speaks its own
//! protocol under `/socket.io/`, so pointing this at one will not open.
//!
//! DESIGN
//! ======
//! `ConnectionManager` owns a `OnceLock<Arc<Connection>>`: the first
//! `handle()` spawns the connection driver on the current tokio runtime,
//! every later call clones the same `Arc`. `get_or_init` serializes
//! concurrent first calls, so exactly one connection attempt is made.
//!
//! The driver task owns the WebSocket. It talks to the handle through a
//! `watch` (state), a `broadcast` (inbound text), an `mpsc` (outbound
//! text) and a `Notify` (shutdown). There is no reconnect; a dropped or
//! failed connection stays that way until the process restarts.
//!
//! A process-wide manager is installed once at startup with [`install`]
//! and reached through [`get_socket`] and [`shutdown`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::SocketConfig;

const INBOUND_CAPACITY: usize = 64;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket manager not installed")]
    NotInstalled,
    #[error("socket manager already installed")]
    AlreadyInstalled,
    #[error("socket handle requested outside a tokio runtime")]
    NoRuntime,
    #[error("socket connect failed: {0}")]
    Connect(String),
    #[error("socket closed")]
    Closed,
    #[error("timed out waiting for socket to open")]
    Timeout,
}

// =============================================================================
// CONNECTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Failed(String),
}

impl ConnectionState {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// Handle to the shared connection. Open, or still pending.
pub struct Connection {
    url: Url,
    state: Arc<watch::Sender<ConnectionState>>,
    inbound: broadcast::Sender<String>,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Arc<Notify>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    fn spawn(runtime: &Handle, url: &Url) -> Self {
        let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let driver = runtime.spawn(drive(
            url.to_string(),
            Arc::clone(&state),
            inbound.clone(),
            outbound_rx,
            Arc::clone(&shutdown),
        ));

        Self { url: url.clone(), state, inbound, outbound, shutdown, driver: Mutex::new(Some(driver)) }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receive inbound text frames from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inbound.subscribe()
    }

    /// Queue a text frame. Frames queued while connecting go out once open.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::Closed`] once the connection closed or failed.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SocketError> {
        if self.state.borrow().is_terminal() {
            return Err(SocketError::Closed);
        }
        self.outbound.send(text.into()).map_err(|_| SocketError::Closed)
    }

    /// Wait until the connection leaves `Connecting`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connect failed, the connection was closed,
    /// or `timeout` passed first.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), SocketError> {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(timeout, rx.wait_for(|s| *s != ConnectionState::Connecting))
            .await
            .map_err(|_| SocketError::Timeout)?
            .map(|state| (*state).clone())
            .map_err(|_| SocketError::Closed)?;

        match settled {
            ConnectionState::Open => Ok(()),
            ConnectionState::Failed(reason) => Err(SocketError::Connect(reason)),
            ConnectionState::Connecting | ConnectionState::Closed => Err(SocketError::Closed),
        }
    }

    /// Resolve once the connection has closed or failed.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(ConnectionState::is_terminal).await;
    }

    /// Close the connection and wait for the driver to finish. Idempotent.
    ///
    /// Concurrent callers all return after the close has gone out. A
    /// `Failed` state keeps its reason.
    pub async fn close(&self) {
        self.shutdown.notify_one();
        let driver = match self.driver.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(driver) = driver else {
            // Another caller owns the driver and settles the state.
            self.closed().await;
            return;
        };
        if let Err(e) = driver.await {
            tracing::warn!(error = %e, "socket driver task ended abnormally");
        }
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = ConnectionState::Closed;
            true
        });
    }
}

async fn drive(
    url: String,
    state: Arc<watch::Sender<ConnectionState>>,
    inbound: broadcast::Sender<String>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shutdown: Arc<Notify>,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        () = shutdown.notified() => {
            state.send_replace(ConnectionState::Closed);
            return;
        }
    };

    let mut ws = match connected {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::warn!(%url, error = %e, "socket connect failed");
            state.send_replace(ConnectionState::Failed(e.to_string()));
            return;
        }
    };
    tracing::info!(%url, "socket connected");
    state.send_replace(ConnectionState::Open);

    loop {
        tokio::select! {
            () = shutdown.notified() => {
                while let Ok(text) = outbound.try_recv() {
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                if let Err(e) = ws.close(None).await {
                    tracing::debug!(error = %e, "socket close handshake failed");
                }
                break;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = ws.send(Message::Text(text.into())).await {
                    tracing::warn!(%url, error = %e, "socket send failed");
                    state.send_replace(ConnectionState::Failed(e.to_string()));
                    return;
                }
            }
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    // No subscribers is fine; frames are simply dropped.
                    let _ = inbound.send(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(%url, "socket closed by peer");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(%url, error = %e, "socket read failed");
                    state.send_replace(ConnectionState::Failed(e.to_string()));
                    return;
                }
            }
        }
    }

    state.send_replace(ConnectionState::Closed);
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct ConnectionManager {
    config: SocketConfig,
    slot: OnceLock<Arc<Connection>>,
    attempts: AtomicUsize,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(config: SocketConfig) -> Self {
        Self { config, slot: OnceLock::new(), attempts: AtomicUsize::new(0) }
    }

    /// Return the shared connection, opening it on first use.
    ///
    /// A closed connection is returned as-is; it is never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::NoRuntime`] if the first call happens outside
    /// a tokio runtime.
    pub fn handle(&self) -> Result<Arc<Connection>, SocketError> {
        if let Some(connection) = self.slot.get() {
            return Ok(Arc::clone(connection));
        }

        let runtime = Handle::try_current().map_err(|_| SocketError::NoRuntime)?;
        let connection = self.slot.get_or_init(|| {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tracing::info!(url = %self.config.url, "opening shared socket");
            Arc::new(Connection::spawn(&runtime, &self.config.url))
        });
        Ok(Arc::clone(connection))
    }

    /// Number of connections opened by this manager: zero or one.
    #[must_use]
    pub fn connection_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Close the shared connection if one was ever opened.
    pub async fn shutdown(&self) {
        if let Some(connection) = self.slot.get() {
            connection.close().await;
        }
    }
}

// =============================================================================
// PROCESS-WIDE ACCESSOR
// =============================================================================

static MANAGER: OnceLock<ConnectionManager> = OnceLock::new();

/// Install the process-wide manager.
///
/// # Errors
///
/// Returns [`SocketError::AlreadyInstalled`] on a second call.
pub fn install(config: SocketConfig) -> Result<&'static ConnectionManager, SocketError> {
    MANAGER
        .set(ConnectionManager::new(config))
        .map_err(|_| SocketError::AlreadyInstalled)?;
    MANAGER.get().ok_or(SocketError::NotInstalled)
}

/// The shared connection of the process-wide manager.
///
/// # Errors
///
/// Returns [`SocketError::NotInstalled`] before [`install`], or any error
/// from [`ConnectionManager::handle`].
pub fn get_socket() -> Result<Arc<Connection>, SocketError> {
    MANAGER.get().ok_or(SocketError::NotInstalled)?.handle()
}

/// Close the process-wide connection, if any.
pub async fn shutdown() {
    if let Some(manager) = MANAGER.get() {
        manager.shutdown().await;
    }
}
