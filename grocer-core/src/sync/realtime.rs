//! Push listener socket.
//!
//! A [`RealtimeChannel`] owns one background task that keeps a listener
//! socket open, sends heartbeats while connected, and hands refresh pushes
//! to a [`PushHandler`]. Dropped connections are retried with exponential
//! backoff until [`RealtimeChannel::teardown`] is called.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::protocol::{HEARTBEAT_FRAME, REFRESH_FRAME};
use super::transport::Session;

/// Default interval between heartbeat frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest heartbeat interval the listener accepts.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest first reconnect delay the listener accepts.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal. Only reached through teardown.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl RealtimeConfig {
    /// Raises intervals below [`MIN_HEARTBEAT_INTERVAL`] and
    /// [`MIN_RECONNECT_DELAY`] and keeps `max_delay >= initial_delay`.
    pub fn normalized(self) -> Self {
        let heartbeat_interval = self.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
        if heartbeat_interval != self.heartbeat_interval {
            warn!(
                "Heartbeat interval {:?} too short, using {:?}",
                self.heartbeat_interval, heartbeat_interval
            );
        }

        let initial_delay = self.reconnect.initial_delay.max(MIN_RECONNECT_DELAY);
        if initial_delay != self.reconnect.initial_delay {
            warn!(
                "Reconnect delay {:?} too short, using {:?}",
                self.reconnect.initial_delay, initial_delay
            );
        }

        Self {
            heartbeat_interval,
            reconnect: ReconnectPolicy {
                initial_delay,
                max_delay: self.reconnect.max_delay.max(initial_delay),
            },
        }
    }
}

/// An open listener socket carrying text frames.
pub trait Socket: Send + 'static {
    fn send_text(&mut self, text: &str) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Next text frame. `Ok(None)` means the peer closed the socket.
    fn next_text(&mut self) -> impl Future<Output = Result<Option<String>, SyncError>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens listener sockets.
pub trait Connector: Send + Sync + 'static {
    type Socket: Socket;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Socket, SyncError>> + Send;
}

/// Receives refresh pushes from the server.
pub trait PushHandler: Send + Sync + 'static {
    fn on_refresh_push(&self) -> impl Future<Output = ()> + Send;
}

/// Production connector over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Socket = WsSocket;

    async fn connect(&self, url: &str) -> Result<WsSocket, SyncError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| SyncError::ConnectionError(e.to_string()))?;
        Ok(WsSocket { stream })
    }
}

pub struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Socket for WsSocket {
    async fn send_text(&mut self, text: &str) -> Result<(), SyncError> {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .map_err(|e| SyncError::WebSocketError(e.to_string()))
    }

    async fn next_text(&mut self) -> Result<Option<String>, SyncError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| SyncError::WebSocketError(e.to_string()))?;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {
                    // Binary and pong frames carry nothing for us
                }
                Some(Err(e)) => return Err(SyncError::WebSocketError(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Builds the listener URL for a session.
pub fn listener_url(server_url: &str, session: &Session) -> String {
    // Convert http(s) to ws(s) if needed
    let base_url = if server_url.starts_with("http://") {
        server_url.replace("http://", "ws://")
    } else if server_url.starts_with("https://") {
        server_url.replace("https://", "wss://")
    } else if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
        format!("wss://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!(
        "{}/data/add-user-listener/{}?client_id={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(&session.signed_user_id),
        urlencoding::encode(&session.client_id)
    )
}

/// Handle to a running listener task.
///
/// Dropping the handle stops the task as well, but only `teardown` waits
/// for it to finish.
pub struct RealtimeChannel {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Spawns the listener task on the current tokio runtime.
    pub fn spawn<C, H>(connector: C, url: String, handler: Arc<H>, config: RealtimeConfig) -> Self
    where
        C: Connector,
        H: PushHandler,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let task = tokio::spawn(run(
            connector,
            url,
            handler,
            config.normalized(),
            state_tx,
            shutdown_rx,
        ));

        Self {
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stops heartbeats, closes the socket and waits for the task to end.
    ///
    /// A refresh already triggered by a push runs to completion first.
    pub async fn teardown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Realtime task ended abnormally: {}", e);
        }
    }
}

enum Event {
    Shutdown,
    Heartbeat,
    Frame(Result<Option<String>, SyncError>),
}

enum SessionEnd {
    Shutdown,
    Dropped(String),
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a request.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn set_state(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let previous = state.send_replace(next);
    if previous != next {
        info!("Realtime {} -> {}", previous, next);
    }
}

async fn run<C: Connector, H: PushHandler>(
    connector: C,
    url: String,
    handler: Arc<H>,
    config: RealtimeConfig,
    state: watch::Sender<ConnectionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures: u32 = 0;

    loop {
        set_state(&state, ConnectionState::Connecting);

        if failures > 0 {
            let delay = config.reconnect.delay_for(failures - 1);
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let connected = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            result = connector.connect(&url) => result,
        };

        let mut socket = match connected {
            Ok(socket) => socket,
            Err(e) => {
                warn!("Listener connection failed: {}", e);
                failures = failures.saturating_add(1);
                continue;
            }
        };

        set_state(&state, ConnectionState::Connected);

        match listen(&mut socket, handler.as_ref(), &config, &mut shutdown).await {
            SessionEnd::Shutdown => {
                socket.close().await;
                break;
            }
            SessionEnd::Dropped(reason) => {
                warn!("Listener connection dropped: {}", reason);
                // Backoff restarts after a successful connect.
                failures = 1;
            }
        }
    }

    set_state(&state, ConnectionState::Closed);
}

async fn listen<S: Socket, H: PushHandler>(
    socket: &mut S,
    handler: &H,
    config: &RealtimeConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let period = config.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => Event::Shutdown,
            _ = heartbeat.tick() => Event::Heartbeat,
            frame = socket.next_text() => Event::Frame(frame),
        };

        match event {
            Event::Shutdown => return SessionEnd::Shutdown,
            Event::Heartbeat => {
                if let Err(e) = socket.send_text(HEARTBEAT_FRAME).await {
                    return SessionEnd::Dropped(e.to_string());
                }
            }
            Event::Frame(Ok(Some(text))) if text == REFRESH_FRAME => {
                debug!("Refresh push received");
                handler.on_refresh_push().await;
            }
            Event::Frame(Ok(Some(text))) => debug!("Ignoring frame {:?}", text),
            Event::Frame(Ok(None)) => return SessionEnd::Dropped("closed by server".to_string()),
            Event::Frame(Err(e)) => return SessionEnd::Dropped(e.to_string()),
        }
    }
}
