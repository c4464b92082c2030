//! UDP command transport for the amplifier.
//!
//! Every command is framed as `"<counter> <command> \r\n"` and sent to the
//! amplifier from a single ephemeral socket. The protocol has no request IDs:
//! the counter tag is required by the firmware but is not echoed in a usable
//! way. A reply is therefore "whatever datagram arrives next", and sends are
//! serialised so that only one command is ever waiting for it.
//!
//! Inbound datagrams are read by a background task for the lifetime of the
//! socket. The task records the most recent message and fans it out to
//! subscribers; nothing here parses it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::TransportConfig;
use crate::protocol_constants::{
    COUNTER_PREFIX, COUNTER_SUFFIX_MAX, COUNTER_SUFFIX_MIN, INBOUND_CHANNEL_CAPACITY,
    RECV_BUFFER_SIZE, RESPONSE_TIMEOUT_MS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to the amplifier.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Creating or binding the local UDP socket failed.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// The datagram could not be sent.
    #[error("failed to send command: {0}")]
    Send(#[source] std::io::Error),
}

/// Convenient Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Lifecycle of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No socket has been created yet.
    Unopened,
    /// Socket bound and receive task running.
    Open,
    /// Socket released. The next send re-opens it.
    Closed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Sends framed commands to the amplifier.
///
/// `AmplifierClient` depends on this trait rather than on the UDP
/// implementation so tests can record the exact command stream.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Binds the local endpoint. Idempotent when already open.
    async fn open(&self) -> TransportResult<()>;

    /// Sends one command body and optionally waits for any reply.
    ///
    /// Opens the transport first if needed. Returns `Ok(None)` when no reply
    /// arrived in time or when `await_response` is false.
    async fn send(&self, body: &str, await_response: bool) -> TransportResult<Option<String>>;

    /// Releases the socket. Idempotent.
    async fn close(&self);

    /// Current lifecycle state.
    fn state(&self) -> TransportState;
}

// ─────────────────────────────────────────────────────────────────────────────
// Framing
// ─────────────────────────────────────────────────────────────────────────────

/// Generates the protocol counter tag, e.g. `0s2a47`.
///
/// Collisions are harmless; the tag is not used for correlation.
pub fn generate_counter() -> String {
    let suffix = rand::thread_rng().gen_range(COUNTER_SUFFIX_MIN..=COUNTER_SUFFIX_MAX);
    format!("{}{}", COUNTER_PREFIX, suffix)
}

/// Builds the full datagram text for a command body.
pub fn frame_command(counter: &str, body: &str) -> String {
    format!("{} {} \r\n", counter, body)
}

// ─────────────────────────────────────────────────────────────────────────────
// UDP Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Socket and receive task owned while the transport is open.
#[derive(Default)]
struct Link {
    socket: Option<Arc<UdpSocket>>,
    recv_task: Option<JoinHandle<()>>,
}

impl Link {
    fn is_stale(&self) -> bool {
        self.recv_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
    }

    fn shutdown(&mut self) -> bool {
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }
        self.socket.take().is_some()
    }
}

/// UDP transport with lazy open and a single serialisation point.
///
/// The `link` mutex is held for the whole send-and-wait window, so at most
/// one command is in flight at any time.
pub struct UdpCommandTransport {
    host: String,
    port: u16,
    response_timeout: Duration,
    link: tokio::sync::Mutex<Link>,
    state: Mutex<TransportState>,
    latest_response: Arc<Mutex<Option<String>>>,
    inbound_tx: broadcast::Sender<String>,
}

impl UdpCommandTransport {
    /// Creates an unopened transport targeting `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let (inbound_tx, _) = broadcast::channel(INBOUND_CHANNEL_CAPACITY);
        Self {
            host: host.into(),
            port,
            response_timeout: Duration::from_millis(RESPONSE_TIMEOUT_MS),
            link: tokio::sync::Mutex::new(Link::default()),
            state: Mutex::new(TransportState::Unopened),
            latest_response: Arc::new(Mutex::new(None)),
            inbound_tx,
        }
    }

    /// Creates a transport from configuration.
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.host.clone(), config.port)
            .with_response_timeout(Duration::from_millis(config.response_timeout_ms))
    }

    /// Overrides how long a send waits for a reply.
    #[must_use]
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Text of the most recent datagram received from anyone.
    pub fn latest_response(&self) -> Option<String> {
        self.latest_response.lock().clone()
    }

    /// Subscribes to raw inbound datagrams.
    ///
    /// Messages are delivered unparsed; the device's push format is not trusted.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inbound_tx.subscribe()
    }

    /// Returns the open socket, creating it and its receive task if needed.
    ///
    /// A socket whose receive task has stopped is replaced.
    fn ensure_open(&self, link: &mut Link) -> TransportResult<Arc<UdpSocket>> {
        if link.is_stale() {
            log::warn!("[Transport] Receive task stopped, rebinding socket");
            link.shutdown();
        }

        if let Some(socket) = &link.socket {
            return Ok(Arc::clone(socket));
        }

        let socket = Arc::new(create_socket()?);
        if let Ok(addr) = socket.local_addr() {
            log::info!(
                "[Transport] Bound {} for amplifier at {}:{}",
                addr,
                self.host,
                self.port
            );
        }

        link.recv_task = Some(tokio::spawn(receive_loop(
            Arc::clone(&socket),
            Arc::clone(&self.latest_response),
            self.inbound_tx.clone(),
        )));
        link.socket = Some(Arc::clone(&socket));
        *self.state.lock() = TransportState::Open;

        Ok(socket)
    }
}

#[async_trait]
impl CommandTransport for UdpCommandTransport {
    async fn open(&self) -> TransportResult<()> {
        let mut link = self.link.lock().await;
        self.ensure_open(&mut link).map(|_| ())
    }

    async fn send(&self, body: &str, await_response: bool) -> TransportResult<Option<String>> {
        let mut link = self.link.lock().await;
        let socket = self.ensure_open(&mut link)?;

        let payload = frame_command(&generate_counter(), body);

        // Subscribe before sending so a fast reply is not missed.
        let mut inbound = self.inbound_tx.subscribe();

        log::debug!("[Transport] Sending command: {}", payload.trim_end());
        socket
            .send_to(payload.as_bytes(), (self.host.as_str(), self.port))
            .await
            .map_err(TransportError::Send)?;

        if !await_response {
            return Ok(None);
        }

        match timeout(self.response_timeout, inbound.recv()).await {
            Ok(Ok(message)) => Ok(Some(message)),
            Ok(Err(RecvError::Lagged(skipped))) => {
                log::debug!("[Transport] Skipped {} inbound message(s)", skipped);
                Ok(self.latest_response())
            }
            Ok(Err(RecvError::Closed)) => Ok(None),
            Err(_) => {
                log::warn!("[Transport] Timeout waiting for response to command: {}", body);
                Ok(None)
            }
        }
    }

    async fn close(&self) {
        let mut link = self.link.lock().await;
        if link.shutdown() {
            log::info!("[Transport] Closed socket for {}:{}", self.host, self.port);
        }
        let mut state = self.state.lock();
        if *state == TransportState::Open {
            *state = TransportState::Closed;
        }
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }
}

impl Drop for UdpCommandTransport {
    fn drop(&mut self) {
        self.link.get_mut().shutdown();
    }
}

/// Creates the ephemeral UDP socket used for both send and receive.
fn create_socket() -> TransportResult<UdpSocket> {
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(TransportError::SocketBind)?;

    // Set non-blocking before converting to tokio socket
    socket
        .set_nonblocking(true)
        .map_err(TransportError::SocketBind)?;

    socket
        .bind(&bind_addr.into())
        .map_err(TransportError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(TransportError::SocketBind)
}

/// Reads inbound datagrams until the socket fails or the task is aborted.
async fn receive_loop(
    socket: Arc<UdpSocket>,
    latest: Arc<Mutex<Option<String>>>,
    tx: broadcast::Sender<String>,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let message = String::from_utf8_lossy(&buf[..len]).into_owned();
                log::debug!("[Transport] Received from {}: {}", src, message.trim_end());
                *latest.lock() = Some(message.clone());
                if tx.send(message).is_err() {
                    log::trace!("[Transport] No inbound subscribers");
                }
            }
            // ICMP port-unreachable surfaces as a reset on some platforms.
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionRefused
                ) =>
            {
                log::debug!("[Transport] Ignoring receive error: {}", e);
            }
            Err(e) => {
                log::warn!("[Transport] Receive loop stopped: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    /// Binds a loopback socket standing in for the amplifier.
    async fn fake_amp() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    async fn recv_text(socket: &UdpSocket) -> (String, SocketAddr) {
        let mut buf = [0u8; 256];
        let (len, src) = socket.recv_from(&mut buf).await.unwrap();
        (String::from_utf8_lossy(&buf[..len]).into_owned(), src)
    }

    #[test]
    fn counter_has_prefix_and_two_digits() {
        for _ in 0..100 {
            let counter = generate_counter();
            assert!(counter.starts_with("0s2a"));
            let suffix: u8 = counter[4..].parse().unwrap();
            assert!((10..=99).contains(&suffix));
            assert_eq!(counter.len(), 6);
        }
    }

    #[test]
    fn frames_command() {
        assert_eq!(
            frame_command("0s2a42", "c4.amp.chvol 01 be"),
            "0s2a42 c4.amp.chvol 01 be \r\n"
        );
    }

    #[tokio::test]
    async fn lazy_open_on_first_send() {
        let (amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port);
        assert_eq!(transport.state(), TransportState::Unopened);

        let reply = transport.send("c4.amp.bass 01 03", false).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(transport.state(), TransportState::Open);

        let (text, _) = recv_text(&amp).await;
        assert!(text.starts_with("0s2a"));
        assert!(text.ends_with(" c4.amp.bass 01 03 \r\n"));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let (_amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port);
        transport.open().await.unwrap();
        transport.open().await.unwrap();
        assert_eq!(transport.state(), TransportState::Open);
    }

    #[tokio::test]
    async fn returns_reply_text() {
        let (amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port)
            .with_response_timeout(Duration::from_millis(500));

        let responder = tokio::spawn(async move {
            let (_, src) = recv_text(&amp).await;
            amp.send_to(b"0s2a10 c4.amp.chvol 01 be OK\r\n", src).await.unwrap();
        });

        let reply = transport.send("c4.amp.chvol 01 be", true).await.unwrap();
        responder.await.unwrap();

        assert_eq!(reply.as_deref(), Some("0s2a10 c4.amp.chvol 01 be OK\r\n"));
        assert_eq!(
            transport.latest_response().as_deref(),
            Some("0s2a10 c4.amp.chvol 01 be OK\r\n")
        );
    }

    #[tokio::test]
    async fn timeout_yields_none() {
        let (_amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port)
            .with_response_timeout(Duration::from_millis(100));

        let start = Instant::now();
        let reply = transport.send("c4.amp.treble 02 -3", true).await.unwrap();
        assert!(reply.is_none());
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn subscribers_see_inbound_datagrams() {
        let (amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port);
        let mut inbound = transport.subscribe();

        transport.send("c4.amp.out 01 02", false).await.unwrap();
        let (_, src) = recv_text(&amp).await;
        amp.send_to(b"push message", src).await.unwrap();

        let message = timeout(Duration::from_secs(1), inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, "push message");
    }

    #[tokio::test]
    async fn close_then_send_reopens() {
        let (amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port);

        transport.open().await.unwrap();
        transport.close().await;
        assert_eq!(transport.state(), TransportState::Closed);
        transport.close().await;
        assert_eq!(transport.state(), TransportState::Closed);

        transport.send("c4.amp.out 01 00", false).await.unwrap();
        assert_eq!(transport.state(), TransportState::Open);
        let (text, _) = recv_text(&amp).await;
        assert!(text.contains("c4.amp.out 01 00"));
    }

    #[tokio::test]
    async fn stopped_receive_task_rebinds_on_next_send() {
        let (amp, port) = fake_amp().await;
        let transport = UdpCommandTransport::new("127.0.0.1", port)
            .with_response_timeout(Duration::from_millis(500));
        transport.open().await.unwrap();

        {
            let link = transport.link.lock().await;
            let task = link.recv_task.as_ref().unwrap();
            task.abort();
            while !task.is_finished() {
                tokio::task::yield_now().await;
            }
        }

        let responder = tokio::spawn(async move {
            let (_, src) = recv_text(&amp).await;
            amp.send_to(b"OK\r\n", src).await.unwrap();
        });

        let reply = transport.send("c4.amp.out 01 01", true).await.unwrap();
        responder.await.unwrap();

        assert_eq!(reply.as_deref(), Some("OK\r\n"));
        assert_eq!(transport.state(), TransportState::Open);
        assert!(!transport.link.lock().await.is_stale());
    }

    #[tokio::test]
    async fn close_before_open_stays_unopened() {
        let transport = UdpCommandTransport::new("127.0.0.1", 9);
        transport.close().await;
        assert_eq!(transport.state(), TransportState::Unopened);
    }

    #[tokio::test]
    async fn concurrent_sends_never_overlap_wait_windows() {
        let (amp, port) = fake_amp().await;
        let window = Duration::from_millis(200);
        let transport = Arc::new(
            UdpCommandTransport::new("127.0.0.1", port).with_response_timeout(window),
        );

        // The fake amp never answers, so each send holds the lock for the full window.
        let recorder = tokio::spawn(async move {
            let mut arrivals = Vec::new();
            for _ in 0..2 {
                recv_text(&amp).await;
                arrivals.push(Instant::now());
            }
            arrivals
        });

        let a = Arc::clone(&transport);
        let b = Arc::clone(&transport);
        let (ra, rb) = tokio::join!(
            async move { a.send("c4.amp.bass 01 01", true).await },
            async move { b.send("c4.amp.bass 02 01", true).await },
        );
        assert!(ra.unwrap().is_none());
        assert!(rb.unwrap().is_none());

        let arrivals = recorder.await.unwrap();
        let gap = arrivals[1].duration_since(arrivals[0]);
        assert!(
            gap >= window - Duration::from_millis(20),
            "second command sent {:?} after the first, inside its wait window",
            gap
        );
    }
}
