//! Listener endpoint (server role).
//!
//! Binds one socket and serves one peer at a time. The accept loop runs in a
//! background task and waits at most `poll_interval` per accept attempt
//! before re-checking the running flag, so [`Listener::stop`] is observed
//! promptly. Once a peer is accepted the same task runs the receive loop for
//! it; no other connection is accepted until that peer leaves.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

use murmur_cipher::{Key, StreamCipher};
use tokio::{
    net::{TcpListener, TcpSocket, TcpStream},
    sync::{mpsc, watch},
    task::JoinHandle,
    time::timeout,
};

use crate::{
    EndpointConfig, EndpointEvent, ListenerState, NetError,
    addr::resolve,
    event::client_sender,
    worker::{ReceiveOutcome, Shared, Worker, preview, stop_signal},
};

/// Listen backlog. Later arrivals wait here while a peer is being served.
const LISTEN_BACKLOG: u32 = 1;

/// Server-role endpoint.
///
/// Created bound and accepting by [`Listener::start`]. Dropping the handle
/// stops the worker; [`Listener::stop`] additionally waits for it to exit.
pub struct Listener {
    shared: Arc<Shared<ListenerState>>,
    cipher: Arc<StreamCipher>,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Listener {
    /// Bind `host:port`, start accepting, and return the handle together
    /// with its event stream.
    ///
    /// Port `0` binds an ephemeral port; see [`Listener::local_addr`].
    ///
    /// # Errors
    ///
    /// - `NetError::InvalidAddress` if `host` does not resolve
    /// - `NetError::Bind` if the socket cannot be bound or put in listen mode
    pub async fn start(
        host: &str,
        port: u16,
        cipher: Arc<StreamCipher>,
        config: EndpointConfig,
    ) -> Result<(Self, mpsc::Receiver<EndpointEvent>), NetError> {
        let shared = Arc::new(Shared::new(ListenerState::Binding));

        let listener = bind(host, port).await?;
        let local_addr = listener.local_addr().map_err(|e| NetError::Bind {
            addr: format!("{host}:{port}"),
            reason: e.to_string(),
        })?;

        shared.transition(ListenerState::Accepting);
        tracing::info!(%local_addr, key = %cipher.masked_key(), "listener started");

        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker =
            Worker { cipher: Arc::clone(&cipher), events: events_tx, shutdown: shutdown_rx, config };

        let handle = tokio::spawn(accept_loop(listener, Arc::clone(&shared), worker));

        let listener = Self {
            shared,
            cipher,
            local_addr,
            shutdown: shutdown_tx,
            worker: Mutex::new(Some(handle)),
        };
        Ok((listener, events_rx))
    }

    /// Address the listening socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.shared.state()
    }

    /// Whether a peer is currently attached.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ListenerState::Connected { .. })
    }

    /// Whether the listener has not been stopped.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Cipher shared with the worker.
    pub fn cipher(&self) -> &Arc<StreamCipher> {
        &self.cipher
    }

    /// Rotate the key. Takes effect for the next send and the next read.
    pub fn set_key(&self, key: Key) {
        self.cipher.set_key(key);
        tracing::info!(key = %self.cipher.masked_key(), "listener key rotated");
    }

    /// Encode `text` and write it to the current peer.
    ///
    /// A failed write is reported but does not close the connection.
    ///
    /// # Errors
    ///
    /// - `NetError::NotConnected` if no peer is attached
    /// - `NetError::Transport` if the write fails
    pub async fn send(&self, text: &str) -> Result<(), NetError> {
        let ListenerState::Connected { peer } = self.state() else {
            return Err(NetError::NotConnected);
        };

        let wire = self.cipher.encode(text);
        match self.shared.write(&wire).await {
            Ok(()) => {
                tracing::debug!(%peer, bytes = wire.len(), wire = %preview(&wire), "sent");
                Ok(())
            },
            Err(e) => {
                tracing::warn!(%peer, "send failed: {e}");
                Err(e)
            },
        }
    }

    /// Close the peer socket and the listening socket.
    ///
    /// Idempotent: later calls return immediately.
    pub async fn stop(&self) {
        if !self.shared.stop_running() {
            return;
        }

        self.shutdown.send_replace(true);
        self.shared.close_writer().await;

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = worker
            && let Err(e) = handle.await
        {
            tracing::warn!("listener worker ended abnormally: {e}");
        }

        self.shared.transition(ListenerState::Closed);
        tracing::info!(local_addr = %self.local_addr, "listener stopped");
    }
}

/// Create, configure and bind the listening socket.
async fn bind(host: &str, port: u16) -> Result<TcpListener, NetError> {
    let addr = resolve(host, port).await?;
    let bind_error = |e: std::io::Error| NetError::Bind { addr: addr.to_string(), reason: e.to_string() };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(bind_error)?;

    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_error)
}

/// Accept peers one at a time until stopped.
async fn accept_loop(listener: TcpListener, shared: Arc<Shared<ListenerState>>, mut worker: Worker) {
    while shared.is_running() {
        let accepted = tokio::select! {
            biased;
            () = stop_signal(&mut worker.shutdown) => break,
            accepted = timeout(worker.config.poll_interval, listener.accept()) => accepted,
        };

        match accepted {
            // Poll interval elapsed, re-check the running flag
            Err(_) => {},
            Ok(Ok((stream, peer))) => serve_peer(stream, peer, &shared, &mut worker).await,
            Ok(Err(e)) => {
                tracing::warn!("accept failed: {e}");
                worker.emit(EndpointEvent::Error { message: format!("accept failed: {e}") }).await;

                tokio::select! {
                    () = stop_signal(&mut worker.shutdown) => break,
                    () = tokio::time::sleep(worker.config.poll_interval) => {},
                }
            },
        }
    }

    shared.transition(ListenerState::Closed);
    tracing::debug!("accept loop exited");
}

/// Run the receive loop for one accepted peer, then release its socket.
async fn serve_peer(
    stream: TcpStream,
    peer: SocketAddr,
    shared: &Shared<ListenerState>,
    worker: &mut Worker,
) {
    if let Err(e) = stream.set_nodelay(worker.config.nodelay) {
        tracing::debug!(%peer, "set_nodelay failed: {e}");
    }

    let (reader, writer) = stream.into_split();
    shared.attach_writer(writer).await;
    shared.transition(ListenerState::Connected { peer });
    tracing::info!(%peer, "peer connected");
    worker.emit(EndpointEvent::PeerConnected { peer_addr: peer }).await;

    let sender = client_sender(peer);
    let outcome = worker.receive(reader, shared, &sender).await;
    shared.close_writer().await;

    match outcome {
        ReceiveOutcome::Shutdown => {
            tracing::debug!(%peer, "peer connection closed by stop");
            return;
        },
        ReceiveOutcome::PeerClosed => tracing::info!(%peer, "peer disconnected"),
        ReceiveOutcome::Failed(reason) => {
            tracing::warn!(%peer, "receive failed: {reason}");
            let message = format!("connection to {peer} failed: {reason}");
            worker.emit(EndpointEvent::Error { message }).await;
        },
    }

    shared.transition(ListenerState::Accepting);
    worker.emit(EndpointEvent::PeerDisconnected).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_binds_ephemeral_port() {
        let cipher = Arc::new(StreamCipher::default());
        let (listener, _events) =
            Listener::start("127.0.0.1", 0, cipher, EndpointConfig::loopback()).await.unwrap();

        assert_ne!(listener.local_addr().port(), 0, "Should have assigned a port");
        assert_eq!(listener.state(), ListenerState::Accepting);
        listener.stop().await;
    }

    #[tokio::test]
    async fn send_without_peer_fails() {
        let cipher = Arc::new(StreamCipher::default());
        let (listener, _events) =
            Listener::start("127.0.0.1", 0, cipher, EndpointConfig::loopback()).await.unwrap();

        assert_eq!(listener.send("hello").await, Err(NetError::NotConnected));
        listener.stop().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        // A live listener on the port refuses a second bind even with SO_REUSEADDR
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let cipher = Arc::new(StreamCipher::default());
        let result = Listener::start("127.0.0.1", port, cipher, EndpointConfig::loopback()).await;
        assert!(matches!(result, Err(NetError::Bind { .. })));
    }
}
