//! Initiator endpoint (client role).
//!
//! Connects once, without retry. On success a background task runs the
//! receive loop until the peer closes, a read fails, or
//! [`Initiator::disconnect`] is called. Whichever happens first posts the
//! single [`EndpointEvent::PeerDisconnected`] for the connection.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use murmur_cipher::{Key, StreamCipher};
use tokio::{
    net::{TcpStream, tcp::OwnedReadHalf},
    sync::{mpsc, watch},
    task::JoinHandle,
    time::timeout,
};

use crate::{
    EndpointConfig, EndpointEvent, InitiatorState, NetError, SERVER_SENDER,
    addr::resolve,
    worker::{ReceiveOutcome, Shared, Worker, preview},
};

/// Client-role endpoint.
pub struct Initiator {
    shared: Arc<Shared<InitiatorState>>,
    cipher: Arc<StreamCipher>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    /// Used only for the notice posted by [`Initiator::disconnect`].
    events: mpsc::Sender<EndpointEvent>,
    /// Set by whoever posts the connection's `PeerDisconnected`.
    disconnect_notified: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Initiator {
    /// Connect to `host:port` and start the receive loop.
    ///
    /// # Errors
    ///
    /// - `NetError::InvalidAddress` if `host` does not resolve
    /// - `NetError::Connect` if the peer refuses, is unreachable, or the
    ///   handshake exceeds `connect_timeout`
    pub async fn connect(
        host: &str,
        port: u16,
        cipher: Arc<StreamCipher>,
        config: EndpointConfig,
    ) -> Result<(Self, mpsc::Receiver<EndpointEvent>), NetError> {
        let addr = resolve(host, port).await?;
        let shared = Arc::new(Shared::new(InitiatorState::Connecting));
        tracing::debug!(%addr, "connecting");

        let stream = match timeout(config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(NetError::Connect { addr: addr.to_string(), reason: e.to_string() });
            },
            Err(_) => {
                let reason = format!("timed out after {:?}", config.connect_timeout);
                return Err(NetError::Connect { addr: addr.to_string(), reason });
            },
        };

        if let Err(e) = stream.set_nodelay(config.nodelay) {
            tracing::debug!(%addr, "set_nodelay failed: {e}");
        }
        let peer_addr = stream.peer_addr().unwrap_or(addr);
        let local_addr = stream
            .local_addr()
            .map_err(|e| NetError::Connect { addr: addr.to_string(), reason: e.to_string() })?;

        let (reader, writer) = stream.into_split();
        shared.attach_writer(writer).await;
        shared.transition(InitiatorState::Connected { peer: peer_addr });
        tracing::info!(peer = %peer_addr, key = %cipher.masked_key(), "connected");

        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let disconnect_notified = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            cipher: Arc::clone(&cipher),
            events: events_tx.clone(),
            shutdown: shutdown_rx,
            config,
        };

        let handle = tokio::spawn(receive_task(
            reader,
            Arc::clone(&shared),
            worker,
            Arc::clone(&disconnect_notified),
        ));

        let initiator = Self {
            shared,
            cipher,
            peer_addr,
            local_addr,
            shutdown: shutdown_tx,
            events: events_tx,
            disconnect_notified,
            worker: Mutex::new(Some(handle)),
        };
        Ok((initiator, events_rx))
    }

    /// Remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Local address of the connection.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InitiatorState {
        self.shared.state()
    }

    /// Whether the connection is still up.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), InitiatorState::Connected { .. })
    }

    /// Whether neither side has ended the connection yet.
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
        tracing::info!(key = %self.cipher.masked_key(), "initiator key rotated");
    }

    /// Encode `text` and write it to the peer.
    ///
    /// # Errors
    ///
    /// - `NetError::NotConnected` if the connection has ended
    /// - `NetError::Transport` if the write fails
    pub async fn send(&self, text: &str) -> Result<(), NetError> {
        if !self.is_connected() {
            return Err(NetError::NotConnected);
        }

        let wire = self.cipher.encode(text);
        match self.shared.write(&wire).await {
            Ok(()) => {
                tracing::debug!(peer = %self.peer_addr, bytes = wire.len(), wire = %preview(&wire), "sent");
                Ok(())
            },
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, "send failed: {e}");
                Err(e)
            },
        }
    }

    /// Close the connection.
    ///
    /// Idempotent. Posts `PeerDisconnected` unless the worker already did.
    pub async fn disconnect(&self) {
        if !self.shared.stop_running() {
            return;
        }

        self.shutdown.send_replace(true);
        self.shared.close_writer().await;

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = worker
            && let Err(e) = handle.await
        {
            tracing::warn!("initiator worker ended abnormally: {e}");
        }

        self.shared.transition(InitiatorState::Idle);
        tracing::info!(peer = %self.peer_addr, "disconnected");

        if !self.disconnect_notified.swap(true, Ordering::AcqRel)
            && self.events.try_send(EndpointEvent::PeerDisconnected).is_err()
        {
            tracing::debug!("disconnect notice not delivered, event channel full or closed");
        }
    }
}

/// Receive until the connection ends, then release it.
async fn receive_task(
    reader: OwnedReadHalf,
    shared: Arc<Shared<InitiatorState>>,
    mut worker: Worker,
    disconnect_notified: Arc<AtomicBool>,
) {
    let failure = match worker.receive(reader, &shared, SERVER_SENDER).await {
        ReceiveOutcome::Shutdown => return,
        ReceiveOutcome::PeerClosed => None,
        ReceiveOutcome::Failed(reason) => Some(reason),
    };

    shared.stop_running();
    shared.close_writer().await;
    shared.transition(InitiatorState::Idle);

    match failure {
        None => tracing::info!("server disconnected"),
        Some(reason) => {
            tracing::warn!("receive failed: {reason}");
            worker.emit(EndpointEvent::Error { message: format!("receive error: {reason}") }).await;
        },
    }

    if !disconnect_notified.swap(true, Ordering::AcqRel) {
        worker.emit(EndpointEvent::PeerDisconnected).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_is_reported() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        let cipher = Arc::new(StreamCipher::default());
        let result = Initiator::connect("127.0.0.1", port, cipher, EndpointConfig::loopback()).await;
        assert!(matches!(result, Err(NetError::Connect { .. })));
    }
}
