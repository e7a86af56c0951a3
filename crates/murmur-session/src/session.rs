//! The session façade.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────┐  listen / connect  ┌────────┐
//! │ Idle │───────────────────>│ Active │
//! └──────┘                    └────────┘
//!    ^                            │
//!    └────────────────────────────┘
//!      close, or the initiator's peer disconnects
//! ```
//!
//! A listener whose peer leaves stays active and keeps its history record
//! open; the next peer it accepts continues the same conversation.

use std::{net::SocketAddr, sync::Arc};

use murmur_cipher::{Key, StreamCipher};
use murmur_net::{
    Endpoint, EndpointConfig, EndpointEvent, Initiator, LOCAL_SENDER, Listener, Role,
};
use murmur_store::{MessageKind, SessionId, Store};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{Direction, Presenter, SessionError};

/// Sender label recorded for notices and errors.
pub const SYSTEM_SENDER: &str = "System";

/// Live endpoint and the receiving end of its events.
struct Active {
    endpoint: Endpoint,
    events: mpsc::Receiver<EndpointEvent>,
}

/// One conversation at a time, shown through `P` and recorded in `S`.
pub struct Session<P, S> {
    presenter: P,
    store: Option<S>,
    /// Key for the next endpoint. Kept in step with the live one.
    key: Key,
    config: EndpointConfig,
    active: Option<Active>,
    session_id: Option<SessionId>,
}

impl<P, S> Session<P, S>
where
    P: Presenter,
    S: Store,
{
    /// Create an idle session. `store` may be `None` to keep no history.
    pub fn new(presenter: P, store: Option<S>, key: Key, config: EndpointConfig) -> Self {
        Self { presenter, store, key, config, active: None, session_id: None }
    }

    /// Whether an endpoint is live.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Role of the live endpoint.
    pub fn role(&self) -> Option<Role> {
        self.active.as_ref().map(|active| active.endpoint.role())
    }

    /// History id of the current conversation, if one was recorded.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Whether the live endpoint has a peer attached.
    pub fn is_connected(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.endpoint.is_connected())
    }

    /// Masked form of the current key.
    pub fn masked_key(&self) -> String {
        self.key.masked()
    }

    /// The presenter.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// The presenter, mutably.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// The history store, if any.
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Bind `host:port` and wait for a peer.
    ///
    /// Returns the bound address, which differs from the request when `port`
    /// is `0`.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyActive` if an endpoint is live
    /// - `SessionError::Net` if binding fails (also reported to the presenter)
    pub async fn listen(&mut self, host: &str, port: u16) -> Result<SocketAddr, SessionError> {
        self.ensure_idle()?;

        let cipher = Arc::new(StreamCipher::new(self.key.clone()));
        let (listener, events) =
            match Listener::start(host, port, cipher, self.config.clone()).await {
                Ok(started) => started,
                Err(e) => {
                    self.presenter.error(&format!("Failed to start server: {e}"));
                    return Err(e.into());
                },
            };

        let local_addr = listener.local_addr();
        self.activate(Endpoint::from(listener), events, host, local_addr.port());
        self.notice(&format!("Server started on {local_addr} (XOR encryption enabled)"));
        Ok(local_addr)
    }

    /// Connect to a listener at `host:port`.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyActive` if an endpoint is live
    /// - `SessionError::Net` if the connection fails (also reported to the
    ///   presenter)
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<SocketAddr, SessionError> {
        self.ensure_idle()?;

        let cipher = Arc::new(StreamCipher::new(self.key.clone()));
        let (initiator, events) =
            match Initiator::connect(host, port, cipher, self.config.clone()).await {
                Ok(connected) => connected,
                Err(e) => {
                    self.presenter.error(&format!("Connection failed: {e}"));
                    return Err(e.into());
                },
            };

        let peer_addr = initiator.peer_addr();
        self.activate(Endpoint::from(initiator), events, host, port);
        self.notice(&format!("Connected to server at {peer_addr} (XOR encryption enabled)"));
        Ok(peer_addr)
    }

    /// Encrypt and send `text` to the peer, then record and show it.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotActive` if no endpoint is live
    /// - `SessionError::Net` if the endpoint has no peer or the write fails
    ///   (also reported to the presenter)
    pub async fn send(&mut self, text: &str) -> Result<(), SessionError> {
        let Some(active) = self.active.as_ref() else {
            return Err(SessionError::NotActive);
        };

        if let Err(e) = active.endpoint.send(text).await {
            self.report_error(&format!("Send failed: {e}"));
            return Err(e.into());
        }

        self.line(text, LOCAL_SENDER, Direction::Sent);
        Ok(())
    }

    /// Rotate the key.
    ///
    /// Applies to the live endpoint immediately, and to every later one.
    pub fn set_key(&mut self, key: Key) {
        if let Some(active) = &self.active {
            active.endpoint.set_key(key.clone());
        }
        self.key = key;
        tracing::info!(key = %self.key.masked(), "session key updated");
        self.notice("Encryption key updated");
    }

    /// Stop the live endpoint and finish the conversation. No-op when idle.
    pub async fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let role = active.endpoint.role();
        active.endpoint.stop().await;
        drop(active.events);

        self.notice(match role {
            Role::Server => "Server stopped",
            Role::Client => "Disconnected from server",
        });
        self.finish(role);
    }

    /// Wait for the next endpoint event and handle it.
    ///
    /// Returns the handled event, or `None` if the endpoint went away without
    /// saying so. Never resolves while idle.
    ///
    /// # Cancel safety
    ///
    /// Cancel safe: an event is either handled in full or left queued.
    pub async fn next_event(&mut self) -> Option<EndpointEvent> {
        let Some(active) = self.active.as_mut() else {
            return std::future::pending().await;
        };

        match active.events.recv().await {
            Some(event) => {
                self.dispatch(event.clone());
                Some(event)
            },
            None => {
                self.endpoint_lost();
                None
            },
        }
    }

    /// Handle every event already queued, without waiting. Returns how many
    /// were handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(active) = self.active.as_mut() {
            match active.events.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    handled += 1;
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.endpoint_lost();
                    break;
                },
            }
        }
        handled
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match self.role() {
            Some(role) => Err(SessionError::AlreadyActive(role)),
            None => Ok(()),
        }
    }

    fn activate(
        &mut self,
        endpoint: Endpoint,
        events: mpsc::Receiver<EndpointEvent>,
        host: &str,
        port: u16,
    ) {
        let role = endpoint.role();
        self.session_id = self.store.as_ref().and_then(|store| {
            match store.create_session(role.as_str(), host, port) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(%role, "could not record session: {e}");
                    self.presenter.error(&format!("History unavailable: {e}"));
                    None
                },
            }
        });

        self.active = Some(Active { endpoint, events });
        tracing::info!(%role, session_id = ?self.session_id, "session active");
        self.presenter.state_changed(true, role);
    }

    fn dispatch(&mut self, event: EndpointEvent) {
        match event {
            EndpointEvent::PeerConnected { peer_addr } => {
                self.notice(&format!("Client connected from {peer_addr}"));
            },
            EndpointEvent::Message { text, sender, encoding } => {
                tracing::debug!(%sender, %encoding, "message received");
                self.line(&text, &sender, Direction::Received);
            },
            EndpointEvent::Error { message } => self.report_error(&message),
            EndpointEvent::PeerDisconnected => match self.role() {
                Some(Role::Server) => self.notice("Client disconnected"),
                Some(Role::Client) => {
                    self.notice("Server disconnected");
                    self.active = None;
                    self.finish(Role::Client);
                },
                None => {},
            },
        }
    }

    /// The event channel closed under a live endpoint.
    fn endpoint_lost(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let role = active.endpoint.role();
        tracing::warn!(%role, "endpoint worker ended unexpectedly");
        self.report_error("Connection worker stopped unexpectedly");
        self.finish(role);
    }

    /// Finalize the history record and tell the presenter we are idle.
    fn finish(&mut self, role: Role) {
        if let Some(id) = self.session_id.take()
            && let Some(store) = &self.store
            && let Err(e) = store.end_session(id)
        {
            tracing::warn!(session_id = id, "could not finalize session: {e}");
            self.presenter.error(&format!("History unavailable: {e}"));
        }

        tracing::info!(%role, "session idle");
        self.presenter.state_changed(false, role);
    }

    /// Record a line, then show it.
    fn line(&mut self, text: &str, sender: &str, direction: Direction) {
        self.persist(sender, text, direction.kind());
        self.presenter.display(text, sender, direction);
    }

    fn notice(&mut self, text: &str) {
        self.line(text, SYSTEM_SENDER, Direction::System);
    }

    fn report_error(&mut self, message: &str) {
        self.persist(SYSTEM_SENDER, message, MessageKind::Error);
        self.presenter.error(message);
    }

    fn persist(&mut self, sender: &str, text: &str, kind: MessageKind) {
        let (Some(store), Some(id)) = (&self.store, self.session_id) else {
            return;
        };

        if let Err(e) = store.save_message(id, sender, text, kind) {
            tracing::warn!(session_id = id, %kind, "could not record line: {e}");
            self.presenter.error(&format!("History unavailable: {e}"));
        }
    }
}
