//! Worker plumbing shared by the listener and the initiator.
//!
//! [`Shared`] is the state both the controlling handle and the background
//! task touch: the running flag, the write half of the peer socket and the
//! lifecycle state. [`Worker`] is everything the background task owns,
//! including the receive loop.

use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::BytesMut;
use murmur_cipher::{Decoded, StreamCipher};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::{mpsc, watch},
};

use crate::{EndpointConfig, EndpointEvent, NetError};

/// Bytes of wire data included in debug logs.
const LOG_PREVIEW_LEN: usize = 50;

/// State shared between an endpoint handle and its worker.
pub(crate) struct Shared<S> {
    running: AtomicBool,
    /// Write half of the current peer socket. `None` when no peer is
    /// attached or after it was closed; taking it out is what guarantees a
    /// single close.
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    state: Mutex<S>,
}

impl<S> Shared<S>
where
    S: Copy + PartialEq + fmt::Debug,
{
    pub(crate) fn new(state: S) -> Self {
        Self {
            running: AtomicBool::new(true),
            writer: tokio::sync::Mutex::new(None),
            state: Mutex::new(state),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the running flag. Returns `true` only for the call that cleared it.
    pub(crate) fn stop_running(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn state(&self) -> S {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transition(&self, next: S) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "endpoint state change");
            *state = next;
        }
    }

    pub(crate) async fn attach_writer(&self, writer: OwnedWriteHalf) {
        *self.writer.lock().await = Some(writer);
    }

    /// Shut down and drop the write half. No-op if already closed.
    pub(crate) async fn close_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer
            && let Err(e) = writer.shutdown().await
        {
            tracing::debug!("peer socket shutdown: {e}");
        }
    }

    /// Write the whole buffer to the current peer.
    pub(crate) async fn write(&self, wire: &[u8]) -> Result<(), NetError> {
        let mut writer = self.writer.lock().await;
        let Some(stream) = writer.as_mut() else {
            return Err(NetError::NotConnected);
        };
        stream.write_all(wire).await.map_err(|e| NetError::Transport(e.to_string()))
    }
}

/// Why a receive loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReceiveOutcome {
    /// Zero-length read: orderly close by the peer.
    PeerClosed,
    /// Read failed while running.
    Failed(String),
    /// The controlling side asked the worker to stop.
    Shutdown,
}

/// Everything a background worker owns.
pub(crate) struct Worker {
    pub(crate) cipher: Arc<StreamCipher>,
    pub(crate) events: mpsc::Sender<EndpointEvent>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) config: EndpointConfig,
}

impl Worker {
    /// Post an event, giving up if a stop is requested while the channel is
    /// full.
    pub(crate) async fn emit(&mut self, event: EndpointEvent) {
        tokio::select! {
            biased;
            sent = self.events.send(event) => {
                if sent.is_err() {
                    tracing::debug!("event consumer gone, event dropped");
                }
            },
            () = stop_signal(&mut self.shutdown) => {
                tracing::debug!("endpoint stopping, event dropped");
            },
        }
    }

    /// Read, decode and post chunks until the connection ends.
    pub(crate) async fn receive<S>(
        &mut self,
        mut reader: OwnedReadHalf,
        shared: &Shared<S>,
        sender: &str,
    ) -> ReceiveOutcome
    where
        S: Copy + PartialEq + fmt::Debug,
    {
        let chunk = self.config.read_chunk.max(1);
        let mut buf = BytesMut::with_capacity(chunk);
        buf.resize(chunk, 0);

        loop {
            let read = tokio::select! {
                biased;
                () = stop_signal(&mut self.shutdown) => return ReceiveOutcome::Shutdown,
                read = reader.read(&mut buf[..]) => read,
            };

            match read {
                Ok(0) => return ReceiveOutcome::PeerClosed,
                Ok(n) => self.deliver(&buf[..n], sender).await,
                Err(_) if !shared.is_running() => return ReceiveOutcome::Shutdown,
                Err(e) => return ReceiveOutcome::Failed(e.to_string()),
            }
        }
    }

    async fn deliver(&mut self, chunk: &[u8], sender: &str) {
        match self.cipher.decode_with_fallback(chunk) {
            Ok(Decoded { text, encoding }) => {
                tracing::debug!(%sender, %encoding, bytes = chunk.len(), wire = %preview(chunk), "received");
                let event = EndpointEvent::Message { text, sender: sender.to_string(), encoding };
                self.emit(event).await;
            },
            Err(e) => {
                tracing::warn!(%sender, "dropping undecodable chunk: {e}");
                let message = format!("could not decode message from {sender}: {e}");
                self.emit(EndpointEvent::Error { message }).await;
            },
        }
    }
}

/// Resolves once a stop is requested or the controlling handle is gone.
pub(crate) async fn stop_signal(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Lossy text view of the first bytes of a wire buffer.
pub(crate) fn preview(wire: &[u8]) -> String {
    String::from_utf8_lossy(&wire[..wire.len().min(LOG_PREVIEW_LEN)]).into_owned()
}
