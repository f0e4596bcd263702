//! Connection management.
//!
//! The client holds at most one transport session. Each session runs as its
//! own task and reports back through a shared channel, tagging every event
//! with the [`SessionId`] it belongs to. Teardown is asynchronous, so a
//! replaced or closing session can still emit events after the client has
//! moved on; those are dropped here by comparing ids with the current one.

use std::fmt;

use dungeon_shared::protocol::{encode_client, ClientMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

/// Identity of one transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Opened,
    /// One inbound text frame, undecoded.
    Frame(String),
    Error(String),
    /// Always the last event of a session.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub kind: SessionEventKind,
}

struct Session {
    id: SessionId,
    /// Dropped to ask the transport task to close.
    outbound: Option<UnboundedSender<ClientMessage>>,
    open: bool,
}

/// Owns the current session and filters its events.
pub struct ConnectionManager {
    next_id: u64,
    current: Option<Session>,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            next_id: 1,
            current: None,
            events_tx,
            events_rx,
        }
    }

    /// Starts a new session and returns its id plus the receiving end of its
    /// outbound queue. Any previous session is superseded: its queue is
    /// dropped and its remaining events become stale.
    ///
    /// The caller drives the transport and reports through
    /// [`ConnectionManager::event_sender`].
    pub fn attach(&mut self) -> (SessionId, UnboundedReceiver<ClientMessage>) {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        if let Some(old) = self.current.take() {
            debug!(old = %old.id, new = %id, "Superseding session");
        }
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.current = Some(Session {
            id,
            outbound: Some(outbound_tx),
            open: false,
        });
        (id, outbound_rx)
    }

    /// Opens a WebSocket session to `url` on the current tokio runtime.
    pub fn connect(&mut self, url: &str) -> SessionId {
        let (id, outbound_rx) = self.attach();
        info!(session = %id, url, "Connecting");
        tokio::spawn(run_websocket(
            id,
            url.to_string(),
            outbound_rx,
            self.events_tx.clone(),
        ));
        id
    }

    pub fn event_sender(&self) -> UnboundedSender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Asks the current session to close. The session stays current until
    /// its `Closed` event arrives.
    pub fn close(&mut self) -> bool {
        self.current
            .as_mut()
            .and_then(|s| s.outbound.take())
            .is_some()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current.as_ref().map(|s| s.id)
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.current_id() == Some(id)
    }

    pub fn is_open(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.open)
    }

    /// True once [`ConnectionManager::close`] was called on the current
    /// session and its `Closed` event has not arrived yet.
    pub fn is_closing(&self) -> bool {
        self.current.as_ref().is_some_and(|s| s.outbound.is_none())
    }

    /// Queues a message on the open session. Returns false when there is
    /// nothing to send on.
    pub fn send(&self, msg: ClientMessage) -> bool {
        match &self.current {
            Some(Session {
                outbound: Some(tx),
                open: true,
                ..
            }) => tx.send(msg).is_ok(),
            _ => {
                trace!(?msg, "No open session; message dropped");
                false
            }
        }
    }

    /// Waits for the next event of the current session.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            let event = self.events_rx.recv().await?;
            if let Some(event) = self.accept(event) {
                return Some(event);
            }
        }
    }

    /// Returns the next already-queued event of the current session.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(event) = self.accept(event) {
                return Some(event);
            }
        }
        None
    }

    fn accept(&mut self, event: SessionEvent) -> Option<SessionEvent> {
        let Some(current) = self.current.as_mut().filter(|s| s.id == event.session) else {
            debug!(session = %event.session, kind = ?event.kind, "Dropping stale session event");
            return None;
        };
        match event.kind {
            SessionEventKind::Opened => current.open = current.outbound.is_some(),
            SessionEventKind::Closed => self.current = None,
            _ => {}
        }
        Some(event)
    }
}

fn emit(events: &UnboundedSender<SessionEvent>, session: SessionId, kind: SessionEventKind) {
    // The receiver only goes away with the client itself.
    let _ = events.send(SessionEvent { session, kind });
}

async fn run_websocket(
    id: SessionId,
    url: String,
    mut outbound: UnboundedReceiver<ClientMessage>,
    events: UnboundedSender<SessionEvent>,
) {
    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!(session = %id, error = %e, "Connect failed");
            emit(&events, id, SessionEventKind::Error(e.to_string()));
            emit(&events, id, SessionEventKind::Closed);
            return;
        }
    };
    emit(&events, id, SessionEventKind::Opened);

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(msg) => {
                    let text = match encode_client(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(session = %id, error = %e, "Failed to encode message");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        emit(&events, id, SessionEventKind::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!(session = %id, "Closing session");
                    let _ = sink.close().await;
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, id, SessionEventKind::Frame(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => {
                    trace!(session = %id, ?other, "Ignoring non-text frame");
                }
                Some(Err(e)) => {
                    warn!(session = %id, error = %e, "Transport error");
                    emit(&events, id, SessionEventKind::Error(e.to_string()));
                    break;
                }
            },
        }
    }
    emit(&events, id, SessionEventKind::Closed);
}
