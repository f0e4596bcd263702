//! Client implementation.
//!
//! The client maintains:
//! - One transport session at a time (see [`crate::connection`])
//! - The entity registry, fed by `render` snapshots
//! - Per-frame motion extrapolation
//! - Edge-triggered key input
//! - A small console for user commands
//!
//! Everything runs on one thread. Snapshot application and frame ticks are
//! plain synchronous calls and finish before the next event is looked at.

use std::time::Instant;

use dungeon_shared::{
    config::ClientConfig,
    protocol::{decode_server, ClientMessage, PlayerStats, ServerMessage},
    render::Renderer,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::{
    connection::{ConnectionManager, SessionEvent, SessionEventKind, SessionId},
    extrapolate::MotionExtrapolator,
    input::{InputTracker, KeyEvent},
    sync::{EntitySynchronizer, SyncReport},
};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No session.
    Disconnected,
    /// Session started, transport not open yet.
    Connecting,
    /// Transport open, `hello` sent.
    Connected,
}

/// High-level game client.
pub struct GameClient<R: Renderer> {
    pub state: ClientState,
    cfg: ClientConfig,
    conn: ConnectionManager,
    sync: EntitySynchronizer,
    extrapolator: MotionExtrapolator,
    input: InputTracker,
    renderer: R,
    frames: u64,
}

impl<R: Renderer> GameClient<R> {
    pub fn new(cfg: ClientConfig, renderer: R) -> Self {
        Self {
            state: ClientState::Disconnected,
            conn: ConnectionManager::new(),
            sync: EntitySynchronizer::from_config(&cfg),
            extrapolator: MotionExtrapolator::from_config(&cfg),
            input: InputTracker::from_config(&cfg),
            cfg,
            renderer,
            frames: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn sync(&self) -> &EntitySynchronizer {
        &self.sync
    }

    pub fn input(&self) -> &InputTracker {
        &self.input
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> PlayerStats {
        self.sync.stats()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.conn.current_id()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Opens a WebSocket session, replacing any current one. Must be called
    /// from within a tokio runtime.
    pub fn connect(&mut self, url: Option<&str>) -> SessionId {
        let url = url.unwrap_or(self.cfg.server_url.as_str()).to_string();
        self.state = ClientState::Connecting;
        self.conn.connect(&url)
    }

    /// Starts a session whose transport the caller drives. Inbound events go
    /// through [`GameClient::event_sender`]; outbound messages arrive on the
    /// returned receiver.
    pub fn attach_session(&mut self) -> (SessionId, UnboundedReceiver<ClientMessage>) {
        self.state = ClientState::Connecting;
        self.conn.attach()
    }

    pub fn event_sender(&self) -> tokio::sync::mpsc::UnboundedSender<SessionEvent> {
        self.conn.event_sender()
    }

    /// Asks the transport to close. Teardown happens when the session reports
    /// `Closed`.
    pub fn disconnect(&mut self) -> bool {
        info!("Disconnecting...");
        self.conn.close()
    }

    /// Waits for the next event of the current session.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.conn.recv().await
    }

    /// Handles every event already queued. Returns how many were handled.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(event) = self.conn.try_recv() {
            self.handle_event(event, now);
            handled += 1;
        }
        handled
    }

    /// Handles one event that the connection manager accepted as current.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) {
        match event.kind {
            SessionEventKind::Opened if self.conn.is_closing() => {
                debug!(session = %event.session, "Opened after disconnect was requested");
            }
            SessionEventKind::Opened => {
                info!(session = %event.session, "Connected.");
                self.teardown();
                self.state = ClientState::Connected;
                self.send(ClientMessage::Hello);
            }
            SessionEventKind::Frame(text) => {
                self.handle_frame(&text, now);
            }
            SessionEventKind::Error(error) => {
                warn!(session = %event.session, error = %error, "Session error");
            }
            SessionEventKind::Closed => {
                info!(session = %event.session, "Disconnected from the game");
                self.teardown();
                self.state = ClientState::Disconnected;
            }
        }
    }

    /// Decodes and routes one inbound frame. Bad frames are logged and
    /// dropped whole.
    pub fn handle_frame(&mut self, text: &str, now: Instant) -> Option<SyncReport> {
        match decode_server(text) {
            Ok(ServerMessage::Render(snapshot)) => {
                Some(self.sync.apply_snapshot(&snapshot, now, &mut self.renderer))
            }
            Ok(ServerMessage::Unknown(kind)) => {
                warn!(kind = %kind, "Received unrecognized message");
                None
            }
            Err(e) => {
                warn!(error = %e, "Dropping bad frame");
                None
            }
        }
    }

    /// Runs one render frame.
    pub fn frame(&mut self, dt_seconds: f32) -> usize {
        self.frames += 1;
        self.extrapolator
            .tick(dt_seconds, &mut self.sync, &mut self.renderer)
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> Option<ClientMessage> {
        let msg = self.input.key_down(event)?;
        self.send(msg.clone());
        Some(msg)
    }

    pub fn key_up(&mut self, event: &KeyEvent) -> Option<ClientMessage> {
        let msg = self.input.key_up(event)?;
        self.send(msg.clone());
        Some(msg)
    }

    fn send(&self, msg: ClientMessage) -> bool {
        self.conn.send(msg)
    }

    fn teardown(&mut self) {
        let removed = self.sync.clear(&mut self.renderer);
        self.input.reset();
        if removed > 0 {
            debug!(removed, "Cleared entities");
        }
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = tokens.first() else {
            return Ok(Vec::new());
        };

        match *command {
            "connect" => {
                let id = self.connect(tokens.get(1).copied());
                Ok(vec![format!("Connecting (session {id})")])
            }
            "disconnect" => {
                if self.disconnect() {
                    Ok(vec!["Disconnecting".to_string()])
                } else {
                    Ok(vec!["Not connected".to_string()])
                }
            }
            "status" => {
                let stats = self.stats();
                let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
                Ok(vec![
                    format!("State: {:?}", self.state),
                    format!(
                        "Session: {}",
                        self.session().map_or_else(|| "none".to_string(), |s| s.to_string())
                    ),
                    format!("Entities: {}", self.sync.registry().len()),
                    format!("Snapshots: {}", self.sync.snapshots_applied()),
                    format!(
                        "Health: {}  Score: {}  Potions: {}",
                        show(stats.health),
                        show(stats.score),
                        show(stats.potions)
                    ),
                    self.input.describe_held(),
                ])
            }
            "down" | "up" => {
                let Some(key) = key_argument(line, command) else {
                    return Ok(vec![format!("Usage: {command} <key>")]);
                };
                let event = KeyEvent::new(key);
                let sent = if *command == "down" {
                    self.key_down(&event)
                } else {
                    self.key_up(&event)
                };
                Ok(sent.map(|m| format!("{m:?}")).into_iter().collect())
            }
            "help" => Ok(vec![
                "connect [url]  disconnect  status  down <key>  up <key>  quit".to_string(),
            ]),
            other => Ok(vec![format!("Unknown command: {other}")]),
        }
    }
}

/// Key argument of `down`/`up`. `space` names the space bar, which
/// whitespace splitting would otherwise eat.
fn key_argument<'a>(line: &'a str, command: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix(command)?.trim();
    match rest {
        "" => None,
        "space" => Some(" "),
        key => Some(key),
    }
}
