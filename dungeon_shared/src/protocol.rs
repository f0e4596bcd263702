//! Wire protocol.
//!
//! Every frame is a JSON text object with a `type` field. The codec is pure:
//! it never touches sockets and never holds state.
//!
//! Decoding happens in two steps. The envelope is read first so that an
//! unrecognized `type` decodes to [`ServerMessage::Unknown`] instead of an
//! error, then the payload is validated as a whole. A frame either decodes
//! completely or is rejected, so callers never see half a snapshot.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Server-assigned entity id, unique within one connection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Sent once right after the connection opens.
    Hello,
    /// Held fire-direction key changed; `None` means released.
    Fire { key: Option<String> },
    /// Held move-direction key changed; `None` means released.
    Move { key: Option<String> },
    /// One-shot item use.
    Potion,
    /// Raw physical key press.
    KeyDown { key: String },
    /// Raw physical key release.
    KeyUp { key: String },
}

/// Messages the server sends to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// One authoritative snapshot.
    Render(RenderMessage),
    /// A well-formed frame whose `type` this client does not handle.
    Unknown(String),
}

/// Scalar player stats carried by every snapshot. Any JSON number is
/// accepted, fractional or not.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub health: Option<f64>,
    pub score: Option<f64>,
    pub potions: Option<f64>,
}

/// One decoded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMessage {
    pub sprites: Vec<SpriteUpdate>,
    pub stats: PlayerStats,
}

/// Constant velocity in tiles per server tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionVector {
    pub dx: f32,
    pub dy: f32,
}

/// A validated sprite descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteUpdate {
    /// `destroyed: true`; only the id is meaningful.
    Destroy(EntityId),
    /// Create-or-update.
    Upsert(SpriteState),
}

impl SpriteUpdate {
    pub fn id(&self) -> EntityId {
        match self {
            SpriteUpdate::Destroy(id) => *id,
            SpriteUpdate::Upsert(state) => state.id,
        }
    }
}

/// Full state of a live sprite in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteState {
    pub id: EntityId,
    pub texture: String,
    /// Tile-space position.
    pub x: f32,
    pub y: f32,
    pub z: i32,
    /// Set when the sprite is spinning; holds its phase.
    pub spin_phase: Option<f32>,
    pub motion: Option<MotionVector>,
}

/// Codec failures. The whole frame is dropped on any of these.
#[derive(Debug)]
pub enum ProtocolError {
    /// Not JSON, or JSON that does not match the message shape.
    Malformed(serde_json::Error),
    /// The frame has no string `type` field.
    MissingType,
    /// A live sprite entry lacks a field it needs.
    MissingField { id: EntityId, field: &'static str },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "malformed frame: {e}"),
            ProtocolError::MissingType => write!(f, "frame has no message type"),
            ProtocolError::MissingField { id, field } => {
                write!(f, "sprite {id} is missing field `{field}`")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e)
    }
}

#[derive(Deserialize)]
struct RawRender {
    sprites: Vec<RawSprite>,
    health: Option<f64>,
    score: Option<f64>,
    potions: Option<f64>,
}

#[derive(Deserialize)]
struct RawSprite {
    id: EntityId,
    texture: Option<String>,
    x: Option<f32>,
    y: Option<f32>,
    z: Option<i32>,
    destroyed: Option<bool>,
    spinning: Option<bool>,
    phase: Option<f32>,
    motion: Option<MotionVector>,
}

impl TryFrom<RawSprite> for SpriteUpdate {
    type Error = ProtocolError;

    fn try_from(raw: RawSprite) -> Result<Self, Self::Error> {
        let id = raw.id;
        if raw.destroyed.unwrap_or(false) {
            return Ok(SpriteUpdate::Destroy(id));
        }
        let missing = |field| ProtocolError::MissingField { id, field };
        Ok(SpriteUpdate::Upsert(SpriteState {
            id,
            texture: raw.texture.ok_or_else(|| missing("texture"))?,
            x: raw.x.ok_or_else(|| missing("x"))?,
            y: raw.y.ok_or_else(|| missing("y"))?,
            z: raw.z.ok_or_else(|| missing("z"))?,
            spin_phase: raw
                .spinning
                .unwrap_or(false)
                .then(|| raw.phase.unwrap_or(0.0)),
            motion: raw.motion,
        }))
    }
}

impl TryFrom<RawRender> for RenderMessage {
    type Error = ProtocolError;

    fn try_from(raw: RawRender) -> Result<Self, Self::Error> {
        let sprites = raw
            .sprites
            .into_iter()
            .map(SpriteUpdate::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RenderMessage {
            sprites,
            stats: PlayerStats {
                health: raw.health,
                score: raw.score,
                potions: raw.potions,
            },
        })
    }
}

/// Decodes one inbound text frame.
pub fn decode_server(text: &str) -> Result<ServerMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    match kind {
        "render" => {
            let raw: RawRender = serde_json::from_value(value)?;
            Ok(ServerMessage::Render(RenderMessage::try_from(raw)?))
        }
        other => Ok(ServerMessage::Unknown(other.to_string())),
    }
}

/// Encodes one outbound message as a text frame.
pub fn encode_client(msg: &ClientMessage) -> anyhow::Result<String> {
    serde_json::to_string(msg).context("serialize client message")
}
