//! Configuration system.
//!
//! Loads client configuration from JSON strings (file IO left to the binary).
//! Every field has a default, so an empty object `{}` is a valid config.

use serde::{Deserialize, Serialize};

use crate::math::TileSpace;

/// How the server signals that an entity is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// A sprite entry with `destroyed: true` removes the entity.
    #[default]
    ExplicitDestroy,
    /// Any entity missing from a snapshot is removed.
    Absence,
}

/// Which outbound messages key events turn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Semantic `fire`/`move`/`potion` messages.
    #[default]
    Actions,
    /// Physical `keyDown`/`keyUp` messages; the server owns the semantics.
    RawKeys,
}

/// Root client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Pixels per server tile.
    #[serde(default = "default_tile_scale")]
    pub tile_scale: f32,
    /// Tile-unit offset applied before scaling (0.5 = tile center).
    #[serde(default = "default_tile_anchor_offset")]
    pub tile_anchor_offset: f32,
    /// Snapshots per second the server targets; scales extrapolation time.
    #[serde(default = "default_server_tick_rate")]
    pub server_tick_rate: f32,
    /// Local render frames per second.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    #[serde(default)]
    pub removal: RemovalPolicy,
    #[serde(default)]
    pub input_mode: InputMode,
    #[serde(default = "default_fire_keys")]
    pub fire_keys: Vec<String>,
    #[serde(default = "default_move_keys")]
    pub move_keys: Vec<String>,
    #[serde(default = "default_potion_key")]
    pub potion_key: String,
    /// Texture keys the renderer knows how to draw.
    #[serde(default = "default_textures")]
    pub textures: Vec<String>,
}

fn default_server_url() -> String {
    "ws://localhost:8080/".to_string()
}

fn default_tile_scale() -> f32 {
    // 16px art drawn at 3x.
    16.0 * 3.0
}

fn default_tile_anchor_offset() -> f32 {
    0.5
}

fn default_server_tick_rate() -> f32 {
    10.0
}

fn default_frame_hz() -> u32 {
    60
}

fn default_fire_keys() -> Vec<String> {
    ["a", "s", "d", "w"].iter().map(|k| k.to_string()).collect()
}

fn default_move_keys() -> Vec<String> {
    ["j", "k", "l", "i"].iter().map(|k| k.to_string()).collect()
}

fn default_potion_key() -> String {
    " ".to_string()
}

fn default_textures() -> Vec<String> {
    [
        "axe", "bones", "floor", "hero", "monster", "wall", "food", "potion", "treasure", "exit",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            tile_scale: default_tile_scale(),
            tile_anchor_offset: default_tile_anchor_offset(),
            server_tick_rate: default_server_tick_rate(),
            frame_hz: default_frame_hz(),
            removal: RemovalPolicy::default(),
            input_mode: InputMode::default(),
            fire_keys: default_fire_keys(),
            move_keys: default_move_keys(),
            potion_key: default_potion_key(),
            textures: default_textures(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn tile_space(&self) -> TileSpace {
        TileSpace::new(self.tile_scale, self.tile_anchor_offset)
    }
}
