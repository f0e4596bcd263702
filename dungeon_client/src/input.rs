//! Input handling.
//!
//! Key transitions from the host window become edge-triggered messages: one
//! message per press or release, never one per frame while held. Auto-repeat
//! presses are dropped.
//!
//! In [`InputMode::Actions`] there is one slot for the held fire direction and
//! one for the held move direction. Pressing a second key of the same set
//! replaces the slot without releasing the first, so releasing the replaced
//! key later sends nothing.

use std::collections::BTreeMap;

use dungeon_shared::{
    config::{ClientConfig, InputMode},
    protocol::ClientMessage,
};
use tracing::trace;

/// One key transition from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    /// Set by the host for auto-repeat presses.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            repeat: false,
        }
    }

    pub fn repeated(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            repeat: true,
        }
    }
}

/// Turns key transitions into outbound messages.
#[derive(Debug, Clone)]
pub struct InputTracker {
    mode: InputMode,
    fire_keys: Vec<String>,
    move_keys: Vec<String>,
    potion_key: String,
    active_fire: Option<String>,
    active_move: Option<String>,
    /// Raw mode only: tracked key -> held.
    held: BTreeMap<String, bool>,
}

impl InputTracker {
    pub fn new(
        mode: InputMode,
        fire_keys: Vec<String>,
        move_keys: Vec<String>,
        potion_key: String,
    ) -> Self {
        let held = fire_keys
            .iter()
            .chain(move_keys.iter())
            .chain(std::iter::once(&potion_key))
            .map(|k| (k.clone(), false))
            .collect();
        Self {
            mode,
            fire_keys,
            move_keys,
            potion_key,
            active_fire: None,
            active_move: None,
            held,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(
            cfg.input_mode,
            cfg.fire_keys.clone(),
            cfg.move_keys.clone(),
            cfg.potion_key.clone(),
        )
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn active_fire(&self) -> Option<&str> {
        self.active_fire.as_deref()
    }

    pub fn active_move(&self) -> Option<&str> {
        self.active_move.as_deref()
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> Option<ClientMessage> {
        if event.repeat {
            trace!(key = %event.key, "Ignoring auto-repeat");
            return None;
        }
        let key = &event.key;
        match self.mode {
            InputMode::Actions => {
                if self.fire_keys.contains(key) {
                    self.active_fire = Some(key.clone());
                    Some(ClientMessage::Fire {
                        key: Some(key.clone()),
                    })
                } else if self.move_keys.contains(key) {
                    self.active_move = Some(key.clone());
                    Some(ClientMessage::Move {
                        key: Some(key.clone()),
                    })
                } else if *key == self.potion_key {
                    Some(ClientMessage::Potion)
                } else {
                    None
                }
            }
            InputMode::RawKeys => match self.held.get_mut(key) {
                Some(held) if !*held => {
                    *held = true;
                    Some(ClientMessage::KeyDown { key: key.clone() })
                }
                _ => None,
            },
        }
    }

    pub fn key_up(&mut self, event: &KeyEvent) -> Option<ClientMessage> {
        let key = &event.key;
        match self.mode {
            InputMode::Actions => {
                if self.active_fire.as_ref() == Some(key) {
                    self.active_fire = None;
                    Some(ClientMessage::Fire { key: None })
                } else if self.active_move.as_ref() == Some(key) {
                    self.active_move = None;
                    Some(ClientMessage::Move { key: None })
                } else {
                    None
                }
            }
            InputMode::RawKeys => match self.held.get_mut(key) {
                Some(held) if *held => {
                    *held = false;
                    Some(ClientMessage::KeyUp { key: key.clone() })
                }
                _ => None,
            },
        }
    }

    /// Currently held keys, sorted. Raw mode reports every held tracked key;
    /// action mode reports the occupied slots.
    pub fn held_keys(&self) -> Vec<&str> {
        match self.mode {
            InputMode::Actions => {
                let mut keys: Vec<&str> = self
                    .active_fire
                    .iter()
                    .chain(self.active_move.iter())
                    .map(String::as_str)
                    .collect();
                keys.sort_unstable();
                keys
            }
            InputMode::RawKeys => self
                .held
                .iter()
                .filter(|(_, held)| **held)
                .map(|(k, _)| k.as_str())
                .collect(),
        }
    }

    /// One-line summary such as `Keys: a, j`.
    pub fn describe_held(&self) -> String {
        format!("Keys: {}", self.held_keys().join(", "))
    }

    /// Forgets every held key without emitting anything.
    pub fn reset(&mut self) {
        self.active_fire = None;
        self.active_move = None;
        for held in self.held.values_mut() {
            *held = false;
        }
    }
}
