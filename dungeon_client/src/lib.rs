//! `dungeon_client`
//!
//! Client-side systems:
//! - Connection management (one WebSocket session at a time, stale events dropped)
//! - Snapshot synchronization into an owned entity registry
//! - Constant-velocity extrapolation between snapshots
//! - Edge-triggered key input
//! - Renderer wiring through `dungeon_shared::render::Renderer`

pub mod client;
pub mod connection;
pub mod extrapolate;
pub mod input;
pub mod registry;
pub mod sync;

pub use client::GameClient;
