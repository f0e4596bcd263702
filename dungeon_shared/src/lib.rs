//! `dungeon_shared`
//!
//! Libraries shared by the dungeon client and its tests.
//!
//! Design goals:
//! - Keep the wire format in one place, explicit and serde-driven.
//! - Keep the renderer behind a trait so the synchronization core never
//!   depends on a graphics backend.
//! - No `unsafe`.

pub mod config;
pub mod math;
pub mod protocol;
pub mod render;

