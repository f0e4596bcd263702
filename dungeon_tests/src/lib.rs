//! Integration test crate for the dungeon client; see `tests/`.
