//! Math types.
//!
//! Screen space is 2D; everything here is plain `f32` with no SIMD.

use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// A quarter of a full turn in radians. Sprites spin in 90° steps.
pub const QUARTER_TURN: f32 = std::f32::consts::TAU / 4.0;

/// 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        self.scale(rhs)
    }
}

/// Maps server tile coordinates to pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpace {
    /// Pixels per tile.
    pub scale: f32,
    /// Offset added in tile units before scaling; 0.5 puts the point at the
    /// tile center, which matches a center-anchored sprite.
    pub anchor_offset: f32,
}

impl TileSpace {
    pub const fn new(scale: f32, anchor_offset: f32) -> Self {
        Self {
            scale,
            anchor_offset,
        }
    }

    pub fn to_pixel(self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x + self.anchor_offset) * self.scale,
            (y + self.anchor_offset) * self.scale,
        )
    }
}
