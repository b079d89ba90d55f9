//! Grid-aligned geometry primitives
//!
//! Hitboxes are integer rectangles with a top-left origin and y pointing down.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_position(pos: IVec2, size: IVec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    /// A `size`×`size` box centred on `center` (rounded to the grid)
    pub fn centered(center: Vec2, size: i32) -> Self {
        let c = center.round().as_ivec2();
        Self::new(c.x - size / 2, c.y - size / 2, size, size)
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn position(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + self.w as f32 / 2.0, self.y as f32 + self.h as f32 / 2.0)
    }

    /// Same rectangle shifted by `delta`
    pub fn offset(&self, delta: IVec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// Strict overlap; rectangles that only share an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() as f32
            && p.x < self.right() as f32
            && p.y >= self.top() as f32
            && p.y < self.bottom() as f32
    }
}

/// Movement axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// Unit step along this axis
    pub fn unit(self) -> IVec2 {
        match self {
            Axis::Horizontal => IVec2::X,
            Axis::Vertical => IVec2::Y,
        }
    }

    /// Component of `v` along this axis
    pub fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::Horizontal => v.x,
            Axis::Vertical => v.y,
        }
    }

    pub fn of_mut(self, v: &mut Vec2) -> &mut f32 {
        match self {
            Axis::Horizontal => &mut v.x,
            Axis::Vertical => &mut v.y,
        }
    }
}

/// Quadratic Bezier from `begin` to `end` bent toward `control`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub begin: Vec2,
    pub end: Vec2,
    pub control: Vec2,
}

impl Curve {
    pub fn new(begin: Vec2, end: Vec2, control: Vec2) -> Self {
        Self { begin, end, control }
    }

    /// Point at parameter `t` in `[0, 1]`; `t = 1` is exactly `end`
    pub fn point(&self, t: f32) -> Vec2 {
        let inv = 1.0 - t;
        self.begin * (inv * inv) + self.control * (2.0 * inv * t) + self.end * (t * t)
    }
}
