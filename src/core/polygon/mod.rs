// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polygon primitive types and the polygon register store
//!
//! All fields are fixed-width registers. Values that do not fit are masked to
//! the register width on construction, so an out-of-range encoding wraps the
//! same way the hardware register would.
//!
//! ```text
//! Field      Width   Range
//! --------   -----   ------
//! color      6       RRGGBB
//! vertex.x   7       0..127
//! vertex.y   6       0..63
//! depth      3       0..7
//! vertex.z   3       0..7
//! ```

mod store;

pub use store::{PolygonSlot, PolygonStore, WriteOutcome};

use crate::core::math::mask;
use serde::{Deserialize, Serialize};

/// Width of the packed color field
pub const COLOR_BITS: u32 = 6;
/// Width of a vertex X coordinate
pub const VERTEX_X_BITS: u32 = 7;
/// Width of a vertex Y coordinate
pub const VERTEX_Y_BITS: u32 = 6;
/// Width of the depth field and of per-vertex z
pub const DEPTH_BITS: u32 = 3;

/// A 6-bit packed color, two bits per channel
///
/// Bits 5-4 hold red, bits 3-2 green and bits 1-0 blue. Each channel is
/// upscaled to 8 bits by multiplying with 64, so full intensity is 192.
///
/// # Examples
///
/// ```
/// use trigpu::core::polygon::Color;
///
/// let color = Color::new(0b11_01_10);
/// assert_eq!(color.r(), 3);
/// assert_eq!(color.g(), 1);
/// assert_eq!(color.b(), 2);
///
/// let rgb = color.upscale();
/// assert_eq!((rgb.r, rgb.g, rgb.b), (192, 64, 128));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8")]
pub struct Color(u8);

impl Color {
    pub const BLACK: Color = Color(0);
    pub const RED: Color = Color(48);
    pub const GREEN: Color = Color(12);
    pub const BLUE: Color = Color(3);
    pub const WHITE: Color = Color(63);

    /// Create a color from a raw value, masked to 6 bits
    pub fn new(raw: u8) -> Self {
        Self(mask(raw as u64, COLOR_BITS) as u8)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn r(self) -> u8 {
        (self.0 >> 4) & 0x3
    }

    pub fn g(self) -> u8 {
        (self.0 >> 2) & 0x3
    }

    pub fn b(self) -> u8 {
        self.0 & 0x3
    }

    /// Expand to 8 bits per channel
    pub fn upscale(self) -> Rgb {
        Rgb {
            r: self.r() * 64,
            g: self.g() * 64,
            b: self.b() * 64,
        }
    }
}

impl From<u8> for Color {
    fn from(raw: u8) -> Self {
        Self::new(raw)
    }
}

/// An 8-bit per channel display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

/// A 2D vertex in compressed screen space
///
/// Coordinates are raw pixel coordinates divided by the vertex scale (8 or 10).
/// X is 7 bits wide and Y is 6 bits wide.
///
/// # Examples
///
/// ```
/// use trigpu::core::polygon::Vertex;
///
/// let v = Vertex::new(60, 20);
/// assert_eq!(v.to_screen(10), (600, 200));
/// assert_eq!(v.to_screen(8), (480, 160));
///
/// // Out-of-range values wrap like a 7-bit register
/// assert_eq!(Vertex::new(130, 0).x(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawVertex")]
pub struct Vertex {
    x: u8,
    y: u8,
}

#[derive(Deserialize)]
struct RawVertex {
    x: u8,
    y: u8,
}

impl From<RawVertex> for Vertex {
    fn from(raw: RawVertex) -> Self {
        Self::new(raw.x, raw.y)
    }
}

impl Vertex {
    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x: mask(x as u64, VERTEX_X_BITS) as u8,
            y: mask(y as u64, VERTEX_Y_BITS) as u8,
        }
    }

    pub fn x(self) -> u8 {
        self.x
    }

    pub fn y(self) -> u8 {
        self.y
    }

    /// Raw pixel coordinate of the vertex
    pub fn to_screen(self, scale: i64) -> (i64, i64) {
        (self.x as i64 * scale, self.y as i64 * scale)
    }
}

/// A vertex with a 3-bit z, used by the ray intersection path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vertex3 {
    pub xy: Vertex,
    pub z: u8,
}

impl Vertex3 {
    pub fn new(xy: Vertex, z: u8) -> Self {
        Self {
            xy,
            z: mask(z as u64, DEPTH_BITS) as u8,
        }
    }
}

/// Identity of a polygon register slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u8);

impl SlotId {
    pub const A: SlotId = SlotId(0);
    pub const B: SlotId = SlotId(1);
    pub const C: SlotId = SlotId(2);
    pub const D: SlotId = SlotId(3);
    pub const E: SlotId = SlotId(4);
    pub const F: SlotId = SlotId(5);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Letter name of the slot ('A' for slot 0)
    pub fn label(self) -> char {
        (b'A' + self.0.min(25)) as char
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The contents of one polygon register
///
/// `z` holds per-vertex depth for the ray intersection path. Commands on the
/// wire only carry one depth, so [`PolygonFields::new`] copies it to all three
/// vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPolygonFields", into = "RawPolygonFields")]
pub struct PolygonFields {
    pub color: Color,
    pub vertices: [Vertex; 3],
    pub depth: u8,
    pub z: [u8; 3],
}

/// Serialized form; `z` may be omitted and defaults to the flat depth
#[derive(Serialize, Deserialize)]
struct RawPolygonFields {
    color: Color,
    vertices: [Vertex; 3],
    depth: u8,
    #[serde(default)]
    z: Option<[u8; 3]>,
}

impl From<PolygonFields> for RawPolygonFields {
    fn from(fields: PolygonFields) -> Self {
        Self {
            color: fields.color,
            vertices: fields.vertices,
            depth: fields.depth,
            z: Some(fields.z),
        }
    }
}

impl From<RawPolygonFields> for PolygonFields {
    fn from(raw: RawPolygonFields) -> Self {
        let fields = PolygonFields::new(raw.color, raw.vertices, raw.depth);
        match raw.z {
            Some(z) => fields.with_vertex_depths(z),
            None => fields,
        }
    }
}

impl PolygonFields {
    /// Create a flat polygon
    ///
    /// # Arguments
    ///
    /// * `color` - Fill color
    /// * `vertices` - Triangle corners in compressed screen space
    /// * `depth` - Polygon depth (masked to 3 bits)
    pub fn new(color: Color, vertices: [Vertex; 3], depth: u8) -> Self {
        let depth = mask(depth as u64, DEPTH_BITS) as u8;
        Self {
            color,
            vertices,
            depth,
            z: [depth; 3],
        }
    }

    /// Replace the per-vertex depths (masked to 3 bits each)
    pub fn with_vertex_depths(mut self, z: [u8; 3]) -> Self {
        self.z = z.map(|z| mask(z as u64, DEPTH_BITS) as u8);
        self
    }

    pub fn vertex3(&self, index: usize) -> Vertex3 {
        Vertex3::new(self.vertices[index], self.z[index])
    }
}
