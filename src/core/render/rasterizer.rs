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

//! Edge-function rasterizer
//!
//! Coverage is evaluated independently for every scanned pixel; there is no
//! scanline setup. A pixel is inside when all three edge functions are
//! non-negative:
//!
//! ```text
//! e0 = (v1.x - v0.x) * (py - v0.y) - (v1.y - v0.y) * (px - v0.x)
//! e1 = (v2.x - v1.x) * (py - v1.y) - (v2.y - v1.y) * (px - v1.x)
//! e2 = (v0.x - v2.x) * (py - v2.y) - (v0.y - v2.y) * (px - v2.x)
//! ```
//!
//! The test is winding-sensitive: with Y pointing down, only triangles listed
//! clockwise on screen produce coverage. Pixels exactly on an edge are inside.
//!
//! # References
//!
//! - [Scratchapixel: Rasterization](https://www.scratchapixel.com/lessons/3d-basic-rendering/rasterization-practical-implementation)

use crate::core::polygon::PolygonFields;

/// Edge function of the directed edge `a -> b` at point `p`
#[inline(always)]
pub fn edge(a: (i64, i64), b: (i64, i64), p: (i64, i64)) -> i64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Inside test for a triangle in raw pixel coordinates
///
/// # Examples
///
/// ```
/// use trigpu::core::render::inside;
///
/// let (v0, v1, v2) = ((0, 0), (100, 0), (0, 100));
/// assert!(inside(v0, v1, v2, 10, 10));
/// assert!(inside(v0, v1, v2, 0, 0)); // on a vertex
/// assert!(!inside(v0, v1, v2, 90, 90));
///
/// // Counter-clockwise winding covers nothing
/// assert!(!inside(v0, v2, v1, 10, 10));
/// ```
#[inline]
pub fn inside(v0: (i64, i64), v1: (i64, i64), v2: (i64, i64), px: i64, py: i64) -> bool {
    let p = (px, py);
    edge(v0, v1, p) >= 0 && edge(v1, v2, p) >= 0 && edge(v2, v0, p) >= 0
}

/// Per-pixel coverage test for stored polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rasterizer {
    /// Vertex scale (compressed coordinate to pixel)
    scale: i64,
}

impl Rasterizer {
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Whether pixel `(px, py)` lies inside the polygon
    pub fn covers(&self, polygon: &PolygonFields, px: i64, py: i64) -> bool {
        let [v0, v1, v2] = polygon.vertices.map(|v| v.to_screen(self.scale));
        inside(v0, v1, v2, px, py)
    }
}
