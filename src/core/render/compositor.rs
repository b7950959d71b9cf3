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

//! Pixel compositor
//!
//! Every enabled slot is tested against the pixel; the covering slots are then
//! reduced to one winner by the configured policy:
//!
//! - `NumericDepth`: lowest depth wins. On equal depth the later slot wins, so
//!   for two slots B is drawn over A.
//! - `FixedPriority`: lowest slot index wins (A over B over ... over F).
//!
//! With no covering slot the background color is output.

use super::depth::DepthResolver;
use super::rasterizer::Rasterizer;
use crate::core::config::{CompositePolicy, CoverageMode, GpuConfig};
use crate::core::polygon::{Color, PolygonFields, PolygonStore, SlotId};

/// A slot covering the current pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub slot: SlotId,
    /// Flat polygon depth, or the resolved per-pixel depth for ray coverage
    pub depth: u8,
    pub color: Color,
}

/// Lowest depth wins; ties go to the later hit
pub fn pick_lowest_depth<I: IntoIterator<Item = Hit>>(hits: I) -> Option<Hit> {
    hits.into_iter().fold(None, |best, hit| match best {
        Some(best) if best.depth < hit.depth => Some(best),
        _ => Some(hit),
    })
}

/// Lowest slot index wins
pub fn pick_highest_priority<I: IntoIterator<Item = Hit>>(hits: I) -> Option<Hit> {
    hits.into_iter().min_by_key(|hit| hit.slot)
}

/// Resolves the visible color of each pixel
///
/// # Examples
///
/// ```
/// use trigpu::core::config::{GpuConfig, SlotCount};
/// use trigpu::core::polygon::{Color, PolygonFields, PolygonStore, SlotId, Vertex};
/// use trigpu::core::render::Compositor;
///
/// let config = GpuConfig::two_slot();
/// let compositor = Compositor::new(&config);
/// let mut store = PolygonStore::new(config.slots);
///
/// let tri = [Vertex::new(10, 10), Vertex::new(20, 10), Vertex::new(10, 20)];
/// store.write(SlotId::A, PolygonFields::new(Color::RED, tri, 0), true);
/// store.write(SlotId::B, PolygonFields::new(Color::BLUE, tri, 4), true);
///
/// assert_eq!(compositor.resolve(120, 120, &store, Color::BLACK), Color::RED);
/// assert_eq!(compositor.resolve(0, 0, &store, Color::GREEN), Color::GREEN);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    coverage: CoverageMode,
    policy: CompositePolicy,
    rasterizer: Rasterizer,
    depth: DepthResolver,
}

impl Compositor {
    pub fn new(config: &GpuConfig) -> Self {
        let scale = config.vertex_scale.get();
        Self {
            coverage: config.coverage,
            policy: config.policy,
            rasterizer: Rasterizer::new(scale),
            depth: DepthResolver::new(scale),
        }
    }

    pub fn policy(&self) -> CompositePolicy {
        self.policy
    }

    /// Test one polygon against a pixel
    pub fn hit(&self, slot: SlotId, polygon: &PolygonFields, px: i64, py: i64) -> Option<Hit> {
        let depth = match self.coverage {
            CoverageMode::EdgeFunction => {
                self.rasterizer.covers(polygon, px, py).then_some(polygon.depth)?
            }
            CoverageMode::RayIntersection => self.depth.resolve(polygon, px, py)?,
        };

        Some(Hit {
            slot,
            depth,
            color: polygon.color,
        })
    }

    /// All enabled slots covering a pixel, in slot order
    pub fn hits<'a>(
        &'a self,
        px: i64,
        py: i64,
        store: &'a PolygonStore,
    ) -> impl Iterator<Item = Hit> + 'a {
        store
            .iter_enabled()
            .filter_map(move |(slot, polygon)| self.hit(slot, polygon, px, py))
    }

    /// The winning hit for a pixel, if any
    pub fn winner(&self, px: i64, py: i64, store: &PolygonStore) -> Option<Hit> {
        let hits = self.hits(px, py, store);
        match self.policy {
            CompositePolicy::NumericDepth => pick_lowest_depth(hits),
            CompositePolicy::FixedPriority => pick_highest_priority(hits),
        }
    }

    /// Visible color at a pixel
    pub fn resolve(&self, px: i64, py: i64, store: &PolygonStore, background: Color) -> Color {
        self.winner(px, py, store).map_or(background, |hit| hit.color)
    }
}
