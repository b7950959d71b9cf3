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

//! Ray/triangle intersection depth resolver
//!
//! A ray is cast from `(px, py, 0)` along `-z` and intersected with the triangle
//! using Moller-Trumbore. With the ray direction fixed, the cross products
//! collapse to 2D determinants:
//!
//! ```text
//! e1 = v1 - v0              e2 = v2 - v0
//! a  = e1.x * e2.y - e1.y * e2.x          (determinant)
//! s  = (px, py, 0) - v0
//! u  = s.x * e2.y - s.y * e2.x            (barycentric, scaled by a)
//! q  = s x e1
//! v  = -q.z                               (barycentric, scaled by a)
//! t  = dot(e2, q) / a
//! ```
//!
//! The pixel is covered when `a > 0`, `0 <= u <= a`, `0 <= v <= a` and
//! `u + v <= a`. The intersection lies at `z = -t`, so the reported depth is
//! `-round(t)`. The hardware divides by multiplying with the fixed-point
//! reciprocal approximation of `a`.
//!
//! # References
//!
//! - [Moller-Trumbore intersection](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm)

use crate::core::math::{round_fixed, saturate_unsigned, FixedReciprocal, RECIPROCAL_FRAC_BITS};
use crate::core::polygon::{PolygonFields, DEPTH_BITS};

/// Intermediate integer terms of one intersection test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayTerms {
    /// Determinant `a`
    pub determinant: i64,
    /// Barycentric `u`, scaled by `a`
    pub u: i64,
    /// Barycentric `v`, scaled by `a`
    pub v: i64,
    /// `dot(e2, q)`, i.e. `t * a`
    pub unscaled_t: i64,
}

impl RayTerms {
    /// Whether the ray hits the triangle
    ///
    /// Zero or negative determinants (degenerate or back-facing triangles) never
    /// hit.
    pub fn hits(&self) -> bool {
        let a = self.determinant;
        a > 0 && (0..=a).contains(&self.u) && (0..=a).contains(&self.v) && self.u + self.v <= a
    }
}

/// Per-pixel depth from ray intersection
///
/// # Examples
///
/// ```
/// use trigpu::core::polygon::{Color, PolygonFields, Vertex};
/// use trigpu::core::render::DepthResolver;
///
/// let poly = PolygonFields::new(
///     Color::RED,
///     [Vertex::new(60, 20), Vertex::new(44, 41), Vertex::new(0, 0)],
///     0,
/// )
/// .with_vertex_depths([0, 7, 4]);
///
/// let resolver = DepthResolver::new(10);
/// assert_eq!(resolver.resolve(&poly, 600, 200), Some(0));
/// assert_eq!(resolver.resolve(&poly, 440, 410), Some(7));
/// assert_eq!(resolver.resolve(&poly, 0, 0), Some(4));
/// assert_eq!(resolver.resolve(&poly, 639, 0), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthResolver {
    scale: i64,
}

impl DepthResolver {
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    /// Compute the intersection terms for pixel `(px, py)`
    pub fn terms(&self, polygon: &PolygonFields, px: i64, py: i64) -> RayTerms {
        let [v0, v1, v2] = [0, 1, 2].map(|i| {
            let vertex = polygon.vertex3(i);
            let (x, y) = vertex.xy.to_screen(self.scale);
            [x, y, vertex.z as i64]
        });

        let e1 = sub(v1, v0);
        let e2 = sub(v2, v0);
        let s = sub([px, py, 0], v0);

        let determinant = e1[0] * e2[1] - e1[1] * e2[0];
        let u = s[0] * e2[1] - s[1] * e2[0];
        let q = cross(s, e1);
        let v = -q[2];
        let unscaled_t = e2[0] * q[0] + e2[1] * q[1] + e2[2] * q[2];

        RayTerms {
            determinant,
            u,
            v,
            unscaled_t,
        }
    }

    /// Whether the ray through `(px, py)` hits the polygon
    pub fn covers(&self, polygon: &PolygonFields, px: i64, py: i64) -> bool {
        self.terms(polygon, px, py).hits()
    }

    /// Resolve the depth at `(px, py)` using the fixed-point reciprocal
    ///
    /// # Returns
    ///
    /// - `Some(depth)` in `0..=7` if the pixel is covered
    /// - `None` otherwise
    pub fn resolve(&self, polygon: &PolygonFields, px: i64, py: i64) -> Option<u8> {
        let terms = self.terms(polygon, px, py);
        if !terms.hits() {
            return None;
        }

        let inverse = FixedReciprocal::from_value(terms.determinant);
        let t = terms.unscaled_t as i128 * inverse.signed_raw();
        let depth = -round_fixed(t, RECIPROCAL_FRAC_BITS);

        Some(saturate_unsigned(depth, DEPTH_BITS) as u8)
    }

    /// Resolve the unrounded depth at `(px, py)` using an exact division
    pub fn resolve_reference(&self, polygon: &PolygonFields, px: i64, py: i64) -> Option<f64> {
        let terms = self.terms(polygon, px, py);
        terms
            .hits()
            .then(|| -(terms.unscaled_t as f64 / terms.determinant as f64))
    }
}

#[inline(always)]
fn sub(a: [i64; 3], b: [i64; 3]) -> [i64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
fn cross(a: [i64; 3], b: [i64; 3]) -> [i64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::polygon::{Color, Vertex};
    use crate::core::render::rasterizer::inside;
    use proptest::prelude::*;

    fn large_triangle() -> PolygonFields {
        PolygonFields::new(
            Color::GREEN,
            [Vertex::new(60, 20), Vertex::new(44, 41), Vertex::new(0, 0)],
            0,
        )
        .with_vertex_depths([0, 7, 4])
    }

    #[test]
    fn test_terms_at_vertices() {
        let resolver = DepthResolver::new(10);
        let poly = large_triangle();

        let terms = resolver.terms(&poly, 440, 410);
        assert_eq!(terms.determinant, 158_000);
        assert_eq!(terms.u, 158_000);
        assert_eq!(terms.v, 0);
        assert_eq!(terms.unscaled_t, -1_106_000);

        let terms = resolver.terms(&poly, 0, 0);
        assert_eq!(terms.u, 0);
        assert_eq!(terms.v, 158_000);
        assert_eq!(terms.unscaled_t, -632_000);

        let terms = resolver.terms(&poly, 600, 200);
        assert_eq!((terms.u, terms.v, terms.unscaled_t), (0, 0, 0));
    }

    #[test]
    fn test_corner_depths() {
        let resolver = DepthResolver::new(10);
        let poly = large_triangle();

        assert_eq!(resolver.resolve(&poly, 600, 200), Some(0));
        assert_eq!(resolver.resolve(&poly, 440, 410), Some(7));
        assert_eq!(resolver.resolve(&poly, 0, 0), Some(4));
    }

    #[test]
    fn test_nonzero_first_vertex_depth() {
        let resolver = DepthResolver::new(10);
        let poly = large_triangle().with_vertex_depths([3, 7, 4]);
        assert_eq!(resolver.resolve(&poly, 600, 200), Some(3));
        assert_eq!(resolver.resolve(&poly, 440, 410), Some(7));
    }

    #[test]
    fn test_flat_polygon_depth() {
        let resolver = DepthResolver::new(10);
        let poly = PolygonFields::new(
            Color::RED,
            [Vertex::new(10, 10), Vertex::new(20, 10), Vertex::new(10, 20)],
            5,
        );

        assert_eq!(resolver.resolve(&poly, 120, 120), Some(5));
        assert_eq!(resolver.resolve(&poly, 100, 100), Some(5));
        assert_eq!(resolver.resolve(&poly, 99, 120), None);
    }

    #[test]
    fn test_outside_and_backfacing() {
        let resolver = DepthResolver::new(10);
        let poly = large_triangle();
        assert_eq!(resolver.resolve(&poly, 639, 0), None);
        assert_eq!(resolver.resolve(&poly, 0, 479), None);

        // Reversed winding has a negative determinant
        let mut flipped = poly;
        flipped.vertices.swap(1, 2);
        flipped.z.swap(1, 2);
        assert!(resolver.terms(&flipped, 300, 200).determinant < 0);
        assert_eq!(resolver.resolve(&flipped, 300, 200), None);
    }

    #[test]
    fn test_degenerate_never_covers() {
        let resolver = DepthResolver::new(10);
        let poly = PolygonFields::new(
            Color::RED,
            [Vertex::new(0, 0), Vertex::new(10, 0), Vertex::new(20, 0)],
            2,
        );
        assert_eq!(resolver.terms(&poly, 50, 0).determinant, 0);
        assert_eq!(resolver.resolve(&poly, 50, 0), None);
        assert_eq!(resolver.resolve(&poly, 0, 0), None);
    }

    #[test]
    fn test_reference_depth() {
        let resolver = DepthResolver::new(10);
        let poly = large_triangle();

        let z = resolver.resolve_reference(&poly, 440, 410).unwrap();
        assert!((z - 7.0).abs() < 1e-9);

        let z = resolver.resolve_reference(&poly, 0, 0).unwrap();
        assert!((z - 4.0).abs() < 1e-9);

        assert!(resolver.resolve_reference(&poly, 639, 0).is_none());
    }

    proptest! {
        #[test]
        fn prop_interior_close_to_reference(px in 0i64..640, py in 0i64..480) {
            let resolver = DepthResolver::new(10);
            let poly = large_triangle();

            if let Some(depth) = resolver.resolve(&poly, px, py) {
                let exact = resolver.resolve_reference(&poly, px, py).unwrap();
                prop_assert!((depth as f64 - exact).abs() <= 0.6, "{} vs {}", depth, exact);
            }
        }

        #[test]
        fn prop_matches_edge_coverage(
            xs in proptest::array::uniform3(0u8..64),
            ys in proptest::array::uniform3(0u8..48),
            px in 0i64..640,
            py in 0i64..480,
        ) {
            let vertices = [0, 1, 2].map(|i| Vertex::new(xs[i], ys[i]));
            let poly = PolygonFields::new(Color::RED, vertices, 0);
            let resolver = DepthResolver::new(10);

            let [v0, v1, v2] = vertices.map(|v| v.to_screen(10));
            let terms = resolver.terms(&poly, px, py);
            prop_assume!(terms.determinant > 0);

            prop_assert_eq!(terms.hits(), inside(v0, v1, v2, px, py));
        }
    }
}
