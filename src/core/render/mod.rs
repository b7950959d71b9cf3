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

//! Per-pixel rendering
//!
//! There is no framebuffer: every pixel is evaluated on the fly as the display
//! scans it.
//!
//! - [`Rasterizer`]: edge-function inside test
//! - [`DepthResolver`]: ray intersection with per-pixel depth
//! - [`Compositor`]: picks the visible polygon among the covering slots

pub mod compositor;
pub mod depth;
pub mod rasterizer;

pub use compositor::{pick_highest_priority, pick_lowest_depth, Compositor, Hit};
pub use depth::{DepthResolver, RayTerms};
pub use rasterizer::{edge, inside, Rasterizer};
