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

//! Model configuration
//!
//! Two hardware variants exist and differ in a handful of build-time parameters.
//! All of them are fixed when a [`Gpu`](crate::core::pipeline::Gpu) is constructed.
//!
//! ```text
//! Parameter      two_slot        six_slot
//! ------------   -------------   ---------------
//! slots          2 (A, B)        6 (A..F)
//! vertex_scale   10              8
//! frame_layout   with_depth      no_depth
//! coverage       edge_function   edge_function
//! policy         numeric_depth   fixed_priority
//! ```
//!
//! Configurations are stored as TOML:
//!
//! ```toml
//! slots = 2
//! vertex_scale = 10
//! frame_layout = "with_depth"
//! coverage = "ray_intersection"
//! policy = "numeric_depth"
//! device_id = 90
//! ticks_per_serial_bit = 1
//! ```

use crate::core::error::{GpuError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default device identification byte
pub const DEFAULT_DEVICE_ID: u8 = 0x5A;

/// Default pixel ticks run per serial bit by whole-frame sends
pub const DEFAULT_TICKS_PER_SERIAL_BIT: u32 = 1;

/// Command frame layout on the serial wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    /// Opcode, color, vertices and a 3-bit depth (56 bits)
    WithDepth,
    /// Opcode, color and vertices only (53 bits)
    NoDepth,
}

impl FrameLayout {
    /// Number of bits clocked per frame
    pub fn bit_len(self) -> u32 {
        match self {
            FrameLayout::WithDepth => 56,
            FrameLayout::NoDepth => 53,
        }
    }

    /// Number of bytes in the little-endian byte form of a frame
    ///
    /// Both layouts fit in seven bytes; the unused high bits are zero.
    pub fn byte_len(self) -> usize {
        self.bit_len().div_ceil(8) as usize
    }

    /// Whether the frame carries a depth field
    pub fn has_depth(self) -> bool {
        matches!(self, FrameLayout::WithDepth)
    }
}

/// Number of polygon register slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SlotCount {
    Two,
    Six,
}

impl SlotCount {
    pub fn get(self) -> usize {
        match self {
            SlotCount::Two => 2,
            SlotCount::Six => 6,
        }
    }
}

impl TryFrom<u8> for SlotCount {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            2 => Ok(SlotCount::Two),
            6 => Ok(SlotCount::Six),
            other => Err(format!("slot count must be 2 or 6, got {}", other)),
        }
    }
}

impl From<SlotCount> for u8 {
    fn from(value: SlotCount) -> Self {
        value.get() as u8
    }
}

/// Divisor between raw pixel coordinates and stored vertex coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VertexScale {
    Eight,
    Ten,
}

impl VertexScale {
    pub fn get(self) -> i64 {
        match self {
            VertexScale::Eight => 8,
            VertexScale::Ten => 10,
        }
    }
}

impl TryFrom<u8> for VertexScale {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            8 => Ok(VertexScale::Eight),
            10 => Ok(VertexScale::Ten),
            other => Err(format!("vertex scale must be 8 or 10, got {}", other)),
        }
    }
}

impl From<VertexScale> for u8 {
    fn from(value: VertexScale) -> Self {
        value.get() as u8
    }
}

/// Per-pixel coverage test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Three edge functions, flat per-polygon depth
    EdgeFunction,
    /// Ray/triangle intersection with interpolated per-pixel depth
    RayIntersection,
}

/// How overlapping polygons are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositePolicy {
    /// Lowest depth wins
    NumericDepth,
    /// Lowest slot index wins (A > B > ... > F)
    FixedPriority,
}

/// Construction-time parameters of the model
///
/// # Examples
///
/// ```
/// use trigpu::core::config::{GpuConfig, SlotCount};
///
/// let config = GpuConfig::from_toml_str("slots = 6\nvertex_scale = 8\n\
///     frame_layout = \"no_depth\"\ncoverage = \"edge_function\"\n\
///     policy = \"fixed_priority\"\ndevice_id = 90\n")?;
/// assert_eq!(config.slots, SlotCount::Six);
/// assert_eq!(config, GpuConfig::six_slot());
/// # Ok::<(), trigpu::core::error::GpuError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuConfig {
    pub slots: SlotCount,
    pub vertex_scale: VertexScale,
    pub frame_layout: FrameLayout,
    pub coverage: CoverageMode,
    pub policy: CompositePolicy,
    #[serde(default = "default_device_id")]
    pub device_id: u8,
    /// Pixel clock ticks run after each serial bit when sending whole frames
    #[serde(default = "default_ticks_per_serial_bit")]
    pub ticks_per_serial_bit: u32,
}

fn default_device_id() -> u8 {
    DEFAULT_DEVICE_ID
}

fn default_ticks_per_serial_bit() -> u32 {
    DEFAULT_TICKS_PER_SERIAL_BIT
}

impl GpuConfig {
    /// Two-slot variant with depth field and numeric-depth compositing
    pub fn two_slot() -> Self {
        Self {
            slots: SlotCount::Two,
            vertex_scale: VertexScale::Ten,
            frame_layout: FrameLayout::WithDepth,
            coverage: CoverageMode::EdgeFunction,
            policy: CompositePolicy::NumericDepth,
            device_id: DEFAULT_DEVICE_ID,
            ticks_per_serial_bit: DEFAULT_TICKS_PER_SERIAL_BIT,
        }
    }

    /// Six-slot variant without depth field, fixed priority compositing
    pub fn six_slot() -> Self {
        Self {
            slots: SlotCount::Six,
            vertex_scale: VertexScale::Eight,
            frame_layout: FrameLayout::NoDepth,
            coverage: CoverageMode::EdgeFunction,
            policy: CompositePolicy::FixedPriority,
            device_id: DEFAULT_DEVICE_ID,
            ticks_per_serial_bit: DEFAULT_TICKS_PER_SERIAL_BIT,
        }
    }

    /// Two-slot variant using ray intersection for per-pixel depth
    pub fn two_slot_ray() -> Self {
        Self {
            coverage: CoverageMode::RayIntersection,
            ..Self::two_slot()
        }
    }

    /// Check that the combination of parameters is supported
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the configuration can be built
    /// - `Err(GpuError::InvalidConfig)` if numeric-depth compositing is requested
    ///   but no depth information reaches the compositor
    pub fn validate(&self) -> Result<()> {
        let has_depth = self.frame_layout.has_depth()
            || self.coverage == CoverageMode::RayIntersection;

        if self.policy == CompositePolicy::NumericDepth && !has_depth {
            return Err(GpuError::InvalidConfig(
                "numeric_depth policy needs a depth field or ray_intersection coverage"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: GpuConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file
    ///
    /// # Returns
    ///
    /// - `Ok(GpuConfig)` if the file was read, parsed and validated
    /// - `Err(GpuError)` otherwise
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded config from {}: {}", path.as_ref().display(), config);
        Ok(config)
    }

    /// Save the configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self::two_slot()
    }
}

impl fmt::Display for GpuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} slots, /{}, {:?}, {:?}, {:?}",
            self.slots.get(),
            self.vertex_scale.get(),
            self.frame_layout,
            self.coverage,
            self.policy
        )
    }
}
