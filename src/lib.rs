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

//! trigpu: golden model of a fixed-function triangle GPU
//!
//! This crate provides a deterministic, cycle-steppable software model of a small
//! triangle GPU: a serial command port, a bank of polygon registers, a per-pixel
//! coverage/depth pipeline and a VGA timing generator.
//!
//! # Architecture
//!
//! The model is organized into the following modules:
//!
//! - [`core`]: Core model components (codec, polygon store, render, timing, pipeline)
//!
//! # Example
//!
//! ```
//! use trigpu::core::config::GpuConfig;
//! use trigpu::core::command::Command;
//! use trigpu::core::pipeline::Gpu;
//! use trigpu::core::polygon::Color;
//!
//! let mut gpu = Gpu::new(GpuConfig::two_slot())?;
//! gpu.execute(Command::EnableScreen);
//! gpu.execute(Command::SetBackground { color: Color::RED });
//!
//! let frame = gpu.run_frame();
//! assert_eq!(frame.pixel(0, 0).r, 192);
//! # Ok::<(), trigpu::core::error::GpuError>(())
//! ```
//!
//! # Getting Started
//!
//! 1. Build a [`core::config::GpuConfig`] (or load one from TOML)
//! 2. Create a [`core::pipeline::Gpu`] from it
//! 3. Feed command frames over the serial port and tick the pixel clock
//!
//! # Modules
//!
//! - [`core::math`]: Reciprocal approximation and fixed-point helpers
//! - [`core::command`]: Command frame codec and serial receiver
//! - [`core::polygon`]: Polygon register store and primitive types
//! - [`core::render`]: Rasterizer, depth resolver and compositor
//! - [`core::timing`]: 640x480 VGA timing generator
//! - [`core::pipeline`]: Top-level stepper tying everything together
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, GpuError>`. The per-tick model itself never fails.

pub mod core;

// Re-export commonly used types
pub use core::error::{GpuError, Result};
