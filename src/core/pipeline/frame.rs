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

//! Captured display frames

use crate::core::error::Result;
use crate::core::polygon::Rgb;
use crate::core::timing::{ScreenPosition, VISIBLE_COLS, VISIBLE_ROWS};
use std::path::Path;

/// The visible 640x480 region of one scanned frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl FrameBuffer {
    /// Create a black frame of the visible size
    pub fn new() -> Self {
        let width = VISIBLE_COLS as usize;
        let height = VISIBLE_ROWS as usize;
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at `(x, y)`; out-of-range positions read as black
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        if x >= self.width || y >= self.height {
            return Rgb::BLACK;
        }
        self.pixels[y * self.width + x]
    }

    /// Store a pixel at a scan position; positions outside the visible region are ignored
    pub fn set(&mut self, position: ScreenPosition, rgb: Rgb) {
        if position.is_visible() {
            let index = position.row as usize * self.width + position.col as usize;
            self.pixels[index] = rgb;
        }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Whether every pixel has the given color
    pub fn is_uniform(&self, rgb: Rgb) -> bool {
        self.pixels.iter().all(|&p| p == rgb)
    }

    /// Row-major RGB24 bytes (width x height x 3)
    pub fn to_rgb24(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect()
    }

    /// Binary PPM (P6) image
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend(self.to_rgb24());
        out
    }

    /// Write the frame as a binary PPM file
    pub fn write_ppm<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_ppm())?;
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
