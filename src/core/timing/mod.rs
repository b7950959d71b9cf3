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

//! VGA display timing generator
//!
//! Standard 640x480 @ 60 Hz timing with a 25 MHz pixel clock. One call to
//! [`TimingGenerator::tick`] advances one pixel.
//!
//! ```text
//! Horizontal (pixels)              Vertical (lines)
//! ----------------------------     ----------------------------
//! 0..=639     visible              0..=479     visible
//! 640..=655   front porch          480..=489   front porch
//! 656..=751   sync (low)           490..=491   sync (low)
//! 752..=799   back porch           492..=524   back porch
//! ```
//!
//! Both sync signals are active low. The load-enable window (when polygon
//! registers may be written) spans the whole vertical blank, rows 480..=524.
//!
//! # References
//!
//! - [VGA Signal 640 x 480 @ 60 Hz](http://tinyvga.com/vga-timing/640x480@60Hz)

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Total pixel clocks per line
pub const TOTAL_COLS: u16 = 800;
/// Total lines per frame
pub const TOTAL_ROWS: u16 = 525;
/// Visible columns
pub const VISIBLE_COLS: u16 = 640;
/// Visible rows
pub const VISIBLE_ROWS: u16 = 480;
/// First column of the horizontal sync pulse
pub const H_SYNC_START: u16 = 656;
/// Last column of the horizontal sync pulse
pub const H_SYNC_END: u16 = 751;
/// First row of the vertical sync pulse
pub const V_SYNC_START: u16 = 490;
/// Last row of the vertical sync pulse
pub const V_SYNC_END: u16 = 491;

bitflags! {
    /// Display control signal levels at one pixel
    ///
    /// A set bit means the line is high. `H_SYNC` and `V_SYNC` are active low,
    /// so they are set outside the sync pulses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyncSignals: u8 {
        /// Horizontal sync line level
        const H_SYNC = 1 << 0;
        /// Vertical sync line level
        const V_SYNC = 1 << 1;
        /// Position is outside the visible region
        const SCREEN_INACTIVE = 1 << 2;
        /// Polygon registers may be written (vertical blank)
        const LOAD_ENABLE = 1 << 3;
    }
}

/// A scan position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub col: u16,
    pub row: u16,
}

impl ScreenPosition {
    pub fn new(col: u16, row: u16) -> Self {
        Self { col, row }
    }

    pub fn is_visible(&self) -> bool {
        self.col < VISIBLE_COLS && self.row < VISIBLE_ROWS
    }
}

/// Free-running column/row counters with derived sync signals
///
/// # Examples
///
/// ```
/// use trigpu::core::timing::{SyncSignals, TimingGenerator};
///
/// let mut timing = TimingGenerator::new();
/// assert!(timing.signals().contains(SyncSignals::H_SYNC | SyncSignals::V_SYNC));
/// assert!(!timing.load_enable());
///
/// // Step to the first blanking line
/// for _ in 0..(800 * 480) {
///     timing.tick();
/// }
/// assert_eq!(timing.position().row, 480);
/// assert!(timing.load_enable());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingGenerator {
    /// Column counter (0-799)
    col: u16,

    /// Row counter (0-524)
    row: u16,

    /// Completed frames since reset
    frame: u64,
}

impl TimingGenerator {
    pub fn new() -> Self {
        Self {
            col: 0,
            row: 0,
            frame: 0,
        }
    }

    /// Return to the top-left position
    pub fn reset(&mut self) {
        self.col = 0;
        self.row = 0;
        self.frame = 0;
    }

    /// Advance one pixel clock
    ///
    /// # Returns
    ///
    /// `true` if the counters wrapped to the start of a new frame
    pub fn tick(&mut self) -> bool {
        self.col += 1;
        if self.col < TOTAL_COLS {
            return false;
        }

        self.col = 0;
        self.row += 1;
        if self.row < TOTAL_ROWS {
            return false;
        }

        self.row = 0;
        self.frame += 1;
        log::trace!("Frame {} complete", self.frame);
        true
    }

    pub fn position(&self) -> ScreenPosition {
        ScreenPosition::new(self.col, self.row)
    }

    /// Horizontal sync level (low during the pulse)
    pub fn h_sync(&self) -> bool {
        !(H_SYNC_START..=H_SYNC_END).contains(&self.col)
    }

    /// Vertical sync level (low during the pulse)
    pub fn v_sync(&self) -> bool {
        !(V_SYNC_START..=V_SYNC_END).contains(&self.row)
    }

    pub fn screen_inactive(&self) -> bool {
        !self.position().is_visible()
    }

    /// Whether polygon registers may be written at this position
    pub fn load_enable(&self) -> bool {
        self.row >= VISIBLE_ROWS
    }

    /// All control signals at the current position
    pub fn signals(&self) -> SyncSignals {
        let mut signals = SyncSignals::empty();
        signals.set(SyncSignals::H_SYNC, self.h_sync());
        signals.set(SyncSignals::V_SYNC, self.v_sync());
        signals.set(SyncSignals::SCREEN_INACTIVE, self.screen_inactive());
        signals.set(SyncSignals::LOAD_ENABLE, self.load_enable());
        signals
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Restore a saved position, wrapping out-of-range counters
    pub fn set_position(&mut self, position: ScreenPosition) {
        self.col = position.col % TOTAL_COLS;
        self.row = position.row % TOTAL_ROWS;
    }
}

impl Default for TimingGenerator {
    fn default() -> Self {
        Self::new()
    }
}
