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

//! Top-level GPU model
//!
//! [`Gpu`] ties the serial port, command codec, polygon store, compositor and
//! timing generator together. It is advanced by two independent clocks:
//!
//! - the serial clock, one [`Gpu::clock_serial_bit`] per SCK edge
//! - the pixel clock, one [`Gpu::tick`] per displayed pixel
//!
//! # Clock Domain Crossing
//!
//! A command completed on the serial side is held as the single pending command
//! and applied on the next pixel tick, using that tick's write gate. If a
//! second frame completes before the pixel clock picks up the first, the first
//! is overwritten (overrun).
//!
//! [`Gpu::send_frame`] drives both clocks: it runs `ticks_per_serial_bit` pixel
//! ticks after every bit, so a whole-frame send always leaves time for the
//! pixel clock to pick the command up. Driving [`Gpu::clock_serial_bit`] and
//! [`Gpu::tick`] directly gives full control over the interleaving.
//!
//! ```text
//! serial bits -> SerialReceiver -> CommandCodec -> pending
//!                                                     |
//! pixel tick  -> TimingGenerator ---- write gate ---> execute -> PolygonStore
//!                      |                                              |
//!                      +------------ position ---> Compositor <-------+
//!                                                     |
//!                                               DisplayOutput
//! ```
//!
//! # Write Gate
//!
//! Polygon writes and clears are accepted during vertical blank, or at any
//! time while the screen is disabled. With the screen enabled a polygon
//! committed in one blanking period is first visible in the next frame and
//! never changes mid-scan; with it disabled nothing is displayed, so the
//! registers can be loaded freely.

mod frame;
#[cfg(test)]
mod tests;

pub use frame::FrameBuffer;

use crate::core::command::serial::{FrameEvent, SerialReceiver};
use crate::core::command::{Command, CommandCodec};
use crate::core::config::GpuConfig;
use crate::core::error::{GpuError, Result};
use crate::core::polygon::{Color, PolygonStore, Rgb, WriteOutcome};
use crate::core::render::Compositor;
use crate::core::timing::{ScreenPosition, SyncSignals, TimingGenerator, TOTAL_COLS, TOTAL_ROWS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Register state mutated by commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub store: PolygonStore,
    pub background: Color,
    pub screen_enabled: bool,
}

impl PipelineState {
    pub fn new(config: &GpuConfig) -> Self {
        Self {
            store: PolygonStore::new(config.slots),
            background: Color::BLACK,
            screen_enabled: false,
        }
    }
}

/// Result of executing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State was updated
    Applied,
    /// A polygon write or clear arrived outside the load window
    DroppedGateClosed,
    /// Invalid opcode or nonexistent slot; nothing changed
    Ignored,
    /// Device id was staged for the next serial transaction
    DeviceId(u8),
}

/// Counters of command traffic since reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Commands that changed state
    pub committed: u64,
    /// Polygon writes/clears dropped by a closed write gate
    pub dropped_gate: u64,
    /// Invalid opcodes and nonexistent slots
    pub invalid: u64,
    /// Frames cut short by chip select
    pub truncated: u64,
    /// Pending commands overwritten before they were applied
    pub overrun: u64,
}

/// Display port sample for one pixel tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOutput {
    pub position: ScreenPosition,
    /// Pixel color; black outside the visible region or while the screen is disabled
    pub rgb: Rgb,
    pub signals: SyncSignals,
}

impl DisplayOutput {
    pub fn h_sync(&self) -> bool {
        self.signals.contains(SyncSignals::H_SYNC)
    }

    pub fn v_sync(&self) -> bool {
        self.signals.contains(SyncSignals::V_SYNC)
    }

    /// Frame interrupt: asserted for the whole vertical blank
    pub fn frame_interrupt(&self) -> bool {
        self.signals.contains(SyncSignals::LOAD_ENABLE)
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    config: GpuConfig,
    state: PipelineState,
    position: ScreenPosition,
}

/// Cycle-steppable GPU model
///
/// # Examples
///
/// ```
/// use trigpu::core::command::Command;
/// use trigpu::core::config::GpuConfig;
/// use trigpu::core::pipeline::{CommandOutcome, Gpu};
/// use trigpu::core::polygon::{Color, PolygonFields, SlotId, Vertex};
///
/// let mut gpu = Gpu::new(GpuConfig::two_slot())?;
/// let fields = PolygonFields::new(
///     Color::BLUE,
///     [Vertex::new(0, 0), Vertex::new(63, 0), Vertex::new(0, 47)],
///     0,
/// );
/// let write = Command::WritePolygon { slot: SlotId::A, fields };
///
/// // With the screen on, a write outside vertical blank is dropped
/// gpu.execute(Command::EnableScreen);
/// assert_eq!(gpu.execute(write), CommandOutcome::DroppedGateClosed);
///
/// gpu.run_until_load_window();
/// assert_eq!(gpu.execute(write), CommandOutcome::Applied);
///
/// let frame = gpu.run_frame();
/// assert_eq!(frame.pixel(10, 10), Color::BLUE.upscale());
/// # Ok::<(), trigpu::core::error::GpuError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Gpu {
    config: GpuConfig,
    codec: CommandCodec,
    serial: SerialReceiver,
    timing: TimingGenerator,
    compositor: Compositor,
    state: PipelineState,

    /// Command completed on the serial side, waiting for the pixel clock
    pending: Option<Command>,

    stats: PipelineStats,
}

impl Gpu {
    /// Pixel ticks per frame
    pub const TICKS_PER_FRAME: u32 = TOTAL_COLS as u32 * TOTAL_ROWS as u32;

    /// Create a model in its reset state
    ///
    /// # Returns
    ///
    /// - `Ok(Gpu)` for a valid configuration
    /// - `Err(GpuError::InvalidConfig)` otherwise
    pub fn new(config: GpuConfig) -> Result<Self> {
        config.validate()?;
        let codec = CommandCodec::from_config(&config);

        log::debug!("Creating GPU model: {}", config);

        Ok(Self {
            config,
            codec,
            serial: SerialReceiver::new(codec.frame_bits()),
            timing: TimingGenerator::new(),
            compositor: Compositor::new(&config),
            state: PipelineState::new(&config),
            pending: None,
            stats: PipelineStats::default(),
        })
    }

    /// Return to the power-on state
    ///
    /// Slots are cleared and disabled, the background is black, the screen is
    /// disabled and the scan position is (0, 0).
    pub fn reset(&mut self) {
        self.serial.reset();
        self.timing.reset();
        self.state = PipelineState::new(&self.config);
        self.pending = None;
        self.stats = PipelineStats::default();

        log::debug!("GPU reset");
    }

    // ========== Serial Port ==========

    /// Drive the chip select line (`true` while CS is low)
    pub fn set_chip_select(&mut self, active: bool) {
        if let Some(event) = self.serial.set_chip_select(active) {
            self.handle_frame_event(event);
        }
    }

    /// Clock one bit in on MOSI
    ///
    /// # Returns
    ///
    /// The MISO level presented for this bit
    pub fn clock_serial_bit(&mut self, mosi: bool) -> bool {
        let miso = self.serial.miso();
        if let Some(event) = self.serial.clock_bit(mosi) {
            self.handle_frame_event(event);
        }
        miso
    }

    /// Send one complete transaction: select, clock every byte LSB first, deselect
    ///
    /// The pixel clock runs `ticks_per_serial_bit` ticks after each bit, so a
    /// completed command is applied before this returns (unless the ratio is 0).
    /// Bits beyond the frame length are ignored; fewer bits yield a truncated frame.
    ///
    /// # Returns
    ///
    /// The first byte shifted out on MISO
    pub fn send_frame(&mut self, bytes: &[u8]) -> u8 {
        let mut response = 0u8;
        self.set_chip_select(true);

        for (index, bit) in bytes
            .iter()
            .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1 != 0))
            .enumerate()
        {
            let miso = self.clock_serial_bit(bit);
            if index < 8 {
                response |= (miso as u8) << index;
            }
            self.run_ticks(self.config.ticks_per_serial_bit as u64);
        }

        self.set_chip_select(false);
        response
    }

    /// Encode a command and send it over the serial port
    pub fn send_command(&mut self, command: &Command) -> u8 {
        let bytes = self.codec.encode_bytes(command);
        self.send_frame(&bytes)
    }

    fn handle_frame_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::Complete(word) => {
                let command = self.codec.decode_word(word);
                if let Some(previous) = self.pending.replace(command) {
                    self.stats.overrun += 1;
                    log::warn!("Pending command overrun, dropping {:?}", previous);
                }
            }
            FrameEvent::Truncated(err) => {
                self.stats.truncated += 1;
                log::warn!("Discarding frame: {}", err);
            }
        }
    }

    // ========== Pixel Clock ==========

    /// Advance one pixel clock
    ///
    /// Applies the pending command (if any) under the current write gate, samples
    /// the display output at the current position, then advances the scan.
    pub fn tick(&mut self) -> DisplayOutput {
        if let Some(command) = self.pending.take() {
            self.execute(command);
        }

        let position = self.timing.position();
        let rgb = if self.state.screen_enabled && position.is_visible() {
            self.resolve_pixel(position.col as i64, position.row as i64).upscale()
        } else {
            Rgb::BLACK
        };

        let output = DisplayOutput {
            position,
            rgb,
            signals: self.timing.signals(),
        };

        self.timing.tick();
        output
    }

    /// Execute a command immediately under the current write gate
    pub fn execute(&mut self, command: Command) -> CommandOutcome {
        let load_enable = self.write_gate();

        let outcome = match command {
            Command::DeviceId => {
                self.serial.load_response(self.config.device_id);
                log::debug!("Device id 0x{:02X} staged", self.config.device_id);
                CommandOutcome::DeviceId(self.config.device_id)
            }
            Command::WritePolygon { slot, fields } => {
                let outcome = self.state.store.write(slot, fields, load_enable);
                if outcome == WriteOutcome::Committed {
                    log::debug!("Slot {} written: {:?}", slot, fields);
                }
                Self::store_outcome(outcome)
            }
            Command::ClearPolygon { slot } => {
                let outcome = self.state.store.clear(slot, load_enable);
                if outcome == WriteOutcome::Committed {
                    log::debug!("Slot {} cleared", slot);
                }
                Self::store_outcome(outcome)
            }
            Command::EnableScreen => {
                self.state.screen_enabled = true;
                log::debug!("Screen enabled");
                CommandOutcome::Applied
            }
            Command::DisableScreen => {
                self.state.screen_enabled = false;
                log::debug!("Screen disabled");
                CommandOutcome::Applied
            }
            Command::SetBackground { color } => {
                self.state.background = color;
                log::debug!("Background color set to 0x{:02X}", color.raw());
                CommandOutcome::Applied
            }
            Command::Invalid { opcode } => {
                log::warn!("Unknown command opcode: 0x{:02X}", opcode);
                CommandOutcome::Ignored
            }
        };

        match outcome {
            CommandOutcome::Applied | CommandOutcome::DeviceId(_) => self.stats.committed += 1,
            CommandOutcome::DroppedGateClosed => {
                self.stats.dropped_gate += 1;
                log::warn!(
                    "Dropping {:?} outside load window at {:?}",
                    command,
                    self.timing.position()
                );
            }
            CommandOutcome::Ignored => self.stats.invalid += 1,
        }

        outcome
    }

    fn store_outcome(outcome: WriteOutcome) -> CommandOutcome {
        match outcome {
            WriteOutcome::Committed => CommandOutcome::Applied,
            WriteOutcome::GateClosed => CommandOutcome::DroppedGateClosed,
            WriteOutcome::NoSuchSlot => CommandOutcome::Ignored,
        }
    }

    /// Visible color at a pixel, regardless of screen enable and scan position
    pub fn resolve_pixel(&self, px: i64, py: i64) -> Color {
        self.compositor.resolve(px, py, &self.state.store, self.state.background)
    }

    // ========== Stepping Helpers ==========

    /// Advance `count` pixel ticks
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Tick until the load-enable window is open
    ///
    /// Returns immediately if it already is.
    pub fn run_until_load_window(&mut self) {
        while !self.timing.load_enable() {
            self.tick();
        }
    }

    /// Tick until the scan is at (0, 0)
    pub fn run_until_frame_start(&mut self) {
        while self.timing.position() != ScreenPosition::default() {
            self.tick();
        }
    }

    /// Step one full 800x525 period and capture the visible pixels
    ///
    /// The capture starts at the current scan position. Call
    /// [`Gpu::run_until_frame_start`] first for a frame aligned to (0, 0).
    pub fn run_frame(&mut self) -> FrameBuffer {
        let mut frame = FrameBuffer::new();
        for _ in 0..Self::TICKS_PER_FRAME {
            let output = self.tick();
            frame.set(output.position, output.rgb);
        }
        frame
    }

    // ========== Snapshots ==========

    /// Serialize register state and scan position
    ///
    /// Serial port progress and any pending command are not included.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            config: self.config,
            state: self.state.clone(),
            position: self.timing.position(),
        };
        Ok(bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())?)
    }

    /// Restore state from [`Gpu::snapshot`] output
    ///
    /// # Returns
    ///
    /// - `Err(GpuError::SnapshotDecode)` if the data is malformed
    /// - `Err(GpuError::SnapshotMismatch)` if it was taken with another configuration
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let (snapshot, _): (Snapshot, usize) =
            bincode::serde::decode_from_slice(data, bincode::config::standard())?;

        if snapshot.config != self.config {
            return Err(GpuError::SnapshotMismatch(format!(
                "snapshot taken with [{}], model is [{}]",
                snapshot.config, self.config
            )));
        }
        if snapshot.state.store.len() != self.config.slots.get() {
            return Err(GpuError::SnapshotMismatch(format!(
                "snapshot has {} slots, expected {}",
                snapshot.state.store.len(),
                self.config.slots.get()
            )));
        }

        self.state = snapshot.state;
        self.timing.set_position(snapshot.position);
        self.serial.reset();
        self.pending = None;

        log::debug!("Restored snapshot at {:?}", snapshot.position);
        Ok(())
    }

    /// Write a snapshot to a file
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.snapshot()?)?;
        Ok(())
    }

    /// Restore a snapshot from a file
    pub fn load_snapshot<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = std::fs::read(path)?;
        self.restore(&data)
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    pub fn codec(&self) -> &CommandCodec {
        &self.codec
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn store(&self) -> &PolygonStore {
        &self.state.store
    }

    pub fn background(&self) -> Color {
        self.state.background
    }

    pub fn screen_enabled(&self) -> bool {
        self.state.screen_enabled
    }

    pub fn position(&self) -> ScreenPosition {
        self.timing.position()
    }

    pub fn timing(&self) -> &TimingGenerator {
        &self.timing
    }

    pub fn load_enable(&self) -> bool {
        self.timing.load_enable()
    }

    /// Whether polygon writes and clears are accepted right now
    ///
    /// Open during vertical blank and whenever the screen is disabled.
    pub fn write_gate(&self) -> bool {
        !self.state.screen_enabled || self.timing.load_enable()
    }

    pub fn pending(&self) -> Option<&Command> {
        self.pending.as_ref()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}
