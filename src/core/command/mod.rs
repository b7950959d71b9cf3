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

//! Command frame codec
//!
//! Every command is one fixed-length frame, shifted in LSB first. Fields are
//! packed back to back after the opcode byte:
//!
//! ```text
//! Bits      Field
//! -------   --------------
//! [0,8)     opcode
//! [8,14)    color
//! [14,21)   v0.x
//! [21,28)   v1.x
//! [28,35)   v2.x
//! [35,41)   v0.y
//! [41,47)   v1.y
//! [47,53)   v2.y
//! [53,56)   depth (only in the with_depth layout)
//! ```
//!
//! As bytes, a frame is the 56-bit word in little-endian order (7 bytes).
//!
//! ## Opcodes
//!
//! ```text
//! 0x00          device id
//! 0x01          set background color
//! 0x20 / 0x21   disable / enable screen
//! 0x40 | slot   clear polygon
//! 0x80 | slot   write polygon
//! ```
//!
//! Anything else, including slot opcodes past the configured slot count,
//! decodes to [`Command::Invalid`].

pub mod serial;

use crate::core::config::{FrameLayout, GpuConfig, SlotCount};
use crate::core::math::mask;
use crate::core::polygon::{
    Color, PolygonFields, SlotId, Vertex, COLOR_BITS, DEPTH_BITS, VERTEX_X_BITS, VERTEX_Y_BITS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command opcodes
pub mod opcodes {
    /// Read device identification
    pub const DEVICE_ID: u8 = 0x00;
    /// Set background color
    pub const SET_BACKGROUND: u8 = 0x01;
    /// Disable screen output
    pub const DISABLE_SCREEN: u8 = 0x20;
    /// Enable screen output
    pub const ENABLE_SCREEN: u8 = 0x21;
    /// Clear polygon base (low bits select the slot)
    pub const CLEAR_POLYGON: u8 = 0x40;
    /// Write polygon base (low bits select the slot)
    pub const WRITE_POLYGON: u8 = 0x80;
}

/// Bit offsets of the frame fields
pub mod fields {
    pub const OPCODE: u32 = 0;
    pub const COLOR: u32 = 8;
    pub const V0_X: u32 = 14;
    pub const V1_X: u32 = 21;
    pub const V2_X: u32 = 28;
    pub const V0_Y: u32 = 35;
    pub const V1_Y: u32 = 41;
    pub const V2_Y: u32 = 47;
    pub const DEPTH: u32 = 53;
}

const SLOT_OPCODE_MASK: u8 = 0x3F;

/// A decoded command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    DeviceId,
    WritePolygon {
        slot: SlotId,
        fields: PolygonFields,
    },
    ClearPolygon { slot: SlotId },
    EnableScreen,
    DisableScreen,
    SetBackground { color: Color },
    /// Unknown opcode; must not change any state
    Invalid { opcode: u8 },
}

impl Command {
    /// Whether the command mutates the polygon store (and is therefore gated)
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            Command::WritePolygon { .. } | Command::ClearPolygon { .. }
        )
    }
}

/// A frame ended before all of its bits arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("truncated frame: expected {expected} bits, received {received}")]
    Truncated { expected: u32, received: u32 },
}

/// Encoder/decoder for one frame layout and slot count
///
/// # Examples
///
/// ```
/// use trigpu::core::command::{Command, CommandCodec};
/// use trigpu::core::config::GpuConfig;
/// use trigpu::core::polygon::Color;
///
/// let codec = CommandCodec::from_config(&GpuConfig::two_slot());
///
/// let bytes = codec.encode_bytes(&Command::SetBackground { color: Color::RED });
/// assert_eq!(bytes, [0x01, 0x30, 0, 0, 0, 0, 0]);
/// assert_eq!(codec.decode_bytes(&bytes), Ok(Command::SetBackground { color: Color::RED }));
///
/// assert_eq!(codec.decode_word(0x7F), Command::Invalid { opcode: 0x7F });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCodec {
    layout: FrameLayout,
    slots: SlotCount,
}

impl CommandCodec {
    pub fn new(layout: FrameLayout, slots: SlotCount) -> Self {
        Self { layout, slots }
    }

    pub fn from_config(config: &GpuConfig) -> Self {
        Self::new(config.frame_layout, config.slots)
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Number of bits in one frame
    pub fn frame_bits(&self) -> u32 {
        self.layout.bit_len()
    }

    /// Decode a frame word
    ///
    /// Bits above the frame length are ignored.
    pub fn decode_word(&self, word: u64) -> Command {
        let word = mask(word, self.frame_bits());
        let opcode = field(word, fields::OPCODE, 8) as u8;

        match opcode {
            opcodes::DEVICE_ID => Command::DeviceId,
            opcodes::SET_BACKGROUND => Command::SetBackground {
                color: Color::new(field(word, fields::COLOR, COLOR_BITS) as u8),
            },
            opcodes::DISABLE_SCREEN => Command::DisableScreen,
            opcodes::ENABLE_SCREEN => Command::EnableScreen,
            op if op & !SLOT_OPCODE_MASK == opcodes::WRITE_POLYGON => match self.slot_of(op) {
                Some(slot) => Command::WritePolygon {
                    slot,
                    fields: self.decode_fields(word),
                },
                None => Command::Invalid { opcode },
            },
            op if op & !SLOT_OPCODE_MASK == opcodes::CLEAR_POLYGON => match self.slot_of(op) {
                Some(slot) => Command::ClearPolygon { slot },
                None => Command::Invalid { opcode },
            },
            _ => Command::Invalid { opcode },
        }
    }

    /// Decode a little-endian byte buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Command)` if the buffer holds at least one full frame
    /// - `Err(FrameError::Truncated)` if it is too short
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Command, FrameError> {
        let needed = self.layout.byte_len();
        if bytes.len() < needed {
            return Err(FrameError::Truncated {
                expected: self.frame_bits(),
                received: bytes.len() as u32 * 8,
            });
        }

        let word = bytes[..needed]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc | ((b as u64) << (8 * i)));

        Ok(self.decode_word(word))
    }

    /// Encode a command into a frame word
    ///
    /// `Invalid` encodes its raw opcode with zeroed fields. Depth is dropped in
    /// the no_depth layout.
    pub fn encode(&self, command: &Command) -> u64 {
        let word = match *command {
            Command::DeviceId => opcodes::DEVICE_ID as u64,
            Command::SetBackground { color } => {
                opcodes::SET_BACKGROUND as u64 | ((color.raw() as u64) << fields::COLOR)
            }
            Command::DisableScreen => opcodes::DISABLE_SCREEN as u64,
            Command::EnableScreen => opcodes::ENABLE_SCREEN as u64,
            Command::ClearPolygon { slot } => {
                (opcodes::CLEAR_POLYGON | (slot.0 & SLOT_OPCODE_MASK)) as u64
            }
            Command::WritePolygon { slot, fields } => {
                let opcode = (opcodes::WRITE_POLYGON | (slot.0 & SLOT_OPCODE_MASK)) as u64;
                opcode | self.encode_fields(&fields)
            }
            Command::Invalid { opcode } => opcode as u64,
        };

        mask(word, self.frame_bits())
    }

    /// Encode a command into its 7-byte little-endian form
    pub fn encode_bytes(&self, command: &Command) -> [u8; 7] {
        let word = self.encode(command);
        let mut bytes = [0u8; 7];
        for (i, byte) in bytes.iter_mut().take(self.layout.byte_len()).enumerate() {
            *byte = (word >> (8 * i)) as u8;
        }
        bytes
    }

    /// Encode a command as the bit sequence clocked onto the wire, LSB first
    pub fn encode_bits(&self, command: &Command) -> Vec<bool> {
        let word = self.encode(command);
        (0..self.frame_bits()).map(|i| (word >> i) & 1 != 0).collect()
    }

    fn slot_of(&self, opcode: u8) -> Option<SlotId> {
        let index = opcode & SLOT_OPCODE_MASK;
        ((index as usize) < self.slots.get()).then_some(SlotId(index))
    }

    fn decode_fields(&self, word: u64) -> PolygonFields {
        let vertex = |x_at, y_at| {
            Vertex::new(
                field(word, x_at, VERTEX_X_BITS) as u8,
                field(word, y_at, VERTEX_Y_BITS) as u8,
            )
        };

        let depth = if self.layout.has_depth() {
            field(word, fields::DEPTH, DEPTH_BITS) as u8
        } else {
            0
        };

        PolygonFields::new(
            Color::new(field(word, fields::COLOR, COLOR_BITS) as u8),
            [
                vertex(fields::V0_X, fields::V0_Y),
                vertex(fields::V1_X, fields::V1_Y),
                vertex(fields::V2_X, fields::V2_Y),
            ],
            depth,
        )
    }

    fn encode_fields(&self, polygon: &PolygonFields) -> u64 {
        let [v0, v1, v2] = polygon.vertices;

        let mut word = ((polygon.color.raw() as u64) << fields::COLOR)
            | ((v0.x() as u64) << fields::V0_X)
            | ((v1.x() as u64) << fields::V1_X)
            | ((v2.x() as u64) << fields::V2_X)
            | ((v0.y() as u64) << fields::V0_Y)
            | ((v1.y() as u64) << fields::V1_Y)
            | ((v2.y() as u64) << fields::V2_Y);

        if self.layout.has_depth() {
            word |= (polygon.depth as u64) << fields::DEPTH;
        }

        word
    }
}

#[inline(always)]
fn field(word: u64, offset: u32, bits: u32) -> u64 {
    mask(word >> offset, bits)
}
