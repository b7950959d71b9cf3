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

//! Serial command port
//!
//! Mode 0 shift register framed by an active-low chip select. The host pulls CS
//! low, clocks the frame in LSB first on MOSI, then releases CS.
//!
//! ```text
//! CS   ‾‾\______________________________/‾‾
//! SCK  ____/‾\_/‾\_/‾\_ ... _/‾\_/‾\________
//! MOSI      b0  b1  b2        bN-2 bN-1
//! ```
//!
//! - A frame completes as soon as the configured bit count has been clocked.
//! - Bits clocked after completion are ignored until CS is released.
//! - Releasing CS with a partial frame reports it as truncated; it is dropped.
//! - MISO shifts out a staged response byte, LSB first, during the next
//!   transaction.

use super::FrameError;

/// Serial port state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialState {
    /// Chip select released
    Idle,
    /// Chip select asserted, no bits clocked yet
    Selected,
    /// Frame bits are being shifted in
    Shifting,
    /// Full frame received, waiting for chip select release
    Complete,
}

/// Result of a serial edge that finished or aborted a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// All bits arrived; the raw frame word
    Complete(u64),
    /// Chip select was released mid-frame
    Truncated(FrameError),
}

/// Mode 0 serial receiver
///
/// # Examples
///
/// ```
/// use trigpu::core::command::serial::{FrameEvent, SerialReceiver};
///
/// let mut rx = SerialReceiver::new(56);
/// rx.select();
///
/// let word = 0x21u64;
/// let mut event = None;
/// for i in 0..56 {
///     event = rx.clock_bit((word >> i) & 1 != 0);
/// }
/// assert_eq!(event, Some(FrameEvent::Complete(0x21)));
/// assert_eq!(rx.deselect(), None);
/// ```
#[derive(Debug, Clone)]
pub struct SerialReceiver {
    state: SerialState,

    /// Shift register, filled LSB first
    shift: u64,

    /// Bits received in the current frame
    bit_count: u32,

    /// Bits per frame
    frame_bits: u32,

    /// Response byte being shifted out on MISO
    response: u8,

    /// Index of the next response bit
    response_bit: u32,

    /// Response waiting for the next transaction
    staged: Option<u8>,
}

impl SerialReceiver {
    /// Create a receiver for frames of `frame_bits` bits (at most 64)
    pub fn new(frame_bits: u32) -> Self {
        Self {
            state: SerialState::Idle,
            shift: 0,
            bit_count: 0,
            frame_bits: frame_bits.min(64),
            response: 0,
            response_bit: 0,
            staged: None,
        }
    }

    pub fn state(&self) -> SerialState {
        self.state
    }

    pub fn is_selected(&self) -> bool {
        self.state != SerialState::Idle
    }

    /// Number of bits received in the current frame
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Assert chip select (CS driven low)
    ///
    /// Starts a new frame and latches any staged response for MISO.
    pub fn select(&mut self) {
        if self.is_selected() {
            return;
        }

        self.state = SerialState::Selected;
        self.shift = 0;
        self.bit_count = 0;
        self.response = self.staged.take().unwrap_or(0);
        self.response_bit = 0;

        log::trace!("Serial port selected");
    }

    /// Release chip select (CS driven high)
    ///
    /// # Returns
    ///
    /// `Some(FrameEvent::Truncated)` if a partial frame was in the register
    pub fn deselect(&mut self) -> Option<FrameEvent> {
        if !self.is_selected() {
            return None;
        }

        let event = (self.state == SerialState::Shifting).then(|| {
            FrameEvent::Truncated(FrameError::Truncated {
                expected: self.frame_bits,
                received: self.bit_count,
            })
        });

        self.state = SerialState::Idle;
        self.shift = 0;
        self.bit_count = 0;
        self.response = 0;
        self.response_bit = 0;

        log::trace!("Serial port deselected");
        event
    }

    /// Drive the chip select line
    ///
    /// `active` is the logical select state, i.e. `true` while CS is low.
    pub fn set_chip_select(&mut self, active: bool) -> Option<FrameEvent> {
        if active {
            self.select();
            None
        } else {
            self.deselect()
        }
    }

    /// Clock one bit in from MOSI
    ///
    /// # Returns
    ///
    /// `Some(FrameEvent::Complete)` on the last bit of a frame, otherwise `None`
    pub fn clock_bit(&mut self, mosi: bool) -> Option<FrameEvent> {
        match self.state {
            SerialState::Idle | SerialState::Complete => {
                self.advance_response();
                None
            }
            SerialState::Selected | SerialState::Shifting => {
                self.shift |= (mosi as u64) << self.bit_count;
                self.bit_count += 1;
                self.advance_response();

                log::trace!("Serial bit {} = {}", self.bit_count - 1, mosi as u8);

                if self.bit_count >= self.frame_bits {
                    self.state = SerialState::Complete;
                    log::trace!("Serial frame complete: 0x{:014X}", self.shift);
                    Some(FrameEvent::Complete(self.shift))
                } else {
                    self.state = SerialState::Shifting;
                    None
                }
            }
        }
    }

    /// Current MISO level
    pub fn miso(&self) -> bool {
        self.is_selected() && self.response_bit < 8 && (self.response >> self.response_bit) & 1 != 0
    }

    /// Stage a response byte for the next transaction
    pub fn load_response(&mut self, byte: u8) {
        self.staged = Some(byte);
    }

    /// Return to the idle state, dropping any partial frame and staged response
    pub fn reset(&mut self) {
        *self = Self::new(self.frame_bits);
    }

    fn advance_response(&mut self) {
        if self.is_selected() && self.response_bit < 8 {
            self.response_bit += 1;
        }
    }
}
