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

//! Command scripts
//!
//! A script is a JSON list of steps played against a [`Gpu`] as a host driver
//! would: commands go over the serial port, and the pixel clock runs between
//! them.
//!
//! ```json
//! [
//!   { "op": "send", "command": { "type": "enable_screen" } },
//!   { "op": "send", "command": { "type": "set_background", "color": 48 } },
//!   { "op": "wait_for_load_window" },
//!   { "op": "send", "command": {
//!       "type": "write_polygon", "slot": 0,
//!       "fields": { "color": 3, "vertices": [ {"x": 10, "y": 10}, {"x": 20, "y": 10}, {"x": 10, "y": 20} ],
//!                   "depth": 0, "z": [0, 0, 0] } } },
//!   { "op": "wait_frames", "frames": 1 }
//! ]
//! ```

use crate::core::command::Command;
use crate::core::error::Result;
use crate::core::pipeline::Gpu;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One script step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Send a command over the serial port, then tick once
    Send { command: Command },
    /// Run whole 800x525 frame periods
    WaitFrames { frames: u32 },
    /// Run until the load-enable window is open
    WaitForLoadWindow,
    /// Run a number of pixel ticks
    WaitTicks { ticks: u64 },
}

/// A sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load a script from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Play every step against a model
    pub fn run(&self, gpu: &mut Gpu) {
        for step in &self.steps {
            log::trace!("Script step: {:?}", step);
            match step {
                Step::Send { command } => {
                    gpu.send_command(command);
                    gpu.tick();
                }
                Step::WaitFrames { frames } => {
                    for _ in 0..*frames {
                        gpu.run_ticks(Gpu::TICKS_PER_FRAME as u64);
                    }
                }
                Step::WaitForLoadWindow => gpu.run_until_load_window(),
                Step::WaitTicks { ticks } => gpu.run_ticks(*ticks),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GpuConfig;
    use crate::core::error::GpuError;
    use crate::core::polygon::{Color, PolygonFields, SlotId, Vertex};

    const SCRIPT: &str = r#"[
        { "op": "send", "command": { "type": "enable_screen" } },
        { "op": "send", "command": { "type": "set_background", "color": 48 } },
        { "op": "wait_for_load_window" },
        { "op": "send", "command": {
            "type": "write_polygon", "slot": 0,
            "fields": {
                "color": 3,
                "vertices": [ {"x": 10, "y": 10}, {"x": 20, "y": 10}, {"x": 10, "y": 20} ],
                "depth": 0, "z": [0, 0, 0]
            } } },
        { "op": "wait_ticks", "ticks": 10 },
        { "op": "wait_frames", "frames": 1 }
    ]"#;

    #[test]
    fn test_parse_script() {
        let script = Script::from_json_str(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 6);
        assert_eq!(
            script.steps[0],
            Step::Send {
                command: Command::EnableScreen,
            }
        );
        assert_eq!(script.steps[2], Step::WaitForLoadWindow);

        let Step::Send {
            command: Command::WritePolygon { slot, fields },
        } = &script.steps[3]
        else {
            panic!("expected polygon write");
        };
        assert_eq!(*slot, SlotId::A);
        assert_eq!(fields.color, Color::BLUE);
        assert_eq!(fields.vertices[1], Vertex::new(20, 10));
    }

    #[test]
    fn test_run_script() {
        let script = Script::from_json_str(SCRIPT).unwrap();
        let mut gpu = Gpu::new(GpuConfig::two_slot()).unwrap();
        script.run(&mut gpu);

        assert!(gpu.screen_enabled());
        assert_eq!(gpu.background(), Color::RED);
        assert!(gpu.store().get(SlotId::A).unwrap().enabled);
        assert_eq!(gpu.resolve_pixel(120, 120), Color::BLUE);
        assert_eq!(gpu.resolve_pixel(0, 0), Color::RED);
        assert_eq!(gpu.stats().committed, 3);
    }

    #[test]
    fn test_round_trip_json() {
        let script = Script::new(vec![
            Step::WaitForLoadWindow,
            Step::Send {
                command: Command::WritePolygon {
                    slot: SlotId::B,
                    fields: PolygonFields::new(Color::GREEN, [Vertex::new(1, 2); 3], 7),
                },
            },
            Step::WaitFrames { frames: 2 },
        ]);

        let json = script.to_json_string().unwrap();
        assert_eq!(Script::from_json_str(&json).unwrap(), script);
    }

    #[test]
    fn test_bad_script() {
        let result = Script::from_json_str(r#"[{ "op": "explode" }]"#);
        assert!(matches!(result, Err(GpuError::Script(_))));
    }
}
