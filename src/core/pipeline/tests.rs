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

use super::*;
use crate::core::config::DEFAULT_DEVICE_ID;
use crate::core::polygon::{PolygonFields, SlotId, Vertex};
use tempfile::tempdir;

fn two_slot() -> Gpu {
    Gpu::new(GpuConfig::two_slot()).unwrap()
}

fn triangle(color: Color, depth: u8) -> PolygonFields {
    // (100,100) (200,100) (100,200) at scale 10
    PolygonFields::new(
        color,
        [Vertex::new(10, 10), Vertex::new(20, 10), Vertex::new(10, 20)],
        depth,
    )
}

/// Send a command over the wire inside the load window and let it apply
fn send_in_window(gpu: &mut Gpu, command: Command) {
    gpu.run_until_load_window();
    gpu.send_command(&command);
}

/// Clock a whole frame in without running the pixel clock
fn clock_frame(gpu: &mut Gpu, command: &Command) {
    let bits = gpu.codec().encode_bits(command);
    gpu.set_chip_select(true);
    for bit in bits {
        gpu.clock_serial_bit(bit);
    }
    gpu.set_chip_select(false);
}

// ========== Reset ==========

#[test]
fn test_reset_state() {
    let mut gpu = two_slot();
    assert!(!gpu.screen_enabled());
    assert_eq!(gpu.background(), Color::BLACK);
    assert_eq!(gpu.store().iter_enabled().count(), 0);
    assert_eq!(gpu.position(), ScreenPosition::new(0, 0));

    let output = gpu.tick();
    assert_eq!(output.rgb, Rgb::BLACK);
    assert!(output.h_sync());
    assert!(output.v_sync());
    assert!(!output.frame_interrupt());
}

#[test]
fn test_reset_clears_everything() {
    let mut gpu = two_slot();
    let write = Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 1),
    };
    send_in_window(&mut gpu, write);
    gpu.execute(Command::EnableScreen);
    gpu.execute(Command::SetBackground { color: Color::BLUE });

    gpu.reset();

    assert!(!gpu.screen_enabled());
    assert_eq!(gpu.background(), Color::BLACK);
    assert!(!gpu.store().get(SlotId::A).unwrap().enabled);
    assert_eq!(gpu.position(), ScreenPosition::default());
    assert_eq!(gpu.stats(), PipelineStats::default());
}

#[test]
fn test_invalid_config_rejected() {
    let config = GpuConfig {
        policy: crate::core::config::CompositePolicy::NumericDepth,
        ..GpuConfig::six_slot()
    };
    assert!(matches!(Gpu::new(config), Err(GpuError::InvalidConfig(_))));
}

// ========== Frame Output ==========

#[test]
fn test_background_only_frame() {
    let mut gpu = two_slot();
    gpu.send_command(&Command::EnableScreen);
    gpu.send_command(&Command::SetBackground { color: Color::RED });

    gpu.run_until_frame_start();
    let frame = gpu.run_frame();
    assert!(frame.is_uniform(Rgb { r: 192, g: 0, b: 0 }));
}

#[test]
fn test_screen_disabled_outputs_black() {
    let mut gpu = two_slot();
    gpu.execute(Command::SetBackground {
        color: Color::GREEN,
    });

    let frame = gpu.run_frame();
    assert!(frame.is_uniform(Rgb::BLACK));

    gpu.execute(Command::EnableScreen);
    let frame = gpu.run_frame();
    assert!(frame.is_uniform(Color::GREEN.upscale()));

    gpu.execute(Command::DisableScreen);
    let frame = gpu.run_frame();
    assert!(frame.is_uniform(Rgb::BLACK));
}

#[test]
fn test_blanking_outputs_black() {
    let mut gpu = two_slot();
    gpu.execute(Command::EnableScreen);
    gpu.execute(Command::SetBackground {
        color: Color::WHITE,
    });

    for _ in 0..Gpu::TICKS_PER_FRAME {
        let output = gpu.tick();
        if output.position.is_visible() {
            assert_eq!(output.rgb, Color::WHITE.upscale());
        } else {
            assert_eq!(output.rgb, Rgb::BLACK, "at {:?}", output.position);
        }
    }
}

#[test]
fn test_two_polygons_numeric_depth() {
    let mut gpu = two_slot();
    gpu.execute(Command::EnableScreen);
    gpu.run_until_load_window();
    gpu.execute(Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    });
    gpu.execute(Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::BLUE, 4),
    });
    gpu.run_until_frame_start();

    let frame = gpu.run_frame();
    assert_eq!(frame.pixel(120, 120), Color::RED.upscale());
    assert_eq!(frame.pixel(10, 10), Rgb::BLACK);

    // Swap depths
    gpu.run_until_load_window();
    gpu.execute(Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 4),
    });
    gpu.execute(Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::BLUE, 0),
    });
    assert_eq!(gpu.resolve_pixel(120, 120), Color::BLUE);
}

#[test]
fn test_fixed_priority_variant() {
    let mut gpu = Gpu::new(GpuConfig::six_slot()).unwrap();
    gpu.run_until_load_window();
    for (slot, color) in [(SlotId::D, Color::GREEN), (SlotId::A, Color::RED)] {
        gpu.send_command(&Command::WritePolygon {
            slot,
            fields: triangle(color, 0),
        });
    }
    assert_eq!(gpu.stats().committed, 2);

    // Scale 8: (80,80) (160,80) (80,160)
    assert_eq!(gpu.resolve_pixel(100, 100), Color::RED);

    gpu.send_command(&Command::ClearPolygon { slot: SlotId::A });
    assert_eq!(gpu.resolve_pixel(100, 100), Color::GREEN);
}

#[test]
fn test_ray_variant_frame() {
    let mut gpu = Gpu::new(GpuConfig::two_slot_ray()).unwrap();
    gpu.execute(Command::EnableScreen);
    gpu.run_until_load_window();

    let corners = [Vertex::new(60, 20), Vertex::new(44, 41), Vertex::new(0, 0)];
    gpu.execute(Command::WritePolygon {
        slot: SlotId::A,
        fields: PolygonFields::new(Color::RED, corners, 2),
    });
    gpu.execute(Command::WritePolygon {
        slot: SlotId::B,
        fields: PolygonFields::new(Color::BLUE, corners, 5),
    });
    gpu.run_until_frame_start();

    let frame = gpu.run_frame();
    assert_eq!(frame.pixel(440, 410), Color::RED.upscale());
    assert_eq!(frame.pixel(600, 200), Color::RED.upscale());
    assert_eq!(frame.pixel(639, 0), Rgb::BLACK);
}

// ========== Gate Discipline ==========

#[test]
fn test_write_outside_window_dropped() {
    let mut gpu = two_slot();
    gpu.execute(Command::EnableScreen);
    assert!(!gpu.load_enable());
    assert!(!gpu.write_gate());

    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    });

    assert!(!gpu.store().get(SlotId::A).unwrap().enabled);
    assert_eq!(gpu.stats().dropped_gate, 1);
    assert_eq!(gpu.stats().committed, 1);
}

#[test]
fn test_clear_outside_window_dropped() {
    let mut gpu = two_slot();
    let write = Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::GREEN, 3),
    };
    send_in_window(&mut gpu, write);
    gpu.execute(Command::EnableScreen);
    gpu.run_until_frame_start();

    gpu.send_command(&Command::ClearPolygon { slot: SlotId::B });

    assert!(gpu.store().get(SlotId::B).unwrap().enabled);
    assert_eq!(gpu.stats().dropped_gate, 1);
}

#[test]
fn test_screen_disabled_opens_gate() {
    let mut gpu = two_slot();
    let write = Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    };

    // Straight after reset the scan is at (0, 0) with the screen off
    assert!(!gpu.load_enable());
    assert!(gpu.write_gate());
    assert_eq!(gpu.execute(write), CommandOutcome::Applied);
    assert!(gpu.store().get(SlotId::A).unwrap().enabled);

    // Once the screen is on, the same write mid-scan is dropped
    gpu.execute(Command::EnableScreen);
    assert!(!gpu.write_gate());
    assert_eq!(
        gpu.execute(Command::ClearPolygon { slot: SlotId::A }),
        CommandOutcome::DroppedGateClosed
    );
    assert_eq!(gpu.execute(write), CommandOutcome::DroppedGateClosed);
    assert!(gpu.store().get(SlotId::A).unwrap().enabled);

    // Disabling again reopens it
    gpu.execute(Command::DisableScreen);
    assert_eq!(
        gpu.execute(Command::ClearPolygon { slot: SlotId::A }),
        CommandOutcome::Applied
    );
    assert!(!gpu.store().get(SlotId::A).unwrap().enabled);
}

#[test]
fn test_screen_disabled_write_over_wire() {
    let mut gpu = two_slot();
    gpu.run_ticks(800 * 100);

    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::BLUE, 2),
    });
    gpu.send_command(&Command::EnableScreen);

    assert!(gpu.store().get(SlotId::B).unwrap().enabled);
    assert_eq!(gpu.stats().dropped_gate, 0);

    gpu.run_until_frame_start();
    let frame = gpu.run_frame();
    assert_eq!(frame.pixel(120, 120), Color::BLUE.upscale());
}

#[test]
fn test_ungated_commands_apply_mid_scan() {
    let mut gpu = two_slot();
    gpu.run_ticks(1000);
    assert!(!gpu.load_enable());

    gpu.send_command(&Command::SetBackground { color: Color::BLUE });
    gpu.send_command(&Command::EnableScreen);

    assert_eq!(gpu.background(), Color::BLUE);
    assert!(gpu.screen_enabled());
}

#[test]
fn test_commit_visible_next_frame_only() {
    let mut gpu = two_slot();
    gpu.execute(Command::EnableScreen);

    // Mid-scan write is lost, so the frame stays background
    gpu.run_ticks(800 * 100);
    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    });
    gpu.run_until_frame_start();
    let frame = gpu.run_frame();
    assert_eq!(frame.pixel(120, 120), Rgb::BLACK);

    // Committed in blanking, visible from the next frame
    let write = Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    };
    send_in_window(&mut gpu, write);
    gpu.run_until_frame_start();
    let frame = gpu.run_frame();
    assert_eq!(frame.pixel(120, 120), Color::RED.upscale());
}

// ========== Serial Protocol ==========

#[test]
fn test_command_applies_on_next_tick() {
    let mut gpu = two_slot();
    gpu.run_until_load_window();

    let command = Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    };
    clock_frame(&mut gpu, &command);
    assert_eq!(gpu.pending(), Some(&command));
    assert!(!gpu.store().get(SlotId::A).unwrap().enabled);

    gpu.tick();
    assert!(gpu.pending().is_none());
    assert!(gpu.store().get(SlotId::A).unwrap().enabled);
}

#[test]
fn test_pending_overrun() {
    let mut gpu = two_slot();
    let red = Command::SetBackground { color: Color::RED };
    let green = Command::SetBackground {
        color: Color::GREEN,
    };
    clock_frame(&mut gpu, &red);
    clock_frame(&mut gpu, &green);
    gpu.tick();

    assert_eq!(gpu.background(), Color::GREEN);
    assert_eq!(gpu.stats().overrun, 1);
    assert_eq!(gpu.stats().committed, 1);
}

#[test]
fn test_back_to_back_sends_all_commit() {
    let mut gpu = two_slot();
    gpu.execute(Command::EnableScreen);
    gpu.run_until_load_window();

    let start = gpu.position();
    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 1),
    });
    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::BLUE, 2),
    });

    assert!(gpu.store().get(SlotId::A).unwrap().enabled);
    assert!(gpu.store().get(SlotId::B).unwrap().enabled);
    assert!(gpu.pending().is_none());
    assert_eq!(gpu.stats().overrun, 0);
    assert_eq!(gpu.stats().committed, 3);

    // One pixel tick per bit
    assert_eq!(gpu.position().col, start.col + 2 * 56);
}

#[test]
fn test_send_without_pixel_ticks() {
    let config = GpuConfig {
        ticks_per_serial_bit: 0,
        ..GpuConfig::two_slot()
    };
    let mut gpu = Gpu::new(config).unwrap();

    gpu.send_command(&Command::SetBackground { color: Color::RED });
    assert_eq!(gpu.position(), ScreenPosition::default());
    assert_eq!(gpu.pending(), Some(&Command::SetBackground { color: Color::RED }));

    gpu.tick();
    assert_eq!(gpu.background(), Color::RED);
}

#[test]
fn test_truncated_frame_discarded() {
    let mut gpu = two_slot();
    gpu.run_until_load_window();

    let bytes = gpu.codec().encode_bytes(&Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 0),
    });
    gpu.send_frame(&bytes[..4]);

    assert!(gpu.pending().is_none());
    assert!(!gpu.store().get(SlotId::A).unwrap().enabled);
    assert_eq!(gpu.stats().truncated, 1);
}

#[test]
fn test_invalid_opcode_no_effect() {
    let mut gpu = two_slot();
    gpu.run_until_load_window();
    let before = gpu.state().clone();

    for opcode in [0x02u8, 0x7F, 0x82, 0x42, 0xFF] {
        gpu.send_frame(&[opcode, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    assert_eq!(gpu.state(), &before);
    assert_eq!(gpu.stats().invalid, 5);
}

#[test]
fn test_device_id_response() {
    let mut gpu = two_slot();

    // Nothing staged yet
    assert_eq!(gpu.send_command(&Command::DeviceId), 0);

    // Shifted out during the following transaction
    let response = gpu.send_command(&Command::EnableScreen);
    assert_eq!(response, DEFAULT_DEVICE_ID);

    // Consumed
    assert_eq!(gpu.send_command(&Command::DisableScreen), 0);
}

#[test]
fn test_custom_device_id() {
    let config = GpuConfig {
        device_id: 0xC3,
        ..GpuConfig::two_slot()
    };
    let mut gpu = Gpu::new(config).unwrap();
    assert_eq!(gpu.execute(Command::DeviceId), CommandOutcome::DeviceId(0xC3));
    assert_eq!(gpu.send_frame(&[0x21, 0, 0, 0, 0, 0, 0]), 0xC3);
}

#[test]
fn test_bit_level_transaction() {
    let mut gpu = two_slot();
    gpu.run_until_load_window();

    let command = Command::WritePolygon {
        slot: SlotId::B,
        fields: triangle(Color::BLUE, 6),
    };
    let bits = gpu.codec().encode_bits(&command);

    gpu.set_chip_select(true);
    for (i, bit) in bits.iter().enumerate() {
        gpu.clock_serial_bit(*bit);
        // Pixel clock keeps running between serial bits
        if i % 8 == 7 {
            gpu.tick();
        }
    }
    gpu.set_chip_select(false);
    gpu.tick();

    let slot = gpu.store().get(SlotId::B).unwrap();
    assert!(slot.enabled);
    assert_eq!(slot.fields.depth, 6);
    assert_eq!(slot.fields.color, Color::BLUE);
}

#[test]
fn test_no_depth_layout_over_wire() {
    let mut gpu = Gpu::new(GpuConfig::six_slot()).unwrap();
    gpu.run_until_load_window();

    gpu.send_command(&Command::WritePolygon {
        slot: SlotId::F,
        fields: triangle(Color::GREEN, 5),
    });

    let slot = gpu.store().get(SlotId::F).unwrap();
    assert!(slot.enabled);
    assert_eq!(slot.fields.depth, 0);
    assert_eq!(gpu.stats().truncated, 0);
}

// ========== Display Signals ==========

#[test]
fn test_frame_interrupt_during_vblank() {
    let mut gpu = two_slot();
    let mut interrupt_ticks = 0u32;
    let mut h_sync_low = 0u32;

    for _ in 0..Gpu::TICKS_PER_FRAME {
        let output = gpu.tick();
        if output.frame_interrupt() {
            assert!(output.position.row >= 480);
            interrupt_ticks += 1;
        }
        if !output.h_sync() {
            h_sync_low += 1;
        }
    }

    assert_eq!(interrupt_ticks, 800 * 45);
    assert_eq!(h_sync_low, 96 * 525);
}

// ========== Snapshots ==========

#[test]
fn test_snapshot_round_trip() {
    let mut gpu = two_slot();
    let write = Command::WritePolygon {
        slot: SlotId::A,
        fields: triangle(Color::RED, 2),
    };
    send_in_window(&mut gpu, write);
    gpu.execute(Command::SetBackground {
        color: Color::GREEN,
    });
    gpu.execute(Command::EnableScreen);
    let data = gpu.snapshot().unwrap();
    let position = gpu.position();

    let mut restored = two_slot();
    restored.restore(&data).unwrap();

    assert_eq!(restored.state(), gpu.state());
    assert_eq!(restored.position(), position);
    assert_eq!(restored.resolve_pixel(120, 120), Color::RED);
}

#[test]
fn test_snapshot_config_mismatch() {
    let gpu = two_slot();
    let data = gpu.snapshot().unwrap();

    let mut other = Gpu::new(GpuConfig::six_slot()).unwrap();
    assert!(matches!(other.restore(&data), Err(GpuError::SnapshotMismatch(_))));
}

#[test]
fn test_snapshot_garbage() {
    let mut gpu = two_slot();
    assert!(matches!(
        gpu.restore(&[0xFF, 0xFF, 0xFF]),
        Err(GpuError::SnapshotDecode(_))
    ));
}

#[test]
fn test_snapshot_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gpu.snap");

    let mut gpu = two_slot();
    gpu.execute(Command::SetBackground { color: Color::BLUE });
    gpu.save_snapshot(&path).unwrap();

    let mut restored = two_slot();
    restored.load_snapshot(&path).unwrap();
    assert_eq!(restored.background(), Color::BLUE);
}
