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

//! trigpu-sim entry point
//!
//! Runs a command script against the GPU model and writes the resulting frame
//! as a PPM image.
//!
//! ```text
//! trigpu-sim --config gpu.toml --script scene.json --output frame.ppm
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use trigpu::core::config::GpuConfig;
use trigpu::core::pipeline::Gpu;
use trigpu::core::script::Script;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    TwoSlot,
    TwoSlotRay,
    SixSlot,
}

/// Golden model simulator for the triangle GPU
#[derive(Parser, Debug)]
#[command(name = "trigpu-sim", version, about)]
struct Args {
    /// TOML configuration file (overrides --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in configuration
    #[arg(long, value_enum, default_value = "two-slot")]
    preset: Preset,

    /// JSON command script to play before capturing
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Number of frames to capture; the last one is written
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    /// Output PPM file
    #[arg(short, long, default_value = "frame.ppm")]
    output: PathBuf,

    /// Write a register snapshot after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            log::info!("Config: {}", path.display());
            GpuConfig::load(path)?
        }
        None => match args.preset {
            Preset::TwoSlot => GpuConfig::two_slot(),
            Preset::TwoSlotRay => GpuConfig::two_slot_ray(),
            Preset::SixSlot => GpuConfig::six_slot(),
        },
    };
    log::info!("GPU model: {}", config);

    let mut gpu = Gpu::new(config)?;

    if let Some(path) = &args.script {
        log::info!("Script: {}", path.display());
        let script = Script::load(path)?;
        script.run(&mut gpu);
    }

    gpu.run_until_frame_start();
    let mut frame = gpu.run_frame();
    for _ in 1..args.frames {
        frame = gpu.run_frame();
    }
    log::info!(
        "Rendered {} frame(s), {} scan periods since reset",
        args.frames.max(1),
        gpu.timing().frame_count()
    );

    frame.write_ppm(&args.output)?;
    log::info!("Wrote {}", args.output.display());

    if let Some(path) = &args.snapshot {
        gpu.save_snapshot(path)?;
        log::info!("Wrote snapshot {}", path.display());
    }

    let stats = gpu.stats();
    log::info!(
        "Commands: {} committed, {} dropped outside load window, {} invalid, {} truncated, {} overrun",
        stats.committed,
        stats.dropped_gate,
        stats.invalid,
        stats.truncated,
        stats.overrun
    );

    Ok(())
}
