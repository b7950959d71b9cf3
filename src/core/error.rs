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

//! Error types for the GPU model
//!
//! Only the outer surfaces can fail: configuration files, snapshots, command
//! scripts and output files. Protocol anomalies on the serial wire (unknown
//! opcodes, truncated frames, writes outside the load window) are not errors;
//! they are reported as values and counted in the pipeline statistics.

use thiserror::Error;

/// Errors produced by the fallible outer operations of the model
#[derive(Debug, Error)]
pub enum GpuError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Configuration parsed but describes an unsupported combination
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot could not be encoded
    #[error("Failed to encode snapshot: {0}")]
    SnapshotEncode(#[from] bincode::error::EncodeError),

    /// Snapshot could not be decoded
    #[error("Failed to decode snapshot: {0}")]
    SnapshotDecode(#[from] bincode::error::DecodeError),

    /// Snapshot was taken from a differently configured model
    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    /// Command script could not be parsed
    #[error("Failed to parse script: {0}")]
    Script(#[from] serde_json::Error),
}

/// Result type for fallible model operations
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = GpuError::InvalidConfig("slots must be 2 or 6".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: slots must be 2 or 6"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        fn open_missing() -> Result<()> {
            std::fs::read("/nonexistent/trigpu/config.toml")?;
            Ok(())
        }

        let err = open_missing().unwrap_err();
        assert!(matches!(err, GpuError::Io(_)));
    }
}
