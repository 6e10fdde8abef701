use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitrine_schema::CellId;

/// High-level representation of a command envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub payload: CommandPayload,
    pub correlation_id: Option<u64>,
}

impl CommandEnvelope {
    pub fn new(payload: CommandPayload) -> Self {
        Self {
            payload,
            correlation_id: None,
        }
    }

    pub fn with_correlation(payload: CommandPayload, correlation_id: u64) -> Self {
        Self {
            payload,
            correlation_id: Some(correlation_id),
        }
    }
}

/// Supported command payloads.
///
/// Every payload is best-effort: the engine applies what it can and logs the
/// rest; nothing here can fail a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    /// Page/tab visibility changed. Hidden grids stop scheduling transitions.
    SetVisibility { visible: bool },
    /// Viewer requested reduced motion; freezes all cell scheduling.
    SetReducedMotion { enabled: bool },
    /// Viewport crossed the morph-width threshold.
    SetViewport { wide: bool },
    /// Unmount a single cell; releases its occupancy slot.
    RemoveCell { cell: CellId },
    /// Re-seed all selection randomness; current display is kept.
    Reseed { seed: u64 },
}

/// Error returned when encoding a command envelope fails.
#[derive(Debug, Error)]
pub enum CommandEncodeError {
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// Error returned when decoding a command envelope fails.
#[derive(Debug, Error)]
pub enum CommandDecodeError {
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::Error),
    #[error("command envelope is empty")]
    Empty,
}

pub fn encode_command(envelope: &CommandEnvelope) -> Result<Vec<u8>, CommandEncodeError> {
    Ok(bincode::serialize(envelope)?)
}

pub fn decode_command(data: &[u8]) -> Result<CommandEnvelope, CommandDecodeError> {
    if data.is_empty() {
        return Err(CommandDecodeError::Empty);
    }
    Ok(bincode::deserialize(data)?)
}
