//! Shared runtime surface for Vitrine hosts.
//!
//! Re-exports the data contracts from `vitrine_schema` and carries the
//! host-to-engine command envelope plus the text front-end interactive hosts
//! use to produce it, without depending on the Bevy runtime in
//! `core_vitrine`.

pub use vitrine_schema::*;

mod command_text;
mod commands;

pub use command_text::{parse_command_line, CommandParseError};
pub use commands::{
    decode_command, encode_command, CommandDecodeError, CommandEncodeError, CommandEnvelope,
    CommandPayload,
};
