use std::num::ParseIntError;

use thiserror::Error;

use crate::CommandPayload;
use vitrine_schema::CellId;

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid toggle '{0}', expected on|off")]
    InvalidToggle(String),
    #[error("invalid viewport '{0}', expected wide|narrow")]
    InvalidViewport(String),
}

/// Parse one line of host console input into a command payload.
///
/// Verbs: `show`, `hide`, `motion on|off`, `viewport wide|narrow`,
/// `remove <cell>`, `reseed <seed>`.
pub fn parse_command_line(input: &str) -> Result<CommandPayload, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    match verb.as_str() {
        "show" => Ok(CommandPayload::SetVisibility { visible: true }),
        "hide" => Ok(CommandPayload::SetVisibility { visible: false }),
        "motion" => {
            let toggle = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("on|off"))?;
            let enabled = parse_toggle(toggle)?;
            // "motion off" requests reduced motion.
            Ok(CommandPayload::SetReducedMotion { enabled: !enabled })
        }
        "viewport" => {
            let mode = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("wide|narrow"))?;
            match mode.to_ascii_lowercase().as_str() {
                "wide" => Ok(CommandPayload::SetViewport { wide: true }),
                "narrow" => Ok(CommandPayload::SetViewport { wide: false }),
                other => Err(CommandParseError::InvalidViewport(other.to_string())),
            }
        }
        "remove" => {
            let cell_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("cell"))?;
            let cell = parse_u32(cell_str, "cell id")?;
            Ok(CommandPayload::RemoveCell {
                cell: CellId(cell),
            })
        }
        "reseed" => {
            let seed_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("seed"))?;
            let seed = parse_u64(seed_str, "seed")?;
            Ok(CommandPayload::Reseed { seed })
        }
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_toggle(value: &str) -> Result<bool, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(CommandParseError::InvalidToggle(other.to_string())),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

fn parse_u64(value: &str, context: &'static str) -> Result<u64, CommandParseError> {
    value
        .parse()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_visibility_verbs() {
        assert_eq!(
            parse_command_line("show").unwrap(),
            CommandPayload::SetVisibility { visible: true }
        );
        assert_eq!(
            parse_command_line("  hide  ").unwrap(),
            CommandPayload::SetVisibility { visible: false }
        );
    }

    #[test]
    fn motion_off_requests_reduced_motion() {
        assert_eq!(
            parse_command_line("motion off").unwrap(),
            CommandPayload::SetReducedMotion { enabled: true }
        );
        assert_eq!(
            parse_command_line("MOTION ON").unwrap(),
            CommandPayload::SetReducedMotion { enabled: false }
        );
    }

    #[test]
    fn parses_viewport_and_remove() {
        assert_eq!(
            parse_command_line("viewport narrow").unwrap(),
            CommandPayload::SetViewport { wide: false }
        );
        assert_eq!(
            parse_command_line("remove 11").unwrap(),
            CommandPayload::RemoveCell { cell: CellId(11) }
        );
    }

    #[test]
    fn parses_reseed() {
        assert_eq!(
            parse_command_line("reseed 12345").unwrap(),
            CommandPayload::Reseed { seed: 12345 }
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            parse_command_line(""),
            Err(CommandParseError::Empty)
        ));
        assert!(matches!(
            parse_command_line("explode"),
            Err(CommandParseError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_command_line("motion sideways"),
            Err(CommandParseError::InvalidToggle(_))
        ));
        assert!(matches!(
            parse_command_line("remove eleven"),
            Err(CommandParseError::InvalidInteger { context: "cell id", .. })
        ));
        assert!(matches!(
            parse_command_line("remove"),
            Err(CommandParseError::MissingArgument("cell"))
        ));
    }
}
