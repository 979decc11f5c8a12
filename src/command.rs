//! Interactive shell commands.
//!
//! A line typed at the shell prompt is either a meta command, starting with `.`,
//! or SQL sent to the service as-is.
//!
//! # Overview
//!
//! - `.exit`: close the connection and leave the shell.
//! - `.format <table|csv|json>`: switch the output format.
//! - `.maxrows <n>`: rows requested per frame.
//! - `.commit` / `.rollback`: end the current transaction.
//! - anything else: SQL, with a trailing `;` stripped.
//!
//! # Example
//! ```rust
//! use cip::{Command, OutputFormat};
//!
//! let cmd: Command = ".format csv".try_into().unwrap();
//! assert_eq!(cmd, Command::Format(OutputFormat::Csv));
//! ```
use thiserror::Error;

use crate::format::OutputFormat;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid '{command}' command, {reason}")]
    InvalidCommandArguments { command: String, reason: String },

    #[error("no command provided")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Close the connection and terminate.
    Exit,
    /// SQL to run on the service.
    Query(String),
    Format(OutputFormat),
    MaxRows(u32),
    Commit,
    Rollback,
}

impl TryInto<Command> for &str {
    type Error = CommandError;

    fn try_into(self) -> Result<Command, Self::Error> {
        let line = self.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        if !line.starts_with('.') {
            let sql = line.trim_end_matches(';').trim_end();
            if sql.is_empty() {
                return Err(CommandError::Empty);
            }
            return Ok(Command::Query(sql.to_string()));
        }

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();
        match (name, argument) {
            (".exit" | ".quit", _) => Ok(Command::Exit),
            (".commit", _) => Ok(Command::Commit),
            (".rollback", _) => Ok(Command::Rollback),
            (".format", Some(format)) => format
                .parse()
                .map(Command::Format)
                .map_err(|reason| invalid(name, reason)),
            (".format", None) => Err(invalid(name, "requires a format. Example: .format csv")),
            (".maxrows", Some(n)) => match n.parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid(name, "argument should be a positive integer")),
                Ok(n) => Ok(Command::MaxRows(n)),
            },
            (".maxrows", None) => Err(invalid(name, "requires a row count. Example: .maxrows 500")),
            _ => Err(CommandError::UnrecognizedCommand(line.to_string())),
        }
    }
}

fn invalid(command: &str, reason: impl Into<String>) -> CommandError {
    CommandError::InvalidCommandArguments {
        command: command.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_string() {
        let inputs = vec![
            (".exit", Command::Exit),
            (".commit", Command::Commit),
            ("  .rollback ", Command::Rollback),
            (".format json", Command::Format(OutputFormat::Json)),
            (".maxrows 250", Command::MaxRows(250)),
            ("SELECT * FROM incident;", Command::Query("SELECT * FROM incident".into())),
            ("select 1", Command::Query("select 1".into())),
        ];

        for (cmd, expected) in inputs {
            let command: Command = cmd.try_into().unwrap();
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn invalid_arguments_are_reported() {
        for input in [".maxrows", ".maxrows 0", ".maxrows many", ".format", ".format xml"] {
            let err = <&str as TryInto<Command>>::try_into(input).unwrap_err();
            assert!(
                matches!(err, CommandError::InvalidCommandArguments { .. }),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn unknown_and_empty_input() {
        let err = <&str as TryInto<Command>>::try_into(".tables").unwrap_err();
        assert_eq!(err, CommandError::UnrecognizedCommand(".tables".into()));

        let err = <&str as TryInto<Command>>::try_into("   ").unwrap_err();
        assert_eq!(err, CommandError::Empty);
        let err = <&str as TryInto<Command>>::try_into(";").unwrap_err();
        assert_eq!(err, CommandError::Empty);
    }
}
