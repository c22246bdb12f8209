use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use super::reading::SensorId;

/// Sensors offered as shortcuts in the help text.
pub const KNOWN_SENSORS: [(&str, &str); 4] = [
    ("battery", "Battery"),
    ("cpu-0-0-usr", "CPU 1"),
    ("cpu-1-7-usr", "CPU 8"),
    ("gpuss-0-usr", "GPU"),
];

/// Something the user asked the dashboard to do, parsed from one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Tear down the current feed connection and open one to this host.
    /// The host is validated when the connection is requested.
    Connect(String),
    Select(SensorId),
    Deselect(SensorId),
    ClearSelection,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum UserCommandError {
    #[error("Empty command.")]
    Empty,

    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    Unknown(String),

    #[error("'{0}' needs an argument: {1}.")]
    MissingArgument(&'static str, &'static str),

    #[error("'{0}' takes a single argument.")]
    TooManyArguments(&'static str),
}

impl FromStr for UserCommand {
    type Err = UserCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or(UserCommandError::Empty)?;
        let argument = words.next();
        if words.next().is_some() {
            return match command {
                "connect" => Err(UserCommandError::TooManyArguments("connect")),
                "select" => Err(UserCommandError::TooManyArguments("select")),
                "deselect" => Err(UserCommandError::TooManyArguments("deselect")),
                other => Err(UserCommandError::Unknown(other.to_owned())),
            };
        }

        match (command, argument) {
            ("connect", Some(host)) => Ok(Self::Connect(host.to_owned())),
            ("connect", None) => Err(UserCommandError::MissingArgument("connect", "host")),
            ("select", Some(sensor)) => Ok(Self::Select(sensor.into())),
            ("select", None) => Err(UserCommandError::MissingArgument("select", "sensor")),
            ("deselect", Some(sensor)) => Ok(Self::Deselect(sensor.into())),
            ("deselect", None) => Err(UserCommandError::MissingArgument("deselect", "sensor")),
            ("clear", None) => Ok(Self::ClearSelection),
            ("help" | "?", None) => Ok(Self::Help),
            ("quit" | "exit" | "q", None) => Ok(Self::Quit),
            (other, _) => Err(UserCommandError::Unknown(other.to_owned())),
        }
    }
}

impl Display for UserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(host) => write!(f, "connect {}", host),
            Self::Select(sensor) => write!(f, "select {}", sensor),
            Self::Deselect(sensor) => write!(f, "deselect {}", sensor),
            Self::ClearSelection => write!(f, "clear"),
            Self::Help => write!(f, "help"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

/// Text shown for the `help` command.
pub fn help_text() -> String {
    let mut text = String::from(
        "Commands:\n  \
         connect <host[:port]>  switch the feed to another host\n  \
         select <sensor>        only show selected sensors\n  \
         deselect <sensor>      remove a sensor from the selection\n  \
         clear                  show all sensors again\n  \
         quit                   exit\n\
         Sensors:",
    );
    for (id, name) in KNOWN_SENSORS {
        text.push_str(&format!("\n  {:<22} {}", id, name));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "connect 192.168.1.20".parse::<UserCommand>(),
            Ok(UserCommand::Connect("192.168.1.20".into()))
        );
        assert_eq!(
            "  select   battery ".parse::<UserCommand>(),
            Ok(UserCommand::Select("battery".into()))
        );
        assert_eq!(
            "deselect cpu-1-7-usr".parse::<UserCommand>(),
            Ok(UserCommand::Deselect("cpu-1-7-usr".into()))
        );
        assert_eq!("clear".parse::<UserCommand>(), Ok(UserCommand::ClearSelection));
        assert_eq!("q".parse::<UserCommand>(), Ok(UserCommand::Quit));
        assert_eq!("help".parse::<UserCommand>(), Ok(UserCommand::Help));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<UserCommand>(), Err(UserCommandError::Empty));
        assert_eq!(
            "connect".parse::<UserCommand>(),
            Err(UserCommandError::MissingArgument("connect", "host"))
        );
        assert_eq!(
            "select battery gpuss-0-usr".parse::<UserCommand>(),
            Err(UserCommandError::TooManyArguments("select"))
        );
        assert_eq!(
            "reboot".parse::<UserCommand>(),
            Err(UserCommandError::Unknown("reboot".into()))
        );
        assert_eq!(
            "clear battery".parse::<UserCommand>(),
            Err(UserCommandError::Unknown("clear".into()))
        );
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let command = UserCommand::Select("gpuss-0-usr".into());
        assert_eq!(command.to_string().parse::<UserCommand>(), Ok(command));
    }

    #[test]
    fn test_help_lists_known_sensors() {
        let text = help_text();
        for (id, _) in KNOWN_SENSORS {
            assert!(text.contains(id));
        }
    }
}
