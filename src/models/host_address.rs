use std::fmt::Display;

use thiserror::Error;

/// Port the sensor feed server listens on unless told otherwise.
pub const DEFAULT_FEED_PORT: u16 = 8080;

/// Where the sensor feed lives. Renders as `ws://<host>:<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    host: String,
    port: u16,
}

#[derive(Error, Debug, PartialEq)]
pub enum HostAddressError {
    #[error("Host can't be empty.")]
    Empty,

    #[error("Host '{0}' contains whitespace.")]
    Whitespace(String),

    #[error("Invalid port in '{0}'.")]
    InvalidPort(String),

    #[error("IPv6 host '{0}' must be written in brackets, e.g. '[::1]'.")]
    UnbracketedIpv6(String),
}

impl HostAddress {
    pub fn new(host: &str, port: u16) -> Result<Self, HostAddressError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(HostAddressError::Empty);
        }
        if host.chars().any(char::is_whitespace) {
            return Err(HostAddressError::Whitespace(host.to_owned()));
        }
        let bracketed = host.starts_with('[') && host.ends_with(']');
        if host.contains(':') && !bracketed {
            return Err(HostAddressError::UnbracketedIpv6(host.to_owned()));
        }
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    /// Parse user input of the form `host` or `host:port`, falling back to
    /// `default_port`. A leading `ws://` is tolerated. IPv6 hosts go in
    /// brackets: `[::1]` or `[::1]:8080`.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, HostAddressError> {
        let input = input.trim();
        let input = input.strip_prefix("ws://").unwrap_or(input);
        // Only the last colon can start a port, and only after a plain host
        // or a closing bracket.
        let split = input
            .rsplit_once(':')
            .filter(|(host, _)| !host.contains(':') || host.ends_with(']'));
        match split {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| HostAddressError::InvalidPort(input.to_owned()))?;
                Self::new(host, port)
            }
            None => Self::new(input, default_port),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws://{}:{}", self.host, self.port)
    }
}
