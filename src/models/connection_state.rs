use std::fmt::Display;

/// Lifecycle of the feed connection as seen by the dashboard.
/// Transitions are driven by the transport only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The connection failed. Carries a human readable reason.
    Errored(String),
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting..."),
            Self::Connected => write!(f, "Connected"),
            Self::Errored(reason) => write!(f, "Error: {}", reason),
        }
    }
}
