use std::fmt::Display;

use enum_as_inner::EnumAsInner;

use super::{ConnectionConf, ConnectionInfo, NetworkError};

/// Reasons a socket is not connected
#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum Disconnected {
    /// at rest, nobody asked for a connection
    Stopped,
    /// the OS reports no network
    NetworkUnavailable,
    /// expected liveness signal did not arrive in time
    HeartbeatLost,
    /// user explicitly asked to disconnect
    ByRequest,
    /// recoverable transport or protocol error
    Temporary(NetworkError),
    /// unrecoverable error, no automatic reconnection
    Permanent(NetworkError),
}

impl Disconnected {
    /// Error that caused this disconnection, if any
    pub fn error(&self) -> Option<&NetworkError> {
        match self {
            Self::Temporary(err) | Self::Permanent(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Disconnected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => f.write_str("Disconnected.Stopped"),
            Self::NetworkUnavailable => f.write_str("Disconnected.Network"),
            Self::HeartbeatLost => f.write_str("Disconnected.HeartbeatLost"),
            Self::ByRequest => f.write_str("Disconnected.ByRequest"),
            Self::Temporary(err) => write!(f, "Disconnected.Temporary({})", err),
            Self::Permanent(err) => write!(f, "Disconnected.Permanent({})", err),
        }
    }
}

/// Connection state, exactly one is active at a time
#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum State {
    /// network or condition changed, must reconnect from scratch
    RestartConnection,
    /// a connection attempt is in flight
    Connecting {
        /// what the attempt connects to
        conf: ConnectionConf,
        /// attempt was started automatically
        is_reconnection: bool,
    },
    /// transport is live
    Connected(ConnectionInfo),
    /// transport is down
    Disconnected(Disconnected),
}

impl Default for State {
    fn default() -> Self {
        Self::Disconnected(Disconnected::Stopped)
    }
}

impl From<Disconnected> for State {
    fn from(d: Disconnected) -> Self {
        Self::Disconnected(d)
    }
}

impl State {
    /// Server issued connection id of a live connection
    pub fn connection_id(&self) -> Option<&str> {
        self.as_connected().map(|info| info.connection_id.as_str())
    }

    /// short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::RestartConnection => "RestartConnection",
            Self::Connecting { .. } => "Connecting",
            Self::Connected(_) => "Connected",
            Self::Disconnected(d) => match d {
                Disconnected::Stopped => "Disconnected.Stopped",
                Disconnected::NetworkUnavailable => "Disconnected.Network",
                Disconnected::HeartbeatLost => "Disconnected.HeartbeatLost",
                Disconnected::ByRequest => "Disconnected.ByRequest",
                Disconnected::Temporary(_) => "Disconnected.Temporary",
                Disconnected::Permanent(_) => "Disconnected.Permanent",
            },
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RestartConnection => f.write_str("RestartConnection"),
            Self::Connecting {
                conf,
                is_reconnection,
            } => write!(
                f,
                "Connecting(id: {}, reconnection: {})",
                conf.id(),
                is_reconnection
            ),
            Self::Connected(info) => write!(f, "Connected({})", info.connection_id),
            Self::Disconnected(d) => d.fmt(f),
        }
    }
}
