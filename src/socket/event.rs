use super::{ConnectionConf, ConnectionInfo, NetworkError};

/// Input of the state machine, produced by users, the transport, the network
/// monitor or the heartbeat watchdog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// start a new connection
    Connect {
        /// what to connect to
        conf: ConnectionConf,
        /// started automatically instead of by the user
        is_reconnection: bool,
    },
    /// the transport finished the handshake
    ConnectionEstablished(ConnectionInfo),
    /// no liveness signal in time
    HeartbeatLost,
    /// the OS lost network
    NetworkUnavailable,
    /// the OS got network back
    NetworkAvailable,
    /// connection failed and must not be retried
    UnrecoverableError(NetworkError),
    /// connection failed and may be retried
    RecoverableError(NetworkError),
    /// user wants the connection closed
    DisconnectRequested,
    /// stop the connection, e.g. the app went to background
    Stop,
    /// resume a stopped connection
    Resume,
}

impl Event {
    /// short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "Connect",
            Self::ConnectionEstablished(_) => "ConnectionEstablished",
            Self::HeartbeatLost => "HeartbeatLost",
            Self::NetworkUnavailable => "NetworkUnavailable",
            Self::NetworkAvailable => "NetworkAvailable",
            Self::UnrecoverableError(_) => "UnrecoverableError",
            Self::RecoverableError(_) => "RecoverableError",
            Self::DisconnectRequested => "DisconnectRequested",
            Self::Stop => "Stop",
            Self::Resume => "Resume",
        }
    }
}
