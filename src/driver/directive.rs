use crate::socket::{ConnectionConf, Disconnected, State};

/// Side effect the driver performs when a state is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// open the transport
    Open {
        /// what to connect to
        conf: ConnectionConf,
        /// attempt started automatically
        is_reconnection: bool,
    },
    /// connection is live, arm the heartbeat watchdog
    Arm,
    /// submit a reconnection with the last known config
    Reconnect,
    /// close the dead transport then reconnect
    CloseAndReconnect,
    /// reconnect after a backoff delay
    ScheduleReconnect,
    /// close the transport and stay down
    Close,
}

impl Directive {
    /// short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "Open",
            Self::Arm => "Arm",
            Self::Reconnect => "Reconnect",
            Self::CloseAndReconnect => "CloseAndReconnect",
            Self::ScheduleReconnect => "ScheduleReconnect",
            Self::Close => "Close",
        }
    }
}

/// Decide the side effect of a committed state
pub fn plan(state: &State) -> Directive {
    match state {
        State::RestartConnection => Directive::Reconnect,
        State::Connecting {
            conf,
            is_reconnection,
        } => Directive::Open {
            conf: conf.clone(),
            is_reconnection: *is_reconnection,
        },
        State::Connected(_) => Directive::Arm,
        State::Disconnected(d) => match d {
            Disconnected::HeartbeatLost => Directive::CloseAndReconnect,
            Disconnected::Temporary(_) => Directive::ScheduleReconnect,
            Disconnected::Stopped
            | Disconnected::NetworkUnavailable
            | Disconnected::ByRequest
            | Disconnected::Permanent(_) => Directive::Close,
        },
    }
}
