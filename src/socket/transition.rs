//! The transition table of the connection state machine.
//!
//! Pure code: no logging, no I/O. Callers decide what to do with
//! [Transition::Unhandled] outcomes.

use super::{Disconnected, Event, State};

/// Outcome of applying one event to one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// a rule matched, this is the next state (may equal the current one)
    Moved(State),
    /// a rule matched and explicitly keeps the current state
    Ignored,
    /// no rule for this event in the current state, state is kept
    Unhandled,
}

impl Transition {
    /// Resolve into the next state
    pub fn into_state(self, current: &State) -> State {
        match self {
            Self::Moved(next) => next,
            Self::Ignored | Self::Unhandled => current.clone(),
        }
    }
}

fn moved<S: Into<State>>(state: S) -> Transition {
    Transition::Moved(state.into())
}

fn connecting(conf: super::ConnectionConf, is_reconnection: bool) -> Transition {
    moved(State::Connecting {
        conf,
        is_reconnection,
    })
}

// errors, disconnect and stop, shared by every state with a connection in play
fn on_teardown(event: Event) -> Transition {
    match event {
        Event::UnrecoverableError(err) => moved(Disconnected::Permanent(err)),
        Event::RecoverableError(err) => moved(Disconnected::Temporary(err)),
        Event::DisconnectRequested => moved(Disconnected::ByRequest),
        Event::Stop => moved(Disconnected::Stopped),
        _ => Transition::Unhandled,
    }
}

// only a user initiated connect may leave a by-request or permanent disconnection
fn on_user_connect(event: Event) -> Transition {
    match event {
        Event::Connect {
            is_reconnection: true,
            ..
        } => Transition::Ignored,
        Event::Connect {
            conf,
            is_reconnection: false,
        } => connecting(conf, false),
        _ => Transition::Unhandled,
    }
}

/// Compute the outcome of `event` in `state`
pub fn transition(state: &State, event: Event) -> Transition {
    match state {
        State::RestartConnection
        | State::Connecting { .. }
        | State::Disconnected(Disconnected::HeartbeatLost)
        | State::Disconnected(Disconnected::Temporary(_)) => match event {
            Event::Connect {
                conf,
                is_reconnection,
            } => connecting(conf, is_reconnection),
            Event::ConnectionEstablished(info) => moved(State::Connected(info)),
            Event::HeartbeatLost => moved(Disconnected::HeartbeatLost),
            Event::NetworkUnavailable => moved(Disconnected::NetworkUnavailable),
            event => on_teardown(event),
        },

        State::Connected(_) => match event {
            Event::ConnectionEstablished(info) => moved(State::Connected(info)),
            Event::HeartbeatLost => moved(Disconnected::HeartbeatLost),
            Event::NetworkUnavailable => moved(Disconnected::NetworkUnavailable),
            event => on_teardown(event),
        },

        State::Disconnected(Disconnected::NetworkUnavailable) => match event {
            Event::Connect {
                conf,
                is_reconnection,
            } => connecting(conf, is_reconnection),
            Event::ConnectionEstablished(info) => moved(State::Connected(info)),
            Event::NetworkAvailable => moved(State::RestartConnection),
            event => on_teardown(event),
        },

        State::Disconnected(Disconnected::Stopped) => match event {
            Event::Connect {
                conf,
                is_reconnection,
            } => connecting(conf, is_reconnection),
            Event::Resume => moved(State::RestartConnection),
            _ => Transition::Unhandled,
        },

        State::Disconnected(Disconnected::ByRequest) => on_user_connect(event),

        State::Disconnected(Disconnected::Permanent(_)) => match event {
            Event::DisconnectRequested => moved(Disconnected::ByRequest),
            event => on_user_connect(event),
        },
    }
}

/// Compute the next state of `event` in `state`
pub fn apply(state: &State, event: Event) -> State {
    transition(state, event).into_state(state)
}
