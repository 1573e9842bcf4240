use bytes::Bytes;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use super::User;

/// Event type of the first frame a server sends on a fresh connection
pub const CONNECTED_EVENT_TYPE: &str = "health.check";

/// Error when decode the connected event frame
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum DecodeConnectionInfoError {
    /// data is invalid json
    #[snafu(display("parse json failed: {source}"))]
    ParseJSONFailed {
        /// data for decode
        data: Bytes,
        /// source error
        source: serde_json::Error,
    },

    /// frame is some other event
    #[snafu(display("received {event_type} event instead of connected event"))]
    NotConnectedEvent {
        /// received event type
        event_type: String,
    },

    /// connected event carries empty connection id
    #[snafu(display("connected event has no connection id"))]
    NoConnectionId,

    /// connected event carries no user
    #[snafu(display("connected event has no me field"))]
    NoUser,
}

#[derive(Debug, Deserialize)]
struct RawConnectedEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    connection_id: String,
    me: Option<User>,
}

/// Server issued identity of a live connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// connection id, sent back to the server on rest calls
    pub connection_id: String,
    /// the connected user as seen by the server
    pub user: User,
}

impl ConnectionInfo {
    /// Decode the first frame of a connection
    pub fn decode(data: Bytes) -> Result<Self, DecodeConnectionInfoError> {
        let raw: RawConnectedEvent =
            serde_json::from_slice(&data).context(error::ParseJSONFailed { data: data.clone() })?;

        ensure!(
            raw.event_type == CONNECTED_EVENT_TYPE,
            error::NotConnectedEvent {
                event_type: raw.event_type,
            }
        );

        ensure!(!raw.connection_id.is_empty(), error::NoConnectionId);

        let user = raw.me.context(error::NoUser)?;

        Ok(Self {
            connection_id: raw.connection_id,
            user,
        })
    }
}
