//! Connection lifecycle state machine of a chat socket

mod conf;
mod event;
mod info;
mod network_error;
mod service;
mod state;
mod store;
mod stream;
mod transition;

pub use conf::{ConnectionConf, Identity, ParseEndpointError, User, ANONYMOUS_ID};
pub use event::Event;
pub use info::{ConnectionInfo, DecodeConnectionInfoError, CONNECTED_EVENT_TYPE};
pub use network_error::{NetworkError, NetworkErrorKind};
pub use service::SocketStateService;
pub use state::{Disconnected, State};
pub use stream::{StateStream, Subscription};
pub use transition::{apply, transition, Transition};
