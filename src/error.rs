//! crate error types

use snafu::prelude::*;

use super::config::ConfigError;
use super::socket::ParseEndpointError;

/// crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Config values are not usable
    #[snafu(display("invalid config: {source}"))]
    InvalidConfig {
        /// source error
        source: ConfigError,
    },

    /// Connection configuration can not be built
    #[snafu(display("invalid connection config for {id}: {source}"))]
    InvalidConnectionConf {
        /// user id of the connection
        id: String,
        /// source error
        source: ParseEndpointError,
    },
}
