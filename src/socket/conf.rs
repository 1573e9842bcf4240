use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Id used for anonymous connections
pub const ANONYMOUS_ID: &str = "!anon";

/// Chat user the socket connects as
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// user id
    pub id: String,
    /// display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// avatar url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl User {
    /// Create a user with only an id
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Who the connection is made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// authenticated user
    User(User),
    /// anonymous guest
    Anonymous,
}

/// Parse socket endpoint error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ParseEndpointError {
    /// the str is not a valid url
    #[snafu(display("{s} is an invalid url: {source}"))]
    InvalidURL {
        /// string be parsed
        s: String,
        /// source error
        source: url::ParseError,
    },

    /// the parsed url schema is not websocket
    #[snafu(display("the url {s} has invalid schema {schema}, only ws or wss is ok"))]
    InvalidSchema {
        /// the url
        s: String,
        /// invalid schema
        schema: String,
    },

    /// the parsed url has no host
    #[snafu(display("the endpoint url {s} has no host"))]
    NoHost {
        /// the url
        s: String,
    },
}

/// Immutable description of what a connection attempt connects to and as whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConf {
    endpoint: url::Url,
    api_key: String,
    identity: Identity,
    is_reconnection: bool,
}

impl ConnectionConf {
    fn new(endpoint: &str, api_key: String, identity: Identity) -> Result<Self, ParseEndpointError> {
        let url = url::Url::parse(endpoint).with_context(|_| error::InvalidURL { s: endpoint })?;

        ensure!(
            url.scheme() == "wss" || url.scheme() == "ws",
            error::InvalidSchema {
                s: endpoint,
                schema: url.scheme(),
            }
        );

        ensure!(url.host().is_some(), error::NoHost { s: endpoint });

        Ok(Self {
            endpoint: url,
            api_key,
            identity,
            is_reconnection: false,
        })
    }

    /// Configuration for an authenticated user
    pub fn user<S: Into<String>>(
        endpoint: &str,
        api_key: S,
        user: User,
    ) -> Result<Self, ParseEndpointError> {
        Self::new(endpoint, api_key.into(), Identity::User(user))
    }

    /// Configuration for an anonymous guest
    pub fn anonymous<S: Into<String>>(endpoint: &str, api_key: S) -> Result<Self, ParseEndpointError> {
        Self::new(endpoint, api_key.into(), Identity::Anonymous)
    }

    /// Copy of this configuration marked as an automatic reconnection
    pub fn as_reconnection(&self) -> Self {
        Self {
            is_reconnection: true,
            ..self.clone()
        }
    }

    /// socket endpoint
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// api key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// true if produced by [as_reconnection](Self::as_reconnection)
    pub fn is_reconnection(&self) -> bool {
        self.is_reconnection
    }

    /// user id, or [ANONYMOUS_ID] for anonymous connections
    pub fn id(&self) -> &str {
        match &self.identity {
            Identity::User(user) => &user.id,
            Identity::Anonymous => ANONYMOUS_ID,
        }
    }

    /// Construct the final connect url, `token` is required for user connections
    pub fn connect_url(&self, token: Option<&str>) -> url::Url {
        let mut u = self.endpoint.clone();

        let path = format!("{}/connect", u.path().trim_end_matches('/'));
        u.set_path(&path);

        let user_details = match &self.identity {
            // only string fields, serializing into a json value can not fail
            Identity::User(user) => serde_json::to_value(user).unwrap_or_default(),
            Identity::Anonymous => serde_json::json!({ "id": ANONYMOUS_ID }),
        };
        let payload = serde_json::json!({
            "user_id": self.id(),
            "user_details": user_details,
            "server_determines_connection_id": true,
        });

        {
            let mut query = u.query_pairs_mut();
            query.append_pair("json", &payload.to_string());
            query.append_pair("api_key", &self.api_key);
            match &self.identity {
                Identity::User(_) => {
                    if let Some(token) = token {
                        query.append_pair("authorization", token);
                    }
                    query.append_pair("stream-auth-type", "jwt");
                }
                Identity::Anonymous => {
                    query.append_pair("stream-auth-type", "anonymous");
                }
            }
        }

        u
    }
}
