//! Session configuration

use url::Url;

use crate::error::SessionError;

const WS_PATH: &str = "/ws";
const DEFAULT_WELCOME: &str =
    "Welcome to AgentDeck. Describe a task and the agent will get to work.";

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The backend's base URL (http(s) or ws(s)).
    pub server_url: Url,
    /// Local transcript seed; never sent to the backend.
    pub welcome_message: String,
}

impl SessionConfig {
    pub fn new(server_url: &str) -> Result<Self, SessionError> {
        let server_url = Url::parse(server_url)
            .map_err(|e| SessionError::InvalidConfig(format!("server url: {}", e)))?;
        Ok(Self {
            server_url,
            welcome_message: DEFAULT_WELCOME.to_string(),
        })
    }

    pub fn with_welcome_message(mut self, welcome: &str) -> Self {
        self.welcome_message = welcome.to_string();
        self
    }

    /// Derive the socket endpoint from the server URL: fixed `/ws` path,
    /// secure transport iff the server URL is secure.
    pub fn ws_url(&self) -> Result<Url, SessionError> {
        let mut ws_url = self.server_url.clone();
        let scheme = match self.server_url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(SessionError::InvalidConfig(format!(
                    "unsupported scheme '{}' in server url",
                    other
                )))
            }
        };
        ws_url
            .set_scheme(scheme)
            .map_err(|_| SessionError::InvalidConfig("server url cannot carry a scheme".into()))?;
        ws_url.set_path(WS_PATH);
        ws_url.set_query(None);
        ws_url.set_fragment(None);
        Ok(ws_url)
    }
}
