use url::Url;

use super::error::RelayError;

/// Relay configuration.
///
/// Client id and secret are constructor parameters. Override the upstream
/// token endpoint or the mount path with `with_*` methods.
#[derive(Clone)]
pub struct RelayConfig {
    pub(super) client_id: String,
    pub(super) client_secret: String,
    pub(super) token_url: Url,
    pub(super) route_path: String,
    pub(super) http: reqwest::Client,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("token_url", &self.token_url.as_str())
            .field("route_path", &self.route_path)
            .finish_non_exhaustive()
    }
}

impl RelayConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: "https://github.com/login/oauth/access_token"
                .parse()
                .expect("valid default URL"),
            route_path: "/api/auth/github".into(),
            http: reqwest::Client::new(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GITHUB_CLIENT_ID`: OAuth app client ID
    /// - `GITHUB_CLIENT_SECRET`: OAuth app client secret
    ///
    /// # Optional env vars
    /// - `GITHUB_TOKEN_URL`: Override the upstream token endpoint
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if required env vars are missing or the URL is invalid.
    pub fn from_env() -> Result<Self, RelayError> {
        let client_id = std::env::var("GITHUB_CLIENT_ID")
            .map_err(|_| RelayError::Config("GITHUB_CLIENT_ID is required".into()))?;
        let client_secret = std::env::var("GITHUB_CLIENT_SECRET")
            .map_err(|_| RelayError::Config("GITHUB_CLIENT_SECRET is required".into()))?;

        let mut config = Self::new(client_id, client_secret);

        if let Ok(url_str) = std::env::var("GITHUB_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| RelayError::Config(format!("GITHUB_TOKEN_URL: {e}")))?;
            config = config.with_token_url(url);
        }

        Ok(config)
    }

    /// Override the upstream token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Mount path of the exchange endpoint (default `/api/auth/github`).
    #[must_use]
    pub fn with_route_path(mut self, path: impl Into<String>) -> Self {
        self.route_path = path.into();
        self
    }

    /// Use a custom HTTP client for upstream calls.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// OAuth app client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Upstream token endpoint.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Mount path of the exchange endpoint.
    #[must_use]
    pub fn route_path(&self) -> &str {
        &self.route_path
    }
}
