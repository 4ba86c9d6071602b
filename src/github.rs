use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::error::Error;
use crate::types::{AccessToken, CorrelationId};

pub use crate::types::RemoteIdentity;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("desk-shell/", env!("CARGO_PKG_VERSION"));

/// GitHub OAuth and API configuration.
///
/// Required fields are constructor parameters. The redirect target
/// (`<origin>/auth/callback`) and the relay endpoint (`<origin>/api/auth/github`)
/// are derived from the application origin unless overridden.
///
/// ```rust,ignore
/// use desk_shell::GithubConfig;
///
/// let config = GithubConfig::new("Iv1.abc", "tauri://localhost".parse()?)
///     .with_relay_url("https://relay.example.com/api/auth/github".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GithubConfig {
    pub(crate) client_id: String,
    pub(crate) origin: Url,
    pub(crate) authorize_url: Url,
    pub(crate) api_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) relay_url: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) fallback_token: Option<AccessToken>,
}

impl GithubConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, origin: Url) -> Self {
        let mut redirect_uri = origin.clone();
        redirect_uri.set_path("/auth/callback");
        redirect_uri.set_query(None);
        let mut relay_url = origin.clone();
        relay_url.set_path("/api/auth/github");
        relay_url.set_query(None);

        Self {
            client_id: client_id.into(),
            origin,
            redirect_uri,
            relay_url,
            authorize_url: "https://github.com/login/oauth/authorize"
                .parse()
                .expect("valid default URL"),
            api_url: "https://api.github.com".parse().expect("valid default URL"),
            scopes: vec!["repo".into(), "user:email".into()],
            fallback_token: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GITHUB_CLIENT_ID`: OAuth app client ID
    /// - `APP_ORIGIN`: origin the web view is served from
    ///
    /// # Optional env vars
    /// - `GITHUB_AUTHORIZE_URL`, `GITHUB_API_URL`, `GITHUB_RELAY_URL`: endpoint overrides
    /// - `GITHUB_SCOPES`: comma-separated scopes
    /// - `GITHUB_TOKEN`: token used for repository reads when nobody is linked
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required vars are missing or a URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let client_id = std::env::var("GITHUB_CLIENT_ID")
            .map_err(|_| Error::Config("GITHUB_CLIENT_ID is required".into()))?;
        let origin = env_url("APP_ORIGIN")?
            .ok_or_else(|| Error::Config("APP_ORIGIN is required".into()))?;

        let mut config = Self::new(client_id, origin);

        if let Some(url) = env_url("GITHUB_AUTHORIZE_URL")? {
            config = config.with_authorize_url(url);
        }
        if let Some(url) = env_url("GITHUB_API_URL")? {
            config = config.with_api_url(url);
        }
        if let Some(url) = env_url("GITHUB_RELAY_URL")? {
            config = config.with_relay_url(url);
        }
        if let Ok(scopes) = std::env::var("GITHUB_SCOPES") {
            config = config.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN")
            && !token.is_empty()
        {
            config = config.with_fallback_token(AccessToken::new(token));
        }

        Ok(config)
    }

    /// Override the authorization page URL.
    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    /// Override the REST API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    /// Override the token exchange relay endpoint.
    #[must_use]
    pub fn with_relay_url(mut self, url: Url) -> Self {
        self.relay_url = url;
        self
    }

    /// Override the OAuth redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, url: Url) -> Self {
        self.redirect_uri = url;
        self
    }

    /// Override the scopes (default: `["repo", "user:email"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Token used for API reads when the caller passes none.
    #[must_use]
    pub fn with_fallback_token(mut self, token: AccessToken) -> Self {
        self.fallback_token = Some(token);
        self
    }

    /// OAuth app client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Serialized application origin (`scheme://host[:port]`), as compared
    /// against the origin of callback messages.
    #[must_use]
    pub fn app_origin(&self) -> &str {
        &self.origin[..Position::BeforePath]
    }

    /// Authorization page URL.
    #[must_use]
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    /// REST API base URL.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// OAuth redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Token exchange relay endpoint.
    #[must_use]
    pub fn relay_url(&self) -> &Url {
        &self.relay_url
    }

    /// Requested OAuth scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

fn env_url(name: &str) -> Result<Option<Url>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Repository summary from `GET /user/repos` and `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// One entry of a repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Contents {
    Many(Vec<ContentEntry>),
    One(ContentEntry),
}

#[derive(Deserialize)]
struct FileBody {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// GitHub client: authorization URL, relay exchange and API reads.
pub struct GithubClient {
    config: GithubConfig,
    http: reqwest::Client,
}

impl GithubClient {
    #[must_use]
    pub fn new(config: GithubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Authorization URL for one login attempt, carrying `state` as its
    /// correlation token.
    #[must_use]
    pub fn authorization_url(&self, state: &CorrelationId) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state.as_str());
        url
    }

    /// Exchange an authorization code for an access token through the relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Remote`] with
    /// the relay's message if it rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, Error> {
        let response = self
            .http
            .post(self.config.relay_url.clone())
            .header(ACCEPT, "application/json")
            .json(&ExchangeRequest { code })
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        let body: ExchangeResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(Error::Remote {
                operation: "token exchange",
                status: StatusCode::OK.as_u16(),
                detail: body.message.unwrap_or(error),
            });
        }
        body.access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::from)
            .ok_or_else(|| Error::Remote {
                operation: "token exchange",
                status: StatusCode::OK.as_u16(),
                detail: "relay returned no access token".into(),
            })
    }

    /// Fetch the profile of the token's owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Remote`] on a
    /// non-success response.
    pub async fn get_user(&self, token: &AccessToken) -> Result<RemoteIdentity, Error> {
        let response = self.api_get(&["user"], Some(token)).send().await?;
        let response = Self::ensure_success(response, "user info").await?;
        response.json().await.map_err(Into::into)
    }

    /// One page of the authenticated account's repositories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Remote`] on a
    /// non-success response.
    pub async fn list_repos(
        &self,
        token: &AccessToken,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>, Error> {
        let response = self
            .api_get(&["user", "repos"], Some(token))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;
        let response = Self::ensure_success(response, "repository listing").await?;
        response.json().await.map_err(Into::into)
    }

    /// Repository metadata. A trailing `.git` on `repo` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a 404, [`Error::Remote`] for other
    /// failures.
    pub async fn repo_info(
        &self,
        token: Option<&AccessToken>,
        owner: &str,
        repo: &str,
    ) -> Result<Repository, Error> {
        let repo = clean_repo_name(repo);
        let response = self.api_get(&["repos", owner, repo], token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "Repository \"{owner}/{repo}\" not found. Please verify the repository name and try again."
            )));
        }
        let response = Self::ensure_success(response, "repository info").await?;
        response.json().await.map_err(Into::into)
    }

    /// Directory listing at `path` (repository root when empty). A single file
    /// path yields a one-element list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a 404, [`Error::Remote`] for other
    /// failures.
    pub async fn repo_contents(
        &self,
        token: Option<&AccessToken>,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry>, Error> {
        let repo = clean_repo_name(repo);
        let response = self
            .api_get(&contents_segments(owner, repo, path), token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "Path not found in repository \"{owner}/{repo}\". Please verify the path and try again."
            )));
        }
        let response = Self::ensure_success(response, "repository contents").await?;
        Ok(match response.json::<Contents>().await? {
            Contents::Many(entries) => entries,
            Contents::One(entry) => vec![entry],
        })
    }

    /// Text content of one file, decoded from GitHub's base64 encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a 404, [`Error::Remote`] for other
    /// failures, or [`Error::Decode`] if the content is not valid base64/UTF-8.
    pub async fn file_content(
        &self,
        token: Option<&AccessToken>,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, Error> {
        let repo = clean_repo_name(repo);
        let response = self
            .api_get(&contents_segments(owner, repo, path), token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "File not found in repository \"{owner}/{repo}\". Please verify the file path and try again."
            )));
        }
        let response = Self::ensure_success(response, "file content").await?;
        let body: FileBody = response.json().await?;
        let content = body.content.unwrap_or_default();

        if body.encoding.as_deref() != Some("base64") {
            return Ok(content);
        }
        let compact: String = content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| Error::Decode(format!("invalid base64 in {path}: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::Decode(format!("{path} is not UTF-8: {e}")))
    }

    fn api_get(&self, segments: &[&str], token: Option<&AccessToken>) -> reqwest::RequestBuilder {
        let mut url = self.config.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        let request = self
            .http
            .get(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, CLIENT_USER_AGENT);
        match token.or(self.config.fallback_token.as_ref()) {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    /// Checks HTTP status; on failure reads `{ message }` from the body when present.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or(body);
        Err(Error::Remote {
            operation,
            status: status.as_u16(),
            detail,
        })
    }
}

fn clean_repo_name(repo: &str) -> &str {
    repo.strip_suffix(".git").unwrap_or(repo)
}

fn contents_segments<'a>(owner: &'a str, repo: &'a str, path: &'a str) -> Vec<&'a str> {
    let mut segments = vec!["repos", owner, repo, "contents"];
    segments.extend(path.split('/').filter(|s| !s.is_empty()));
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GithubConfig {
        GithubConfig::new("test-client", "https://app.example.com".parse().unwrap())
    }

    #[test]
    fn authorization_url_contains_params() {
        let client = GithubClient::new(test_config());
        let state = CorrelationId::generate();
        let url = client.authorization_url(&state);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(url.as_str().starts_with("https://github.com/login/oauth/authorize?"));
        assert!(pairs.contains(&("client_id".into(), "test-client".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://app.example.com/auth/callback".into()
        )));
        assert!(pairs.contains(&("scope".into(), "repo user:email".into())));
        assert!(pairs.contains(&("state".into(), state.to_string())));
    }

    #[test]
    fn derived_endpoints_follow_origin() {
        let config = test_config();
        assert_eq!(config.app_origin(), "https://app.example.com");
        assert_eq!(
            config.relay_url().as_str(),
            "https://app.example.com/api/auth/github"
        );
    }

    #[test]
    fn app_origin_keeps_custom_scheme_and_port() {
        let config = GithubConfig::new("id", "tauri://localhost".parse().unwrap());
        assert_eq!(config.app_origin(), "tauri://localhost");

        let config = GithubConfig::new("id", "http://localhost:3000/app".parse().unwrap());
        assert_eq!(config.app_origin(), "http://localhost:3000");
    }

    #[test]
    fn config_with_overrides() {
        let config = test_config()
            .with_api_url("http://127.0.0.1:9000".parse().unwrap())
            .with_scopes(vec!["read:user".into()]);

        assert_eq!(config.api_url().as_str(), "http://127.0.0.1:9000/");
        assert_eq!(config.scopes(), &["read:user"]);
    }

    #[test]
    fn repo_name_strips_git_suffix() {
        assert_eq!(clean_repo_name("demo.git"), "demo");
        assert_eq!(clean_repo_name("demo"), "demo");
    }

    #[test]
    fn contents_segments_split_nested_path() {
        assert_eq!(
            contents_segments("o", "r", "src/lib.rs"),
            ["repos", "o", "r", "contents", "src", "lib.rs"]
        );
        assert_eq!(contents_segments("o", "r", ""), ["repos", "o", "r", "contents"]);
    }
}
