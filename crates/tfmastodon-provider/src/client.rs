// # Mastodon API Client
//
// Thin wrapper over the Mastodon REST API used by the resources.
//
// Every method performs exactly one HTTP request. Pagination is driven by
// the caller one page at a time, and nothing is retried or cached.
//
// ## Security Requirements
//
// - The access token, client secret and password NEVER appear in logs
// - Debug output redacts all credentials
//
// ## API Reference
//
// - Obtain token: POST `/oauth/token`
// - Search accounts: GET `/api/v1/accounts/search?q=...&limit=...&resolve=true`
// - Follow: POST `/api/v1/accounts/:id/follow`
// - Unfollow: POST `/api/v1/accounts/:id/unfollow`
// - Relationships: GET `/api/v1/accounts/relationships?id[]=...`
// - Domain blocks: GET/POST/DELETE `/api/v1/domain_blocks`

use crate::config::MastodonConfig;
use reqwest::header::{HeaderMap, LINK};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tfmastodon_core::{Error, Result};
use url::Url;

/// Overall timeout for a single API request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

const POOL_MAX_IDLE_PER_HOST: usize = 100;

/// OAuth scopes requested with the password grant
pub const OAUTH_SCOPES: &str = "read write follow";

/// Label used in API errors
const API_NAME: &str = "mastodon";

/// An account as returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,

    #[serde(default)]
    pub username: String,

    /// `user` for local accounts, `user@domain` for remote ones
    #[serde(default)]
    pub acct: String,
}

/// Relationship between the authenticated user and another account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,

    #[serde(default)]
    pub following: bool,

    /// Follow request pending approval
    #[serde(default)]
    pub requested: bool,

    #[serde(default)]
    pub showing_reblogs: bool,

    #[serde(default)]
    pub notifying: bool,

    #[serde(default)]
    pub blocking: bool,

    #[serde(default)]
    pub domain_blocking: bool,
}

impl Relationship {
    /// Following, or waiting for a follow request to be approved
    pub fn is_active(&self) -> bool {
        self.following || self.requested
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Cursor for the next page, taken from the `Link` header
    pub next_max_id: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// Authenticated Mastodon client
///
/// Built once by `configure_provider` and shared by every resource.
#[derive(Clone)]
pub struct MastodonClient {
    /// Base URL of the instance
    server: Url,

    /// Bearer token from the password grant
    /// ⚠️ NEVER log this value
    access_token: String,

    http: reqwest::Client,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for MastodonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonClient")
            .field("server", &self.server.as_str())
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

impl MastodonClient {
    /// Build an HTTP client and authenticate with the password grant
    ///
    /// # Errors
    ///
    /// - `Error::Config`: the server URL is unusable
    /// - `Error::Authentication`: the token request failed for any reason
    pub async fn connect(config: &MastodonConfig) -> Result<Self> {
        let server = parse_server(&config.server)?;
        let http = build_http_client(config.allow_insecure())?;

        tracing::debug!("Authenticating as {} on {}", config.username, server);

        let access_token = authenticate(&http, &server, config).await.map_err(|e| match e {
            Error::Authentication(_) => e,
            other => Error::auth(other.to_string()),
        })?;

        tracing::info!("Authenticated with {}", server);

        Ok(Self {
            server,
            access_token,
            http,
        })
    }

    /// Build a client around an existing access token
    pub fn with_access_token(
        server: &str,
        access_token: impl Into<String>,
        allow_insecure: bool,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(Error::config("Access token cannot be empty"));
        }

        Ok(Self {
            server: parse_server(server)?,
            access_token,
            http: build_http_client(allow_insecure)?,
        })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Search for accounts, resolving remote handles through WebFinger
    pub async fn search_accounts(&self, query: &str, limit: u32) -> Result<Vec<Account>> {
        let url = self.endpoint(&["api", "v1", "accounts", "search"])?;
        let limit = limit.to_string();

        tracing::debug!("Searching accounts for {}", query);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("limit", limit.as_str()), ("resolve", "true")])
            .send()
            .await
            .map_err(request_failed)?;

        parse_json(check_status(response).await?).await
    }

    /// Follow an account by its local ID
    pub async fn follow_account(&self, id: &str) -> Result<Relationship> {
        let url = self.endpoint(&["api", "v1", "accounts", id, "follow"])?;

        tracing::debug!("Following account {}", id);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_failed)?;

        parse_json(check_status(response).await?).await
    }

    /// Unfollow an account by its local ID
    pub async fn unfollow_account(&self, id: &str) -> Result<Relationship> {
        let url = self.endpoint(&["api", "v1", "accounts", id, "unfollow"])?;

        tracing::debug!("Unfollowing account {}", id);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_failed)?;

        parse_json(check_status(response).await?).await
    }

    /// Relationships with the given accounts
    ///
    /// The server returns one entry per ID it knows about.
    pub async fn account_relationships(&self, ids: &[&str]) -> Result<Vec<Relationship>> {
        let url = self.endpoint(&["api", "v1", "accounts", "relationships"])?;
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("id[]", *id)).collect();

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await
            .map_err(request_failed)?;

        parse_json(check_status(response).await?).await
    }

    /// One page of the user's blocked domains
    ///
    /// Pass the previous page's `next_max_id` to continue a listing.
    pub async fn domain_blocks(&self, max_id: Option<&str>) -> Result<Page<String>> {
        let url = self.endpoint(&["api", "v1", "domain_blocks"])?;

        let mut request = self.http.get(url).bearer_auth(&self.access_token);
        if let Some(max_id) = max_id {
            request = request.query(&[("max_id", max_id)]);
        }

        let response = check_status(request.send().await.map_err(request_failed)?).await?;
        let next_max_id = next_max_id(response.headers());
        let items = parse_json(response).await?;

        Ok(Page { items, next_max_id })
    }

    /// Block a domain for the authenticated user
    pub async fn block_domain(&self, domain: &str) -> Result<()> {
        let url = self.endpoint(&["api", "v1", "domain_blocks"])?;

        tracing::debug!("Blocking domain {}", domain);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .form(&[("domain", domain)])
            .send()
            .await
            .map_err(request_failed)?;

        check_status(response).await?;
        Ok(())
    }

    /// Remove a domain block for the authenticated user
    pub async fn unblock_domain(&self, domain: &str) -> Result<()> {
        let url = self.endpoint(&["api", "v1", "domain_blocks"])?;

        tracing::debug!("Unblocking domain {}", domain);

        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.access_token)
            .form(&[("domain", domain)])
            .send()
            .await
            .map_err(request_failed)?;

        check_status(response).await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        api_url(&self.server, segments)
    }
}

/// URL for an API path below the server URL, percent-encoding each segment
///
/// Instances served under a path prefix keep that prefix.
fn api_url(server: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = server.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| Error::config(format!("Server URL cannot be used as a base: {}", server)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_server(server: &str) -> Result<Url> {
    let url = Url::parse(server)
        .map_err(|e| Error::config(format!("Invalid server URL '{}': {}", server, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::config(format!(
            "Server URL must use http or https, got '{}'",
            other
        ))),
    }
}

fn build_http_client(allow_insecure: bool) -> Result<reqwest::Client> {
    if allow_insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }

    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .danger_accept_invalid_certs(allow_insecure)
        .user_agent(concat!("terraform-provider-mastodon/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Exchange the configured credentials for an access token
async fn authenticate(
    http: &reqwest::Client,
    server: &Url,
    config: &MastodonConfig,
) -> Result<String> {
    let url = api_url(server, &["oauth", "token"])?;

    let response = http
        .post(url)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "password"),
            ("username", config.username.as_str()),
            ("password", config.password.as_str()),
            ("scope", OAUTH_SCOPES),
        ])
        .send()
        .await
        .map_err(request_failed)?;

    let token: TokenResponse = parse_json(check_status(response).await?).await?;
    if token.access_token.is_empty() {
        return Err(Error::auth("server returned an empty access token"));
    }

    Ok(token.access_token)
}

fn request_failed(err: reqwest::Error) -> Error {
    Error::http(format!("HTTP request failed: {}", err))
}

/// Map a non-success status onto an error, passing successes through
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = api_error_message(&body);

    tracing::debug!("Mastodon returned {}: {}", status, message);

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!("{}: {}", status, message)),
        404 => Error::not_found(format!("{}: {}", status, message)),
        429 => Error::rate_limited(format!("{}: {}", status, message)),
        500..=599 => Error::api(API_NAME, format!("server error {}: {}", status, message)),
        _ => Error::api(API_NAME, format!("{}: {}", status, message)),
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::api(API_NAME, format!("Failed to parse response: {}", e)))
}

/// Message from a Mastodon `{"error": "..."}` body, or the raw body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// `max_id` of the `rel="next"` entry in a `Link` header
fn next_max_id(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }

        Url::parse(target)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "max_id")
            .map(|(_, value)| value.into_owned())
    })
}
