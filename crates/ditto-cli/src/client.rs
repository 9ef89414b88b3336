//! Shared HTTP client utilities, credentials, and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use ditto_api_models::{DittoErrorBody, HEADER_CORRELATION_ID};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) const DEFAULT_BASE_URL: &str = "http://host.docker.internal:8080";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const CONNECTION_FAILED: &str = "Connection failed!";
pub(crate) const CONNECTION_HINT: &str = "Make sure Ditto is running and accessible.";

/// CLI-level error type separating caller mistakes from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    NotFound(String),
    Connection(anyhow::Error),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::NotFound(_) => 4,
            Self::Connection(_) => 5,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => format!("Error: {message}"),
            Self::NotFound(message) => message.clone(),
            Self::Connection(_) => format!("{CONNECTION_FAILED}\n{CONNECTION_HINT}"),
            Self::Failure(error) => format!("Error: {error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Credential set a command group falls back to when none is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Profile {
    /// Regular API user for things, policies and search.
    Ditto,
    /// Administrative user for connections and the DevOps API.
    Devops,
}

impl Profile {
    pub(crate) const fn default_username(self) -> &'static str {
        match self {
            Self::Ditto => "ditto",
            Self::Devops => "devops",
        }
    }

    pub(crate) const fn default_password(self) -> &'static str {
        match self {
            Self::Ditto => "ditto",
            Self::Devops => "foobar",
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Ditto => "ditto",
            Self::Devops => "devops",
        }
    }
}

/// Basic auth credentials resolved from flags, environment, or profile defaults.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl Credentials {
    pub(crate) fn resolve(
        profile: Profile,
        username: Option<&str>,
        password: Option<&str>,
    ) -> CliResult<Self> {
        let username = username.map_or(profile.default_username(), str::trim);
        if username.is_empty() {
            return Err(CliError::validation(
                "username cannot be empty (pass --username or set DITTO_USERNAME)",
            ));
        }
        let password = password.unwrap_or(profile.default_password());
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Build the shared HTTP client with the invocation's correlation id attached.
pub(crate) fn build_http_client(timeout_secs: u64, correlation_id: &str) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let correlation = HeaderValue::from_str(correlation_id)
        .map_err(|_| CliError::failure(anyhow!("correlation id contains invalid characters")))?;
    default_headers.insert(HEADER_CORRELATION_ID, correlation);

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Application context passed to command handlers.
#[derive(Clone, Debug)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) credentials: Credentials,
}

impl AppContext {
    /// Resolve an endpoint below the base URL, appending `tail` as encoded segments.
    pub(crate) fn endpoint(&self, route: &[&str], tail: &[&str]) -> CliResult<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| {
                CliError::validation(format!("base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(route)
            .extend(tail);
        Ok(url)
    }

    /// Start an authenticated request.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// Send a request, classifying transport failures.
    pub(crate) async fn send(&self, request: RequestBuilder) -> CliResult<Response> {
        let request = request
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build request: {err}")))?;
        let method = request.method().clone();
        let route = request.url().path().to_string();
        tracing::debug!(%method, %route, "sending request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| classify_transport(&route, &err))?;

        tracing::debug!(%method, %route, status = %response.status(), "received response");
        Ok(response)
    }
}

/// Parse the base URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Decode a JSON response body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> CliResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read {what}: {err}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::failure(anyhow!("failed to parse {what}: {err}")))
}

/// Decode a JSON response body that may legitimately be empty (e.g. `204`).
pub(crate) async fn read_optional_json(response: Response, what: &str) -> CliResult<Option<Value>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read {what}: {err}")))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| CliError::failure(anyhow!("failed to parse {what}: {err}")))
}

/// Classify an HTTP error response into a CLI error.
pub(crate) async fn classify_problem(response: Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<DittoErrorBody>(&bytes).ok();

    let message = problem.as_ref().map_or_else(
        || body_text.clone(),
        |p| p.best_message().to_string(),
    );
    tracing::warn!(
        status = status.as_u16(),
        error = problem.as_ref().map_or("", |p| p.error.as_str()),
        "ditto rejected request"
    );

    if matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::CONFLICT
            | StatusCode::PRECONDITION_FAILED
            | StatusCode::UNPROCESSABLE_ENTITY
    ) && !message.is_empty()
    {
        CliError::validation(message)
    } else {
        let detail = if let Some(problem) = problem {
            format!("{message} ({}, status {})", problem.error, problem.status)
        } else if !message.is_empty() {
            format!("{message} (status {status})")
        } else {
            format!("request failed with status {status}")
        };
        CliError::failure(anyhow!(detail))
    }
}

/// Map a transport error to either a connectivity or a generic failure.
pub(crate) fn classify_transport(route: &str, err: &reqwest::Error) -> CliError {
    let chain = error_chain(err);
    let error = anyhow!("request to {route} failed: {chain}");
    if err.is_connect() || err.is_timeout() || mentions_connection(&chain) {
        tracing::error!(%route, error = %chain, "could not reach ditto");
        CliError::Connection(error)
    } else {
        CliError::failure(error)
    }
}

/// Whether an error message talks about connecting to the server.
pub(crate) fn mentions_connection(message: &str) -> bool {
    // "connect" also covers "connection", "connected", "connecting".
    message.to_lowercase().contains("connect")
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};
    use httpmock::MockServer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn context_for(server: &MockServer, profile: Profile) -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: server.base_url().parse().expect("valid URL"),
            credentials: Credentials::resolve(profile, None, None).expect("credentials"),
        }
    }

    pub(crate) fn unreachable_context() -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: "http://127.0.0.1:1".parse().expect("valid URL"),
            credentials: Credentials::resolve(Profile::Ditto, None, None).expect("credentials"),
        }
    }

    pub(crate) fn basic_auth(profile: Profile) -> String {
        let raw = format!(
            "{}:{}",
            profile.default_username(),
            profile.default_password()
        );
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    pub(crate) fn temp_json(name: &str, contents: &serde_json::Value) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("ditto-cli-test-")
            .suffix(&format!("-{name}"))
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.to_string().as_bytes())
            .expect("write temp file");
        file
    }
}
