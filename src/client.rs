//! Postal async client implementation.

use crate::envelope::{self, Envelope};
use crate::{
    Delivery, Error, Message, MessageExpansion, Result, SendMessageRequest, SendMessageResponse,
    SendRawRequest,
};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default Postal API root. Point this at your own Postal server.
pub const DEFAULT_BASE_URL: &str = "https://postal.example.com/api/v1";

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "X-Server-API-Key";
const APPLICATION_JSON: &str = "application/json";
const USER_AGENT_VALUE: &str = concat!("postal-client/", env!("CARGO_PKG_VERSION"));

const ENV_API_KEY: &str = "POSTAL_API_KEY";
const ENV_BASE_URL: &str = "POSTAL_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "POSTAL_TIMEOUT_SECS";

/// Async client for the Postal mail delivery API.
///
/// Use [`Client::new`] for defaults or [`Client::builder`] for a custom base
/// URL, timeout, proxy, or HTTP client. Cloning is cheap and clones share the
/// connection pool, so one client can serve many tasks.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: HeaderValue,
    base_url: String,
    timeout: Duration,
    proxy: Option<String>,
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Create a client for [`DEFAULT_BASE_URL`] with [`DEFAULT_TIMEOUT`].
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::Client;
    /// let client = Client::new("your-api-key")?;
    /// # Ok::<(), postal_client::Error>(())
    /// ```
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(api_key).build()
    }

    /// Create a client for a specific Postal server and timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        ClientBuilder::new(api_key)
            .base_url(base_url)
            .timeout(timeout)
            .build()
    }

    /// The API root requests are sent to, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the proxy URL if one was configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Send a message composed from structured fields.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::{Client, SendMessageRequest};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postal_client::Error> {
    /// let client = Client::new("your-api-key")?;
    /// let sent = client
    ///     .send_message(&SendMessageRequest {
    ///         to: vec!["recipient@example.com".into()],
    ///         from: "sender@yourdomain.com".into(),
    ///         subject: "Hello from Postal".into(),
    ///         plain_body: Some("This is a test email".into()),
    ///         ..Default::default()
    ///     })
    ///     .await?;
    /// println!("{} {}", sent.message_id, sent.token);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        self.post("/send/message", request).await?.into_data()
    }

    /// Send a pre-formatted RFC 2822 message.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::{Client, SendRawRequest};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postal_client::Error> {
    /// let client = Client::new("your-api-key")?;
    /// let raw = "From: sender@yourdomain.com\r\nTo: recipient@example.com\r\nSubject: Hi\r\n\r\nHello\r\n";
    /// let request = SendRawRequest::new(
    ///     "sender@yourdomain.com",
    ///     vec!["recipient@example.com".into()],
    ///     raw,
    /// );
    /// let sent = client.send_raw(&request).await?;
    /// println!("{}", sent.message_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_raw(&self, request: &SendRawRequest) -> Result<SendMessageResponse> {
        self.post("/send/raw", request).await?.into_data()
    }

    /// Fetch a message by ID with no expansions.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postal_client::Error> {
    /// let client = Client::new("your-api-key")?;
    /// let message = client.get_message(123).await?;
    /// println!("{} {}", message.id, message.token);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_message(&self, id: u64) -> Result<Message> {
        self.get_message_with_expansions(id, &[]).await
    }

    /// Fetch a message by ID, asking Postal to include the given sections.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::{Client, MessageExpansion};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postal_client::Error> {
    /// let client = Client::new("your-api-key")?;
    /// let message = client
    ///     .get_message_with_expansions(123, &[MessageExpansion::Status, MessageExpansion::PlainBody])
    ///     .await?;
    /// println!("{:?}", message.plain_body);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_message_with_expansions(
        &self,
        id: u64,
        expansions: &[MessageExpansion],
    ) -> Result<Message> {
        let query = MessageQuery { id, expansions };
        self.post("/messages/message", &query).await?.into_data()
    }

    /// List delivery attempts for a message.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), postal_client::Error> {
    /// let client = Client::new("your-api-key")?;
    /// for delivery in client.get_message_deliveries(123).await? {
    ///     println!("{} at {}", delivery.status, delivery.timestamp);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_message_deliveries(&self, id: u64) -> Result<Vec<Delivery>> {
        let query = MessageQuery { id, expansions: &[] };
        self.post("/messages/deliveries", &query).await?.into_data()
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Envelope> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Perform one round trip and validate the response envelope.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
            .header(API_KEY_HEADER, self.api_key.clone());

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(Error::Serialize)?;
            builder = builder.body(bytes);
        }

        debug!(%method, %url, "sending postal request");
        let started = Instant::now();

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        debug!(
            %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received postal response"
        );

        envelope::parse_response(status, &bytes)
            .inspect(|envelope| {
                debug!(%url, server_time = envelope.time, flags = %envelope.flags, "postal request succeeded");
            })
            .inspect_err(|err| {
                if let Some(api) = err.api_error() {
                    debug!(
                        %url,
                        status = %api.status,
                        code = api.code().unwrap_or_default(),
                        message = api.message().unwrap_or_default(),
                        "postal returned an error"
                    );
                }
            })
    }
}

#[derive(Serialize)]
struct MessageQuery<'a> {
    id: u64,
    #[serde(rename = "_expansions", skip_serializing_if = "no_expansions")]
    expansions: &'a [MessageExpansion],
}

fn no_expansions(expansions: &&[MessageExpansion]) -> bool {
    expansions.is_empty()
}

/// Builder for configuring a Postal client.
///
/// Start with [`Client::builder`] to override defaults.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    proxy: Option<String>,
    danger_accept_invalid_certs: bool,
    user_agent: String,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - [`DEFAULT_BASE_URL`]
    /// - [`DEFAULT_TIMEOUT`]
    /// - No proxy
    /// - `danger_accept_invalid_certs = false`
    /// - `postal-client/<version>` user agent
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            danger_accept_invalid_certs: false,
            user_agent: USER_AGENT_VALUE.to_string(),
            http: None,
        }
    }

    /// Configure from `POSTAL_API_KEY`, `POSTAL_BASE_URL` and `POSTAL_TIMEOUT_SECS`.
    ///
    /// Only the API key is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config(format!("{ENV_API_KEY} is not set")))?;

        let mut builder = Self::new(api_key);
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder)
    }

    /// Set the API root, e.g. `https://postal.yourdomain.com/api/v1`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a proxy URL (e.g., "socks5://127.0.0.1:1080").
    ///
    /// Ignored when a custom client is supplied through [`ClientBuilder::http_client`].
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Control whether to accept invalid TLS certificates (default: false).
    ///
    /// Ignored when a custom client is supplied through [`ClientBuilder::http_client`].
    pub fn danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.danger_accept_invalid_certs = value;
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use an already configured `reqwest::Client`.
    ///
    /// Headers and the timeout are still applied to every request.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client.
    ///
    /// No network traffic happens here.
    ///
    /// # Examples
    /// ```no_run
    /// # use postal_client::Client;
    /// # use std::time::Duration;
    /// let client = Client::builder("your-api-key")
    ///     .base_url("https://postal.yourdomain.com/api/v1")
    ///     .timeout(Duration::from_secs(10))
    ///     .build()?;
    /// # Ok::<(), postal_client::Error>(())
    /// ```
    pub fn build(self) -> Result<Client> {
        let mut api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::Config("API key is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);

        let base_url = self.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {base_url:?}: {e}")))?;

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::Client::builder()
                    .user_agent(self.user_agent)
                    .danger_accept_invalid_certs(self.danger_accept_invalid_certs);

                if let Some(proxy_url) = &self.proxy {
                    let proxy = reqwest::Proxy::all(proxy_url)
                        .map_err(|e| Error::Config(format!("invalid proxy URL {proxy_url:?}: {e}")))?;
                    builder = builder.proxy(proxy);
                }

                builder.build()?
            }
        };

        Ok(Client {
            http,
            api_key,
            base_url,
            timeout: self.timeout,
            proxy: self.proxy,
        })
    }
}
