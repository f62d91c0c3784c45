//! # Postal Client
//! Asynchronous wrapper around the [Postal](https://docs.postalserver.io/) mail delivery HTTP API: send composed or raw RFC 2822 messages, then look them up and inspect their delivery attempts, using [`Client`] and [`ClientBuilder`].
//!
//! ## Audience and uses
//! For Rust services that deliver mail through a Postal server: configure a client with the server's API key, send with [`Client::send_message`] or [`Client::send_raw`], and follow up with [`Client::get_message`] and [`Client::get_message_deliveries`].
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`. Every call is exactly one request/response round trip bounded by the client's timeout; nothing is retried, batched, or cached.
//!
//! ## Logging
//! Requests, responses, and API errors are reported as `tracing` events at `DEBUG` level. Install any `tracing` subscriber to see them.
//!
//! ## Errors
//! Transport failures and timeouts surface as [`Error::Request`]. When Postal answers with a failure envelope, either on a non-2xx status or with a `status` other than `"success"`, the call returns [`Error::Api`] carrying an [`ApiError`]. Bodies that are not the expected JSON become [`Error::ResponseParse`] or [`Error::UnexpectedStatus`]. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use postal_client::{Client, SendMessageRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), postal_client::Error> {
//!     let client = Client::builder("your-api-key")
//!         .base_url("https://postal.yourdomain.com/api/v1")
//!         .build()?;
//!
//!     let sent = client
//!         .send_message(&SendMessageRequest {
//!             to: vec!["recipient@example.com".into()],
//!             from: "sender@yourdomain.com".into(),
//!             subject: "Hello from Postal".into(),
//!             plain_body: Some("This is a test email".into()),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     for delivery in client.get_message_deliveries(sent.message_id).await? {
//!         println!("{}: {}", delivery.status, delivery.details.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod envelope;
mod error;
mod models;

pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Error};
pub use models::{
    Attachment, Delivery, Message, MessageDetails, MessageExpansion, MessageStatus,
    RecipientMessage, SendMessageRequest, SendMessageResponse, SendRawRequest,
};

/// Result type alias for Postal operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
