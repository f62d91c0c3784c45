//! Request and response types for the Postal API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A message to compose and send through `/send/message`.
///
/// Postal requires `from`, `subject`, at least one recipient across
/// `to`/`cc`/`bcc` (50 max each), and a plain or HTML body. The service
/// validates these, not this crate.
///
/// ```
/// use postal_client::SendMessageRequest;
///
/// let req = SendMessageRequest {
///     to: vec!["recipient@example.com".into()],
///     from: "sender@yourdomain.com".into(),
///     subject: "Hello from Postal".into(),
///     plain_body: Some("This is a test email".into()),
///     ..Default::default()
/// };
/// # let _ = req;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendMessageRequest {
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    pub from: String,
    /// Address for the `Sender` header. Postal uses `from` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub subject: String,
    /// Tag for filtering and statistics in the Postal UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Extra headers added to the composed message.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Send as a bounce message.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bounce: bool,
}

/// A pre-formatted RFC 2822 message for `/send/raw`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendRawRequest {
    /// Envelope sender; must be authorized for the Postal server.
    pub mail_from: String,
    /// Envelope recipients.
    pub rcpt_to: Vec<String>,
    /// Base64 encoded message text.
    pub data: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bounce: bool,
}

impl SendRawRequest {
    /// Build a raw request from unencoded message text.
    ///
    /// ```
    /// use postal_client::SendRawRequest;
    ///
    /// let raw = "From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n\r\nBody\r\n";
    /// let req = SendRawRequest::new("a@example.com", vec!["b@example.com".into()], raw);
    /// assert!(!req.data.contains("Subject"));
    /// ```
    pub fn new(
        mail_from: impl Into<String>,
        rcpt_to: Vec<String>,
        message: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            mail_from: mail_from.into(),
            rcpt_to,
            data: STANDARD.encode(message),
            bounce: false,
        }
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    /// Base64 encoded file content.
    pub data: String,
    /// Size in bytes. Only present on attachments returned by Postal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Attachment {
    /// Create an attachment from raw file bytes.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: STANDARD.encode(content),
            size: None,
        }
    }

    /// Decode the attachment content.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Result of `/send/message` and `/send/raw`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendMessageResponse {
    pub message_id: u64,
    pub token: String,
    /// One entry per recipient address.
    #[serde(default)]
    pub messages: HashMap<String, RecipientMessage>,
}

/// The message Postal created for a single recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipientMessage {
    pub id: u64,
    pub token: String,
}

/// Optional sections of a [`Message`] requested through
/// [`Client::get_message_with_expansions`](crate::Client::get_message_with_expansions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageExpansion {
    Status,
    Details,
    Inspection,
    PlainBody,
    HtmlBody,
    Attachments,
    Headers,
    RawMessage,
    ActivityEntries,
}

impl MessageExpansion {
    /// Every expansion Postal knows about.
    pub const ALL: &'static [MessageExpansion] = &[
        MessageExpansion::Status,
        MessageExpansion::Details,
        MessageExpansion::Inspection,
        MessageExpansion::PlainBody,
        MessageExpansion::HtmlBody,
        MessageExpansion::Attachments,
        MessageExpansion::Headers,
        MessageExpansion::RawMessage,
        MessageExpansion::ActivityEntries,
    ];
}

/// A message stored by Postal.
///
/// Only `id` and `token` are always present; the rest is filled in when the
/// matching [`MessageExpansion`] was requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: u64,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<MessageDetails>,
    /// Spam and threat inspection results, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, serde_json::Value>,
    /// Base64 encoded RFC 2822 source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_message: Option<String>,
}

/// The `status` expansion of a [`Message`], kept as raw JSON fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageStatus {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl MessageStatus {
    /// Look up one field of the status object, e.g. `"status"` or `"held"`.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// The `details` expansion of a [`Message`], kept as raw JSON fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageDetails {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl MessageDetails {
    /// Look up one field of the details object, e.g. `"subject"` or `"size"`.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// One delivery attempt of a message to a recipient server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: u64,
    /// e.g. `"Sent"`, `"SoftFail"`, `"HardFail"`, `"Held"`.
    pub status: String,
    #[serde(default)]
    pub details: Option<String>,
    /// Raw output from the receiving mail server.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub sent_with_ssl: bool,
    /// SMTP log identifier. Numeric ids are normalized to strings.
    #[serde(default, deserialize_with = "deserialize_log_id")]
    pub log_id: Option<String>,
    /// Seconds the attempt took.
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Postal sends Unix epoch seconds; older proxies and fixtures use RFC 3339.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Epoch(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Epoch(secs) => {
            let out_of_range = || D::Error::custom(format!("timestamp out of range: {secs}"));
            if !secs.is_finite() {
                return Err(out_of_range());
            }

            let floor = secs.floor();
            let mut whole = floor as i64;
            let mut nanos = ((secs - floor) * 1e9).round() as i64;
            if nanos >= 1_000_000_000 {
                whole += 1;
                nanos -= 1_000_000_000;
            }
            DateTime::from_timestamp(whole, nanos as u32).ok_or_else(out_of_range)
        }
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom),
    }
}

fn deserialize_log_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(text) => text,
    }))
}
