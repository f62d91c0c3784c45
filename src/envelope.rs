//! Postal response envelope handling.
//!
//! Every Postal API response is wrapped in the same JSON object:
//! ```json
//! { "status": "success", "time": 0.02, "flags": {}, "data": { ... } }
//! ```
//! [`parse_response`] decides success vs. failure from the HTTP status and the
//! envelope `status` and leaves `data` undecoded for the endpoint to interpret.

use crate::error::ApiError;
use crate::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

const SUCCESS: &str = "success";

/// Successful response envelope with its payload still as raw JSON.
///
/// A missing or `null` `status` decodes as `""`, which is not a success.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: f64,
    #[serde(default)]
    pub flags: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Whether the envelope reports `"success"`.
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }

    /// Decode the `data` payload into the endpoint's response type.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.data).map_err(Error::ResponseParse)
    }
}

/// Turn a raw HTTP response into an [`Envelope`] or the matching error.
///
/// - non-2xx with a JSON body: [`Error::Api`]
/// - non-2xx with anything else: [`Error::UnexpectedStatus`]
/// - 2xx that is not a valid envelope: [`Error::ResponseParse`]
/// - 2xx with `status != "success"`: [`Error::Api`]
pub(crate) fn parse_response(status: StatusCode, body: &[u8]) -> Result<Envelope> {
    if !status.is_success() {
        return Err(match api_error(status, body) {
            Ok(err) => Error::Api(err),
            Err(_) => Error::UnexpectedStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(body).into_owned(),
            },
        });
    }

    let envelope: Envelope = serde_json::from_slice(body).map_err(Error::ResponseParse)?;
    if envelope.is_success() {
        return Ok(envelope);
    }

    let err = api_error(status, body).map_err(Error::ResponseParse)?;
    Err(Error::Api(err))
}

/// Postal occasionally sends `null` for scalar envelope fields.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn api_error(status: StatusCode, body: &[u8]) -> std::result::Result<ApiError, serde_json::Error> {
    let mut err: ApiError = serde_json::from_slice(body)?;
    err.http_status = status.as_u16();
    Ok(err)
}
