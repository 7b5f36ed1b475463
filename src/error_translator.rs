//! Translation of failure responses into the client error taxonomy.

use crate::error::Error;
use http::StatusCode;
use serde_json::Value;

/// Error body returned by the server alongside a failure status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: Option<String>,
    pub code: Option<i64>,
}

impl ErrorMessage {
    /// Reads an error body, tolerating bodies that are not JSON at all.
    ///
    /// `message` and `code` are read independently; a malformed one leaves the other intact.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let json: Value = serde_json::from_slice(body).ok()?;
        let fields = json.as_object()?;
        Some(Self {
            message: fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            code: fields.get("code").and_then(Value::as_i64),
        })
    }
}

/// Classifies a non-2xx response.
///
/// The status decides the error kind; the body, when it carries an
/// [`ErrorMessage`], supplies the code and message handed to the caller.
pub fn translate(status: StatusCode, body: &[u8]) -> Error {
    let parsed = ErrorMessage::parse(body).unwrap_or_default();
    let code = parsed.code.unwrap_or_else(|| i64::from(status.as_u16()));
    let message = parsed.message.unwrap_or_else(|| fallback_message(status, body));

    tracing::debug!(status = status.as_u16(), code, message = %message, "server rejected request");

    match status {
        StatusCode::NOT_FOUND => Error::KeyNotFound { code, message },
        StatusCode::CONFLICT => Error::UnsatisfiedCondition { code, message },
        _ => Error::Server {
            status: status.as_u16(),
            code,
            message,
        },
    }
}

fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        text.to_string()
    }
}
