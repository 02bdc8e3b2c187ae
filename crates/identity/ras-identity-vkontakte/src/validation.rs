//! Validation of VK response envelopes.
//!
//! VK reports failures in two shapes: API methods return
//! `{"error": {"error_code": .., "error_msg": ..}}`, while the VK ID endpoints
//! use the OAuth form `{"error": "..", "error_description": ".."}`. Either may
//! arrive with a 2xx status.

use crate::error::{VkontakteError, VkontakteResult};
use ras_identity_oauth2::ProviderResponse;
use serde_json::Value;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Rejects a response that failed at HTTP level, is not JSON, or carries an
/// error envelope. Checks run in that order.
pub fn check_response(response: &ProviderResponse) -> VkontakteResult<()> {
    let body = &response.body;

    let error = body.get("error").filter(|e| !is_blank(e));
    let error_code = error
        .and_then(|e| e.get("error_code"))
        .and_then(as_code)
        .unwrap_or_else(|| i64::from(response.status));
    let description = body.get("error_description").and_then(non_blank_str);
    let error_message = error
        .and_then(|e| e.get("error_msg"))
        .and_then(non_blank_str)
        .or(description);
    let message = error_message.unwrap_or(response.reason.as_str());

    if response.status > 399 {
        return Err(VkontakteError::HttpError {
            code: response.status,
            message: message.to_string(),
            body: body.clone(),
        });
    }

    if response.primary_content_type() != Some(JSON_CONTENT_TYPE) {
        return Err(VkontakteError::HttpError {
            code: response.status,
            message: message.to_string(),
            body: body.clone(),
        });
    }

    if let Some(error) = error {
        // A bare OAuth error string is the best message left when nothing
        // more descriptive was sent.
        let message = error_message
            .or_else(|| non_blank_str(error))
            .unwrap_or(response.reason.as_str());

        return Err(VkontakteError::ProviderError {
            code: error_code,
            message: message.to_string(),
            body: body.clone(),
        });
    }

    Ok(())
}

/// Mirrors "empty" for loosely typed payloads: null, false, zero, "", "0",
/// and empty collections.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty() && *s != "0")
}

fn as_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .filter(|code| *code != 0)
}
