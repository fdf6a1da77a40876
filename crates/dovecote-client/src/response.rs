//! Response normalization.
//!
//! Every pod response funnels through here: a non-200 with a JSON
//! `{error}` body becomes the server's stated error, and a body that
//! is not the JSON an operation expects becomes a parse error. The
//! normalizers are pure so they can be tested without a server.

use dovecote_proto::ErrorBody;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Decode a 200 response as JSON, or normalize the error.
pub(crate) fn normalize_json<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<T, ClientError> {
    if status != 200 {
        return Err(error_from(status, body));
    }

    serde_json::from_str(body).map_err(|_| ClientError::ResponseParse)
}

/// Accept a 200 response body as raw text, or normalize the error.
pub(crate) fn normalize_text(status: u16, body: String) -> Result<String, ClientError> {
    if status != 200 {
        return Err(error_from(status, &body));
    }

    Ok(body)
}

/// Accept a 200 response with no interesting body, or normalize the
/// error.
pub(crate) fn normalize_empty(status: u16, body: &str) -> Result<(), ClientError> {
    if status != 200 {
        return Err(error_from(status, body));
    }

    Ok(())
}

/// Normalize a non-200 response body.
fn error_from(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(envelope) => ClientError::Server { status, message: envelope.error },
        Err(_) => ClientError::ResponseParse,
    }
}
