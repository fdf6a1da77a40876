//! Pod error envelopes.

use serde::{Deserialize, Serialize};

/// The JSON error body pods attach to non-200 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The server's stated error message.
    pub error: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_body_parses() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"alias already taken"}"#).unwrap();
        assert_eq!(body.error, "alias already taken");
    }
}
