//! Session configuration.

use dovecote_client::ClientConfig;
use dovecote_core::connect::StoreConfig;

/// Configuration for a message session.
///
/// Merging happens field by field over the documented defaults; there
/// is no hidden fallback chain.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Alias to register at the own pod. Defaults to the alias part of
    /// the identity's user ID.
    pub alias: Option<String>,

    /// Storage connection settings.
    pub store: StoreConfig,

    /// Directory client settings (deadlines).
    pub client: ClientConfig,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = SessionConfig::default();
        assert!(config.alias.is_none());
        assert_eq!(config.store.port, 44_678);
        assert!(config.client.request_timeout.as_secs() > 0);
    }
}
