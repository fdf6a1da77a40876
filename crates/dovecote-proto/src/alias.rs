//! Alias directory entries.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A human-readable name bound to a user ID at a pod.
///
/// Created once at registration; looked up by any party resolving a
/// user ID to routing info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// The alias as registered at the pod.
    pub alias: String,

    /// The full user ID the alias is bound to.
    pub user_id: UserId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn alias_entry_json_round_trip() {
        let json = r#"{"alias":"alice","user_id":"alice@pod.example"}"#;
        let entry: AliasEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.alias, "alice");
        assert_eq!(serde_json::to_string(&entry).unwrap(), json);
    }
}
