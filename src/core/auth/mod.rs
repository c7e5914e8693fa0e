// ─── Launch Credentials ───
// The launcher only needs an opaque identity for offline play: a display
// name, a stable UUID and placeholder token fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchProfile {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl LaunchProfile {
    pub fn offline(username: &str) -> Self {
        let username = {
            let trimmed = username.trim();
            if trimmed.is_empty() {
                "Player"
            } else {
                trimmed
            }
        };
        Self {
            username: username.to_string(),
            uuid: Uuid::new_v4().to_string(),
            access_token: "0".into(),
            user_type: "legacy".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_username_falls_back_to_default() {
        let profile = LaunchProfile::offline("   ");
        assert_eq!(profile.username, "Player");
        assert!(!profile.uuid.is_empty());
    }
}
