use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_guest: bool,
}

impl UserProfile {
    pub fn new<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_url: None,
            is_guest: false,
        }
    }

    /// Guest profiles browse without reminders or realtime delivery.
    pub fn guest<S: Into<String>>(name: S) -> Self {
        Self {
            id: format!("guest-{}", Uuid::new_v4()),
            name: name.into(),
            avatar_url: None,
            is_guest: true,
        }
    }
}

/// An authenticated identity: opaque token plus the user it belongs to.
///
/// Owned by the orchestrator; created by store-backed restore or explicit
/// login, destroyed on logout or restore failure. At most one session is
/// active per orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            profile,
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.profile.id
    }

    pub fn is_guest(&self) -> bool {
        self.profile.is_guest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new_issues_unique_tokens() {
        let a = Session::new(UserProfile::new("u1", "Ada"));
        let b = Session::new(UserProfile::new("u1", "Ada"));

        assert_ne!(a.token, b.token);
        assert_eq!(a.user_id(), "u1");
        assert!(!a.is_guest());
    }

    #[test]
    fn test_guest_profile_is_flagged() {
        let session = Session::new(UserProfile::guest("Visitor"));

        assert!(session.is_guest());
        assert!(session.user_id().starts_with("guest-"));
    }

    #[test]
    fn test_profile_roundtrips_through_json() {
        let profile = UserProfile {
            id: "u2".to_string(),
            name: "Grace".to_string(),
            avatar_url: Some("https://example.com/a.png".to_string()),
            is_guest: false,
        };

        let json = serde_json::to_string(&profile).unwrap();
        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
