use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled meeting as projected from the store. Read-only from the
/// engine's perspective; only the store creates or mutates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub owner_id: String,
    pub participant_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Whether the user owns the meeting or is listed as a participant.
    pub fn involves(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.participant_ids.iter().any(|p| p == user_id)
    }
}

/// Input for creating a meeting through a store's write API. The store
/// assigns the id and creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub owner_id: String,
    pub participant_ids: Vec<String>,
}

impl NewMeeting {
    pub fn new<S: Into<String>>(title: S, starts_at: DateTime<Utc>, owner_id: S) -> Self {
        Self {
            title: title.into(),
            description: None,
            starts_at,
            ends_at: None,
            location: None,
            owner_id: owner_id.into(),
            participant_ids: Vec::new(),
        }
    }

    pub fn into_meeting(self) -> Meeting {
        Meeting {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: self.location,
            owner_id: self.owner_id,
            participant_ids: self.participant_ids,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_meeting(owner: &str, participants: Vec<&str>) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: "m-1".to_string(),
            title: "Weekly Sync".to_string(),
            description: None,
            starts_at: now + Duration::minutes(30),
            ends_at: Some(now + Duration::minutes(90)),
            location: None,
            owner_id: owner.to_string(),
            participant_ids: participants.into_iter().map(String::from).collect(),
            created_at: now,
        }
    }

    #[test]
    fn test_involves_owner_and_participants() {
        let meeting = sample_meeting("u1", vec!["u2", "u3"]);

        assert!(meeting.involves("u1"));
        assert!(meeting.involves("u2"));
        assert!(meeting.involves("u3"));
        assert!(!meeting.involves("u4"));
    }

    #[test]
    fn test_new_meeting_into_meeting_assigns_identity() {
        let starts = Utc::now() + Duration::hours(2);
        let draft = NewMeeting::new("Planning", starts, "u7");
        let meeting = draft.into_meeting();

        assert!(!meeting.id.is_empty());
        assert_eq!(meeting.title, "Planning");
        assert_eq!(meeting.owner_id, "u7");
        assert_eq!(meeting.starts_at, starts);
        assert!(meeting.participant_ids.is_empty());
    }
}
