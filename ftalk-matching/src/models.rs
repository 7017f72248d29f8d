use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    call_sessions, chat_blocks, chat_matches, chat_messages, chat_preferences, chat_reports,
    chat_sessions,
};

// --- Session lifecycle states ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Matched,
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Matched => "matched",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    /// States in which a user is considered to already have a session.
    pub const LIVE: [&'static str; 3] = ["waiting", "matched", "active"];
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "matched" => Ok(Self::Matched),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            _ => Err(format!("unknown session status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Text,
    Audio,
    Video,
}

impl ChatType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl std::str::FromStr for ChatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(format!("unknown chat type: {s}")),
        }
    }
}

// --- ChatSession ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_sessions)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
    pub status: String,
    pub matched_user_id: Option<Uuid>,
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    pub fn status(&self) -> SessionStatus {
        self.status.parse().unwrap_or(SessionStatus::Ended)
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.matched_user_id == Some(user_id)
    }

    /// The other participant, if this session is currently paired.
    pub fn partner_id(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_id == user_id {
            self.matched_user_id
        } else if self.matched_user_id == Some(user_id) {
            Some(self.user_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_sessions)]
pub struct NewChatSession {
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
    pub status: String,
}

// --- ChatMessage ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_messages)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage {
    pub session_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
}

// --- ChatMatch ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_matches)]
pub struct ChatMatch {
    pub id: Uuid,
    pub session_a_id: Uuid,
    pub session_b_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub compatibility_score: f64,
    pub shared_interests: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_matches)]
pub struct NewChatMatch {
    pub session_a_id: Uuid,
    pub session_b_id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub compatibility_score: f64,
    pub shared_interests: Vec<String>,
}

// --- ChatPreferences ---

#[derive(Debug, Queryable, Serialize, Clone)]
#[diesel(table_name = chat_preferences)]
pub struct ChatPreferences {
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
    pub auto_skip: bool,
    pub skip_delay_secs: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = chat_preferences)]
pub struct UpsertChatPreferences {
    pub user_id: Uuid,
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub chat_type: String,
    pub auto_skip: bool,
    pub skip_delay_secs: i32,
    pub updated_at: DateTime<Utc>,
}

// --- ChatReport ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_reports)]
pub struct ChatReport {
    pub id: Uuid,
    pub session_id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_reports)]
pub struct NewChatReport {
    pub session_id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
}

// --- ChatBlock ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_blocks)]
pub struct ChatBlock {
    pub id: Uuid,
    pub session_id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_blocks)]
pub struct NewChatBlock {
    pub session_id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub reason: Option<String>,
}

// --- CallSession ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Active,
    Ended,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = call_sessions)]
pub struct CallSession {
    pub id: Uuid,
    pub chat_session_id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub call_type: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = call_sessions)]
pub struct NewCallSession {
    pub chat_session_id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub call_type: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user: Uuid, partner: Option<Uuid>, status: &str) -> ChatSession {
        ChatSession {
            id: Uuid::new_v4(),
            user_id: user,
            interests: vec!["Music".into()],
            age_min: None,
            age_max: None,
            location: None,
            gender: None,
            chat_type: "text".into(),
            status: status.into(),
            matched_user_id: partner,
            matched_at: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    #[test]
    fn status_round_trips() {
        for status in [
            SessionStatus::Waiting,
            SessionStatus::Matched,
            SessionStatus::Active,
            SessionStatus::Ended,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn partner_lookup_is_reciprocal() {
        let owner = Uuid::new_v4();
        let partner = Uuid::new_v4();
        let s = session(owner, Some(partner), "matched");

        assert_eq!(s.partner_id(owner), Some(partner));
        assert_eq!(s.partner_id(partner), Some(owner));
        assert_eq!(s.partner_id(Uuid::new_v4()), None);
    }

    #[test]
    fn participant_check_covers_both_sides() {
        let owner = Uuid::new_v4();
        let partner = Uuid::new_v4();
        let s = session(owner, Some(partner), "active");

        assert!(s.is_participant(owner));
        assert!(s.is_participant(partner));
        assert!(!s.is_participant(Uuid::new_v4()));
    }
}
