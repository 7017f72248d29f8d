use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event envelope wrapping all domain events published to RabbitMQ.
///
/// Routing key format: `ftalk.{domain}.{entity}.{action}`
/// Example: `ftalk.chat.session.matched`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const CHAT_SESSION_CREATED: &str = "ftalk.chat.session.created";
    pub const CHAT_SESSION_MATCHED: &str = "ftalk.chat.session.matched";
    pub const CHAT_SESSION_SKIPPED: &str = "ftalk.chat.session.skipped";
    pub const CHAT_SESSION_ENDED: &str = "ftalk.chat.session.ended";
    pub const CHAT_REPORT_CREATED: &str = "ftalk.chat.report.created";
    pub const CHAT_BLOCK_CREATED: &str = "ftalk.chat.block.created";
    pub const CHAT_CALL_REQUESTED: &str = "ftalk.chat.call.requested";
    pub const CHAT_CALL_RESPONDED: &str = "ftalk.chat.call.responded";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SessionMatched {
        pub match_id: Uuid,
        pub session_a_id: Uuid,
        pub session_b_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        pub compatibility_score: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SessionSkipped {
        pub session_id: Uuid,
        pub partner_session_id: Option<Uuid>,
        pub skipped_by: Uuid,
        pub reason: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SessionEnded {
        pub session_id: Uuid,
        pub ended_by: Uuid,
        pub partner_id: Option<Uuid>,
        pub duration_secs: i64,
        pub end_reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub session_id: Uuid,
        pub reporter_id: Uuid,
        pub reported_id: Uuid,
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockCreated {
        pub block_id: Uuid,
        pub session_id: Uuid,
        pub blocker_id: Uuid,
        pub blocked_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallRequested {
        pub call_id: Uuid,
        pub chat_session_id: Uuid,
        pub caller_id: Uuid,
        pub callee_id: Uuid,
        pub call_type: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallResponded {
        pub call_id: Uuid,
        pub chat_session_id: Uuid,
        pub caller_id: Uuid,
        pub callee_id: Uuid,
        pub accepted: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_json() {
        let event = Event::new(
            "ftalk-matching",
            routing_keys::CHAT_SESSION_ENDED,
            payloads::SessionEnded {
                session_id: Uuid::new_v4(),
                ended_by: Uuid::new_v4(),
                partner_id: None,
                duration_secs: 73,
                end_reason: "user_ended".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "ftalk-matching");
        assert_eq!(json["event_type"], "ftalk.chat.session.ended");
        assert_eq!(json["data"]["duration_secs"], 73);
        assert!(json["user_id"].is_null());
    }

    #[test]
    fn with_user_stamps_the_actor() {
        let user = Uuid::new_v4();
        let event = Event::new("ftalk-matching", "ftalk.chat.session.created", ()).with_user(user);
        assert_eq!(event.user_id, Some(user));
    }
}
