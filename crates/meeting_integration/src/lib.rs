//! Boundary to the external video-call provider.
//!
//! The conversation core never talks to the provider itself; it only needs
//! a room identifier all participants can independently agree on, and the
//! join URL to post into the conversation. Room names are derived
//! deterministically from the conversation id so two clients that start a
//! meeting for the same conversation resolve to the same room.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

use shared::domain::ConversationId;

/// Bytes of the conversation-id digest folded into the room name. 9 bytes
/// encode to 12 url-safe characters.
const ROOM_DIGEST_LEN: usize = 9;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone)]
pub struct MeetingConfig {
    /// Provider base URL, e.g. `https://meet.example.com`.
    pub base_url: String,
    /// How long a started meeting stays joinable before the client-side
    /// record lapses.
    pub session_ttl_seconds: i64,
}

impl MeetingConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }
}

pub fn room_name_for_conversation(conversation_id: &ConversationId) -> String {
    let digest = Sha256::digest(conversation_id.0.as_bytes());
    format!("meet-{}", URL_SAFE_NO_PAD.encode(&digest[..ROOM_DIGEST_LEN]))
}

pub fn join_url(config: &MeetingConfig, room_name: &str) -> String {
    format!("{}/{}", config.base_url.trim_end_matches('/'), room_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_name_is_deterministic() {
        let id = ConversationId::new("conversation-42");
        assert_eq!(room_name_for_conversation(&id), room_name_for_conversation(&id));
    }

    #[test]
    fn distinct_conversations_get_distinct_rooms() {
        let a = room_name_for_conversation(&ConversationId::new("c1"));
        let b = room_name_for_conversation(&ConversationId::new("c2"));
        assert_ne!(a, b);
    }

    #[test]
    fn room_name_is_url_safe() {
        let room = room_name_for_conversation(&ConversationId::new("weird/id?&="));
        assert!(room.starts_with("meet-"));
        assert!(room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn join_url_tolerates_trailing_slash_on_base() {
        let with = MeetingConfig::new("https://meet.example.com/");
        let without = MeetingConfig::new("https://meet.example.com");
        assert_eq!(join_url(&with, "meet-abc"), join_url(&without, "meet-abc"));
        assert_eq!(join_url(&without, "meet-abc"), "https://meet.example.com/meet-abc");
    }
}
