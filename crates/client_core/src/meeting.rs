//! Meeting session coordination.
//!
//! Per conversation the lifecycle is None -> Active -> None, tracked as a
//! TTL-bounded record in client-local storage. Starting a meeting while one
//! is still active reuses the existing room so every participant resolves
//! to the same URL; the join-link announcement is posted only by the client
//! that created the record.

use anyhow::Result;
use chrono::{Duration, Utc};
use meeting_integration::{join_url, room_name_for_conversation, MeetingConfig};
use shared::domain::ConversationId;
use storage::{MeetingSessionRecord, Storage};
use tracing::info;

pub(crate) const JOIN_MEETING_PREFIX: &str = "Join meeting: ";
pub(crate) const MEETING_STARTED_TEXT: &str = "Meeting started";
pub(crate) const MEETING_ENDED_TEXT: &str = "Meeting ended";

/// Result of `begin`: the room URL, and whether this caller created the
/// session (and therefore owes the conversation the announcement messages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingLaunch {
    pub url: String,
    pub announce: bool,
}

pub struct MeetingCoordinator {
    sessions: Storage,
    config: MeetingConfig,
}

impl MeetingCoordinator {
    pub fn new(sessions: Storage, config: MeetingConfig) -> Self {
        Self { sessions, config }
    }

    /// Start (or rejoin) the meeting for a conversation.
    pub async fn begin(&self, conversation_id: &ConversationId) -> Result<MeetingLaunch> {
        if let Some(existing) = self.sessions.meeting_session(conversation_id).await? {
            info!(conversation_id = %conversation_id, "meeting: reusing active session");
            return Ok(MeetingLaunch {
                url: existing.url,
                announce: false,
            });
        }

        let room_name = room_name_for_conversation(conversation_id);
        let url = join_url(&self.config, &room_name);
        let record = MeetingSessionRecord {
            conversation_id: conversation_id.clone(),
            url: url.clone(),
            link_posted: false,
            expires_at: Utc::now() + Duration::seconds(self.config.session_ttl_seconds),
        };
        self.sessions.upsert_meeting_session(&record).await?;
        info!(conversation_id = %conversation_id, room = %room_name, "meeting: session created");

        Ok(MeetingLaunch {
            url,
            announce: true,
        })
    }

    pub async fn mark_link_posted(&self, conversation_id: &ConversationId) -> Result<()> {
        if let Some(mut record) = self.sessions.meeting_session(conversation_id).await? {
            record.link_posted = true;
            self.sessions.upsert_meeting_session(&record).await?;
        }
        Ok(())
    }

    /// The active session record, if any (expiry already applied).
    pub async fn session(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<MeetingSessionRecord>> {
        self.sessions.meeting_session(conversation_id).await
    }

    /// Delete the session record; returns whether one existed.
    pub async fn finish(&self, conversation_id: &ConversationId) -> Result<bool> {
        let existed = self.sessions.delete_meeting_session(conversation_id).await?;
        if existed {
            info!(conversation_id = %conversation_id, "meeting: session ended");
        }
        Ok(existed)
    }

    pub async fn is_active(&self, conversation_id: &ConversationId) -> Result<bool> {
        Ok(self.session(conversation_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn coordinator() -> MeetingCoordinator {
        let sessions = Storage::new("sqlite::memory:").await.expect("storage");
        MeetingCoordinator::new(sessions, MeetingConfig::new("https://meet.example.com"))
    }

    #[tokio::test]
    async fn begin_twice_reuses_the_same_room() {
        let coordinator = coordinator().await;
        let conversation = ConversationId::new("c1");

        let first = coordinator.begin(&conversation).await.expect("first");
        let second = coordinator.begin(&conversation).await.expect("second");

        assert_eq!(first.url, second.url);
        assert!(first.announce);
        assert!(!second.announce);
    }

    #[tokio::test]
    async fn finish_clears_the_session() {
        let coordinator = coordinator().await;
        let conversation = ConversationId::new("c2");

        coordinator.begin(&conversation).await.expect("begin");
        assert!(coordinator.is_active(&conversation).await.expect("active"));

        assert!(coordinator.finish(&conversation).await.expect("finish"));
        assert!(!coordinator.is_active(&conversation).await.expect("active"));
        assert!(!coordinator.finish(&conversation).await.expect("second finish"));
    }

    #[tokio::test]
    async fn expired_session_is_not_reused() {
        let sessions = Storage::new("sqlite::memory:").await.expect("storage");
        let mut config = MeetingConfig::new("https://meet.example.com");
        config.session_ttl_seconds = -1;
        let coordinator = MeetingCoordinator::new(sessions, config);
        let conversation = ConversationId::new("c3");

        let first = coordinator.begin(&conversation).await.expect("first");
        assert!(first.announce);

        // The record lapsed immediately, so the next start owns a fresh
        // session and must announce again.
        let second = coordinator.begin(&conversation).await.expect("second");
        assert!(second.announce);
    }

    #[tokio::test]
    async fn link_posted_flag_is_persisted() {
        let coordinator = coordinator().await;
        let conversation = ConversationId::new("c4");

        coordinator.begin(&conversation).await.expect("begin");
        coordinator
            .mark_link_posted(&conversation)
            .await
            .expect("mark");

        let record = coordinator
            .session(&conversation)
            .await
            .expect("session")
            .expect("record");
        assert!(record.link_posted);
    }

    #[tokio::test]
    async fn sessions_do_not_leak_across_conversations() {
        let coordinator = coordinator().await;
        coordinator
            .begin(&ConversationId::new("c5"))
            .await
            .expect("begin");
        assert!(!coordinator
            .is_active(&ConversationId::new("c6"))
            .await
            .expect("query"));
    }
}
