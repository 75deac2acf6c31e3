//! The set of conversations visible to the current user.
//!
//! Kept sorted by `updated_at` descending; the front of the list is the most
//! recently active conversation. Unread counts live here, and every mutation
//! path reports the aggregate so the navigation badge stays correct without
//! owning any conversation logic.

use shared::{
    domain::{ConversationId, UserId},
    protocol::{Conversation, MessageSummary},
};

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Applied,
    /// First message of a brand-new conversation; the caller must schedule a
    /// full reload instead of fabricating a record with stale participants.
    UnknownConversation,
}

impl ConversationStore {
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == conversation_id)
    }

    pub fn position(&self, conversation_id: &ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| &c.id == conversation_id)
    }

    pub fn selected(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Full replacement from the history endpoint. Conversations that do not
    /// include the current user are dropped defensively. The current
    /// selection survives when still present; otherwise the most recent
    /// conversation becomes selected.
    pub fn replace_all(&mut self, incoming: Vec<Conversation>, self_id: &UserId) {
        let mut kept: Vec<Conversation> = incoming
            .into_iter()
            .filter(|c| !c.id.is_empty() && c.includes(self_id))
            .collect();
        kept.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.conversations = kept;

        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|id| self.position(id).is_some());
        if !still_present {
            self.selected = self.conversations.first().map(|c| c.id.clone());
        }
    }

    /// Apply a message preview: refresh `last_message`/`updated_at` and move
    /// the conversation to the front. With `increment_unread` (inbound
    /// events) the unread counter goes up unless the conversation is
    /// currently selected, where it stays zero; the sender's own
    /// confirmations pass false.
    pub fn apply_preview(
        &mut self,
        conversation_id: &ConversationId,
        summary: MessageSummary,
        increment_unread: bool,
    ) -> PreviewOutcome {
        let Some(index) = self.position(conversation_id) else {
            return PreviewOutcome::UnknownConversation;
        };

        let mut conversation = self.conversations.remove(index);
        conversation.updated_at = summary.sent_at.max(conversation.updated_at);
        conversation.last_message = Some(summary);
        if increment_unread && self.selected.as_ref() != Some(conversation_id) {
            conversation.unread_count = conversation.unread_count.saturating_add(1);
        }
        self.conversations.insert(0, conversation);
        PreviewOutcome::Applied
    }

    /// Make a conversation the active selection and zero its unread count.
    /// Returns false when the conversation is unknown.
    pub fn select(&mut self, conversation_id: &ConversationId) -> bool {
        let Some(index) = self.position(conversation_id) else {
            return false;
        };
        self.selected = Some(conversation_id.clone());
        self.conversations[index].unread_count = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::{
        domain::{ConversationKind, MessageId},
        protocol::Participant,
    };

    fn participant(id: &str) -> Participant {
        Participant {
            user_id: UserId::new(id),
            display_name: id.to_uppercase(),
        }
    }

    fn conversation(id: &str, minutes_ago: i64, members: &[&str]) -> Conversation {
        Conversation {
            id: ConversationId::new(id),
            kind: ConversationKind::Group,
            title: format!("room {id}"),
            participants: members.iter().map(|m| participant(m)).collect(),
            last_message: None,
            unread_count: 0,
            updated_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn summary(message_id: &str, sender: &str) -> MessageSummary {
        MessageSummary {
            id: MessageId::new(message_id),
            text: "ping".to_string(),
            sender_id: UserId::new(sender),
            sent_at: Utc::now(),
            attachment_count: 0,
        }
    }

    fn me() -> UserId {
        UserId::new("me")
    }

    #[test]
    fn conversations_without_current_user_are_filtered() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![
                conversation("mine", 5, &["me", "u2"]),
                conversation("foreign", 1, &["u2", "u3"]),
            ],
            &me(),
        );
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].id.0, "mine");
    }

    #[test]
    fn reload_sorts_by_recency_and_selects_most_recent() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![
                conversation("old", 60, &["me"]),
                conversation("recent", 1, &["me"]),
                conversation("middle", 30, &["me"]),
            ],
            &me(),
        );
        let ids: Vec<_> = store.list().iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, ["recent", "middle", "old"]);
        assert_eq!(store.selected().unwrap().0, "recent");
    }

    #[test]
    fn reload_preserves_existing_selection_when_still_present() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![conversation("a", 10, &["me"]), conversation("b", 1, &["me"])],
            &me(),
        );
        assert!(store.select(&ConversationId::new("a")));

        store.replace_all(
            vec![conversation("a", 10, &["me"]), conversation("b", 1, &["me"])],
            &me(),
        );
        assert_eq!(store.selected().unwrap().0, "a");
    }

    #[test]
    fn selecting_a_conversation_zeroes_its_unread_count() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![conversation("a", 10, &["me"]), conversation("b", 1, &["me"])],
            &me(),
        );
        store.apply_preview(&ConversationId::new("a"), summary("m1", "u2"), true);
        store.apply_preview(&ConversationId::new("a"), summary("m2", "u2"), true);
        assert_eq!(store.get(&ConversationId::new("a")).unwrap().unread_count, 2);

        assert!(store.select(&ConversationId::new("a")));
        assert_eq!(store.get(&ConversationId::new("a")).unwrap().unread_count, 0);
        assert_eq!(store.total_unread(), 0);
    }

    #[test]
    fn preview_for_unselected_conversation_increments_and_moves_to_front() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![conversation("a", 1, &["me"]), conversation("b", 10, &["me"])],
            &me(),
        );
        assert!(store.select(&ConversationId::new("a")));

        let outcome = store.apply_preview(&ConversationId::new("b"), summary("m1", "u2"), true);
        assert_eq!(outcome, PreviewOutcome::Applied);

        let b = ConversationId::new("b");
        assert_eq!(store.position(&b), Some(0));
        let b = store.get(&b).unwrap();
        assert_eq!(b.unread_count, 1);
        assert_eq!(b.last_message.as_ref().unwrap().id.0, "m1");
        assert_eq!(store.total_unread(), 1);
    }

    #[test]
    fn preview_for_selected_conversation_keeps_unread_at_zero() {
        let mut store = ConversationStore::default();
        store.replace_all(vec![conversation("a", 1, &["me"])], &me());
        assert!(store.select(&ConversationId::new("a")));

        store.apply_preview(&ConversationId::new("a"), summary("m1", "u2"), true);
        assert_eq!(store.get(&ConversationId::new("a")).unwrap().unread_count, 0);
    }

    #[test]
    fn own_send_preview_never_increments_unread() {
        let mut store = ConversationStore::default();
        store.replace_all(
            vec![conversation("a", 1, &["me"]), conversation("b", 10, &["me"])],
            &me(),
        );
        assert!(store.select(&ConversationId::new("a")));

        store.apply_preview(&ConversationId::new("b"), summary("m1", "me"), false);
        assert_eq!(store.get(&ConversationId::new("b")).unwrap().unread_count, 0);
        assert_eq!(store.position(&ConversationId::new("b")), Some(0));
    }

    #[test]
    fn preview_for_unknown_conversation_requests_reload() {
        let mut store = ConversationStore::default();
        store.replace_all(vec![conversation("a", 1, &["me"])], &me());

        let outcome = store.apply_preview(&ConversationId::new("ghost"), summary("m1", "u2"), true);
        assert_eq!(outcome, PreviewOutcome::UnknownConversation);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn selecting_unknown_conversation_is_rejected() {
        let mut store = ConversationStore::default();
        store.replace_all(vec![conversation("a", 1, &["me"])], &me());
        assert!(!store.select(&ConversationId::new("ghost")));
        assert_eq!(store.selected().unwrap().0, "a");
    }
}
