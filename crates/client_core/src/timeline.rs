//! Ordered message sequence for the active conversation.
//!
//! Two producers mutate a timeline: the send pipeline (pending entries and
//! their confirmations) and the realtime dispatch (server echoes). Display
//! order is always ascending `created_at`; the merge rules below keep the
//! two producers from ever double-inserting the same logical message.

use shared::protocol::Message;

#[derive(Debug, Default)]
pub struct MessageTimeline {
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// A message with this id was already present; the event was dropped.
    Duplicate,
}

impl MessageTimeline {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replace the whole timeline from a history load.
    pub fn replace_all(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.created_at);
        self.messages = messages;
    }

    /// Insert keeping ascending `created_at`; equal timestamps keep arrival
    /// order.
    pub fn insert(&mut self, message: Message) {
        let position = self
            .messages
            .partition_point(|existing| existing.created_at <= message.created_at);
        self.messages.insert(position, message);
    }

    /// Merge a server-confirmed message. Idempotent on message id; before
    /// inserting, removes at most one pending entry reconciled by
    /// correlation tag, or by `(sender, text)` when the echo carries no tag.
    pub fn merge_confirmed(&mut self, message: Message) -> MergeOutcome {
        if self.messages.iter().any(|m| m.id == message.id) {
            return MergeOutcome::Duplicate;
        }

        let reconciled = match message.client_tag.as_deref() {
            Some(tag) => self
                .messages
                .iter()
                .position(|m| m.pending && m.client_tag.as_deref() == Some(tag)),
            None => None,
        };
        let reconciled = reconciled.or_else(|| {
            self.messages
                .iter()
                .position(|m| m.pending && m.content_matches(&message))
        });
        if let Some(index) = reconciled {
            self.messages.remove(index);
        }

        self.insert(message);
        MergeOutcome::Inserted
    }

    /// Remove a pending entry by its correlation tag (send failed, or the
    /// confirmation arrived out of band).
    pub fn remove_pending(&mut self, client_tag: &str) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .position(|m| m.pending && m.client_tag.as_deref() == Some(client_tag))?;
        Some(self.messages.remove(index))
    }

    /// Remove every message matching the predicate; returns how many were
    /// dropped. Used to retract system messages (e.g. a stale meeting link).
    pub fn retract<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Message) -> bool,
    {
        let before = self.messages.len();
        self.messages.retain(|m| !predicate(m));
        before - self.messages.len()
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }
}
