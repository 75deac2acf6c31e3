use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        AttachmentId, AttachmentKind, ConversationId, ConversationKind, MessageId, PresenceStatus,
        UserId,
    },
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    /// Locally created and not yet acknowledged by the server.
    pub pending: bool,
    /// Only ever set from server-confirmed data, never inferred locally.
    pub read_by_all: bool,
    /// Client-generated correlation id attached to every send; primary key
    /// for reconciling a pending entry against its server echo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_tag: Option<String>,
}

impl Message {
    /// Content fallback used to reconcile a pending entry when the inbound
    /// echo carries no correlation tag.
    pub fn content_matches(&self, other: &Message) -> bool {
        self.sender_id == other.sender_id && self.text == other.text
    }
}

/// Last-message summary carried on a conversation for list previews, so the
/// list can render without loading the full timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub text: String,
    pub sender_id: UserId,
    pub sent_at: DateTime<Utc>,
    pub attachment_count: usize,
}

impl MessageSummary {
    pub fn of(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            text: message.text.clone(),
            sender_id: message.sender_id.clone(),
            sent_at: message.created_at,
            attachment_count: message.attachments.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    pub title: String,
    pub participants: Vec<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageSummary>,
    pub unread_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user_id)
    }

    /// Title shown in the conversation list. Group conversations carry their
    /// own title; direct conversations borrow the other participant's name.
    pub fn display_title(&self, self_id: &UserId) -> String {
        match self.kind {
            ConversationKind::Group => self.title.clone(),
            ConversationKind::Direct => self
                .participants
                .iter()
                .find(|p| &p.user_id != self_id)
                .map(|p| p.display_name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| self.title.clone()),
        }
    }
}

/// Events pushed by the server over the realtime channel. The message body
/// is forwarded as raw JSON and normalized by the envelope module, so schema
/// drift on the channel cannot make deserialization of the frame fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Message {
        conversation_id: ConversationId,
        message: serde_json::Value,
    },
    Presence {
        user_id: UserId,
        #[serde(default)]
        status: PresenceStatus,
    },
    Error(ApiError),
}
