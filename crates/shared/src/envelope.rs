//! Tolerant normalization of server payloads.
//!
//! The REST history endpoint and the realtime channel are independent
//! producers, and neither is allowed to crash the client on schema drift.
//! Every function here is total: malformed input degrades to an
//! empty-but-valid record instead of an error. Field lookup accepts both
//! camelCase and snake_case spellings because the two producers have
//! historically disagreed.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    domain::{AttachmentId, AttachmentKind, ConversationId, ConversationKind, MessageId, UserId},
    protocol::{Attachment, Conversation, Message, MessageSummary, Participant},
};

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".svg"];

/// Normalize an arbitrary server-shaped object into a `Message`. Never
/// fails; missing fields default to empty string / empty list / now.
pub fn message_from_value(value: &Value) -> Message {
    Message {
        id: MessageId::new(string_field(value, &["id", "_id", "messageId", "message_id"])),
        conversation_id: ConversationId::new(string_field(
            value,
            &["conversationId", "conversation_id", "conversation"],
        )),
        sender_id: UserId::new(actor_field(value, &["senderId", "sender_id", "sender", "from"])),
        text: string_field(value, &["text", "body", "content"]),
        attachments: attachments_field(value),
        created_at: timestamp_field(value, &["createdAt", "created_at", "sentAt", "sent_at"]),
        pending: false,
        read_by_all: bool_field(value, &["readByAll", "read_by_all", "seen"]),
        client_tag: optional_string_field(value, &["clientTag", "client_tag"]),
    }
}

/// Normalize an arbitrary server-shaped object into a `Conversation`.
/// Participants without an id are dropped; an unrecognized kind defaults
/// to direct.
pub fn conversation_from_value(value: &Value) -> Conversation {
    let last_message = value
        .get("lastMessage")
        .or_else(|| value.get("last_message"))
        .filter(|v| v.is_object())
        .map(|v| MessageSummary::of(&message_from_value(v)));

    Conversation {
        id: ConversationId::new(string_field(value, &["id", "_id", "conversationId"])),
        kind: kind_field(value),
        title: string_field(value, &["title", "name", "groupName", "group_name"]),
        participants: participants_field(value),
        last_message,
        unread_count: value
            .get("unreadCount")
            .or_else(|| value.get("unread_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        updated_at: timestamp_field(value, &["updatedAt", "updated_at", "lastActivity"]),
    }
}

fn attachments_field(value: &Value) -> Vec<Attachment> {
    let Some(entries) = value.get("attachments").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries.iter().filter_map(attachment_from_value).collect()
}

/// An attachment missing both its id and its url identifies nothing and is
/// filtered out.
fn attachment_from_value(value: &Value) -> Option<Attachment> {
    let id = string_field(value, &["id", "_id", "attachmentId", "attachment_id"]);
    let url = string_field(value, &["url", "fileUrl", "file_url", "path"]);
    if id.is_empty() && url.is_empty() {
        return None;
    }

    let file_name = optional_string_field(value, &["fileName", "file_name", "filename", "name"]);
    Some(Attachment {
        kind: attachment_kind(value, &url, file_name.as_deref()),
        id: AttachmentId::new(id),
        url,
        file_name,
    })
}

fn attachment_kind(value: &Value, url: &str, file_name: Option<&str>) -> AttachmentKind {
    let declared = string_field(value, &["type", "kind"]);
    if declared.eq_ignore_ascii_case("image") {
        return AttachmentKind::Image;
    }
    if !declared.is_empty() {
        return AttachmentKind::File;
    }
    let probe = file_name.unwrap_or(url).to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| probe.ends_with(ext)) {
        AttachmentKind::Image
    } else {
        AttachmentKind::File
    }
}

fn participants_field(value: &Value) -> Vec<Participant> {
    let Some(entries) = value
        .get("participants")
        .or_else(|| value.get("members"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut participants: Vec<Participant> = Vec::with_capacity(entries.len());
    for entry in entries {
        let user_id = match entry {
            Value::String(raw) => raw.clone(),
            _ => actor_field(entry, &["userId", "user_id", "id", "_id"]),
        };
        if user_id.is_empty() {
            continue;
        }
        if participants.iter().any(|p| p.user_id.0 == user_id) {
            continue;
        }
        participants.push(Participant {
            user_id: UserId::new(user_id),
            display_name: string_field(
                entry,
                &["displayName", "display_name", "name", "fullName", "full_name"],
            ),
        });
    }
    participants
}

fn kind_field(value: &Value) -> ConversationKind {
    let declared = string_field(value, &["kind", "type"]);
    if declared.eq_ignore_ascii_case("group") {
        return ConversationKind::Group;
    }
    if declared.is_empty()
        && value
            .get("isGroup")
            .or_else(|| value.get("is_group"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    {
        return ConversationKind::Group;
    }
    ConversationKind::Direct
}

fn string_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(scalar_as_string)
        .unwrap_or_default()
}

fn optional_string_field(value: &Value, keys: &[&str]) -> Option<String> {
    let found = string_field(value, keys);
    (!found.is_empty()).then_some(found)
}

/// Sender fields arrive either as a bare id string or as an embedded actor
/// object; accept both.
fn actor_field(value: &Value, keys: &[&str]) -> String {
    for key in keys {
        match value.get(key) {
            Some(Value::Object(_)) => {
                let nested = string_field(&value[*key], &["id", "_id", "userId", "user_id"]);
                if !nested.is_empty() {
                    return nested;
                }
            }
            Some(other) => {
                if let Some(raw) = scalar_as_string(other) {
                    return raw;
                }
            }
            None => {}
        }
    }
    String::new()
}

fn scalar_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn bool_field(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(Value::as_bool)
        .unwrap_or(false)
}

fn timestamp_field(value: &Value, keys: &[&str]) -> DateTime<Utc> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .filter_map(Value::as_str)
        .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
