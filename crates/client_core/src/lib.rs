//! Client-resident conversation core.
//!
//! Owns the conversation list, the active conversation's timeline, presence,
//! and the meeting session coordinator, and reconciles the two producers
//! that mutate the timeline: the send pipeline's own confirmations and the
//! realtime channel's inbound events.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use meeting_integration::MeetingConfig;
use reqwest::{multipart, Client};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{AttachmentId, AttachmentKind, ConversationId, MessageId, UserId},
    envelope,
    protocol::{Attachment, Conversation, Message, MessageSummary},
};
use storage::Storage;
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

pub mod conversations;
pub mod format;
pub mod meeting;
pub mod presence;
pub mod session;
pub mod timeline;

use conversations::{ConversationStore, PreviewOutcome};
use meeting::{
    MeetingCoordinator, JOIN_MEETING_PREFIX, MEETING_ENDED_TEXT, MEETING_STARTED_TEXT,
};
use presence::PresenceTracker;
use session::{
    ConnectionConfig, ConnectionSession, ConnectionState, InboundEvent, INBOUND_QUEUE_CAPACITY,
};
use timeline::{MergeOutcome, MessageTimeline};

pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 5;
const HISTORY_PAGE_LIMIT: u32 = 100;

/// Events published to the rest of the application (rendering layer,
/// navigation badge). Snapshots are pulled through the accessor methods;
/// these only signal that something changed.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConversationsUpdated,
    TimelineUpdated {
        conversation_id: ConversationId,
    },
    /// Aggregate unread count across all conversations, for the badge.
    UnreadTotalChanged(u32),
    PresenceChanged {
        user_id: UserId,
        online: bool,
    },
    ConnectionStateChanged(ConnectionState),
    MeetingStateChanged {
        conversation_id: ConversationId,
        active: bool,
    },
    Error(String),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("message must include text or at least one attachment")]
    EmptyMessage,
    #[error("a message may carry at most {MAX_ATTACHMENTS_PER_MESSAGE} attachments, got {0}")]
    TooManyAttachments(usize),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("no conversation selected")]
    NoActiveConversation,
    #[error("send request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    fn kind_hint(&self) -> AttachmentKind {
        if self
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
        {
            AttachmentKind::Image
        } else {
            AttachmentKind::File
        }
    }
}

pub struct ChatClient {
    http: Client,
    meetings: MeetingCoordinator,
    inner: Mutex<ClientState>,
    presence: RwLock<PresenceTracker>,
    connection: Mutex<Option<ActiveConnection>>,
    events: broadcast::Sender<ClientEvent>,
}

struct ActiveConnection {
    session: ConnectionSession,
    dispatch_task: JoinHandle<()>,
}

struct ClientState {
    server_url: Option<String>,
    access_token: Option<String>,
    user_id: Option<UserId>,
    conversations: ConversationStore,
    /// Timeline of the selected conversation only; inactive conversations
    /// are represented by their list preview alone.
    timeline: MessageTimeline,
    /// Guards against stacking full reloads when several events for unknown
    /// conversations arrive in a burst.
    reload_in_flight: bool,
}

#[derive(Debug, Serialize)]
struct CreateDirectRequest<'a> {
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
struct CreateGroupRequest<'a> {
    title: &'a str,
    member_ids: &'a [UserId],
}

enum InboundRoute {
    ActiveTimeline,
    PreviewOnly,
    ScheduleReload,
    Ignored,
}

impl ChatClient {
    pub fn new(sessions: Storage, meeting: MeetingConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http: Client::new(),
            meetings: MeetingCoordinator::new(sessions, meeting),
            inner: Mutex::new(ClientState {
                server_url: None,
                access_token: None,
                user_id: None,
                conversations: ConversationStore::default(),
                timeline: MessageTimeline::default(),
                reload_in_flight: false,
            }),
            presence: RwLock::new(PresenceTracker::default()),
            connection: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Open the realtime session and load the initial conversation list.
    /// Any previous connection is torn down first.
    pub async fn connect(
        self: &Arc<Self>,
        server_url: &str,
        access_token: &str,
        user_id: UserId,
    ) -> Result<()> {
        self.disconnect().await;

        let server_url = server_url.trim_end_matches('/').to_string();
        {
            let mut guard = self.inner.lock().await;
            guard.server_url = Some(server_url.clone());
            guard.access_token = Some(access_token.to_string());
            guard.user_id = Some(user_id);
            guard.conversations = ConversationStore::default();
            guard.timeline.clear();
            guard.reload_in_flight = false;
        }

        let (inbound_tx, mut inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let connection_session = ConnectionSession::start(
            ConnectionConfig {
                server_url,
                access_token: access_token.to_string(),
            },
            inbound_tx,
        );
        let client = Arc::clone(self);
        let dispatch_task = tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                client.dispatch(event).await;
            }
        });
        {
            let mut connection = self.connection.lock().await;
            *connection = Some(ActiveConnection {
                session: connection_session,
                dispatch_task,
            });
        }

        if let Err(err) = self.load_conversations().await {
            self.disconnect().await;
            return Err(err);
        }
        Ok(())
    }

    /// Tear down the realtime session. Presence is rebuilt from scratch on
    /// the next connection, so the tracker is cleared here.
    pub async fn disconnect(&self) {
        let active = { self.connection.lock().await.take() };
        let had_connection = active.is_some();
        if let Some(active) = active {
            active.session.stop();
            active.dispatch_task.abort();
        }
        self.presence.write().await.clear();
        if had_connection {
            let _ = self.events.send(ClientEvent::ConnectionStateChanged(
                ConnectionState::Disconnected,
            ));
        }
    }

    // --- inbound dispatch ---------------------------------------------------

    async fn dispatch(self: &Arc<Self>, event: InboundEvent) {
        match event {
            InboundEvent::Message {
                conversation_id,
                payload,
            } => self.handle_inbound_message(conversation_id, &payload).await,
            InboundEvent::Presence { user_id, online } => {
                self.handle_presence(user_id, online).await;
            }
            InboundEvent::StateChanged { state, resync } => {
                if state != ConnectionState::Connected {
                    self.presence.write().await.clear();
                }
                let _ = self.events.send(ClientEvent::ConnectionStateChanged(state));
                if resync {
                    if let Err(err) = self.resync().await {
                        let _ = self.events.send(ClientEvent::Error(format!(
                            "resync after reconnect failed: {err}"
                        )));
                    }
                }
            }
            InboundEvent::ChannelError(message) => {
                let _ = self.events.send(ClientEvent::Error(message));
            }
        }
    }

    async fn handle_inbound_message(self: &Arc<Self>, conversation_id: ConversationId, payload: &Value) {
        let mut message = envelope::message_from_value(payload);
        if message.conversation_id.is_empty() {
            message.conversation_id = conversation_id.clone();
        }
        let summary = MessageSummary::of(&message);

        let (route, total_unread) = {
            let mut guard = self.inner.lock().await;
            let selected = guard.conversations.selected() == Some(&conversation_id);
            let route = if selected {
                match guard.timeline.merge_confirmed(message) {
                    MergeOutcome::Duplicate => InboundRoute::Ignored,
                    MergeOutcome::Inserted => {
                        guard
                            .conversations
                            .apply_preview(&conversation_id, summary, true);
                        InboundRoute::ActiveTimeline
                    }
                }
            } else {
                match guard
                    .conversations
                    .apply_preview(&conversation_id, summary.clone(), true)
                {
                    PreviewOutcome::Applied => {
                        info!(
                            conversation_id = %conversation_id,
                            preview = %format::preview_line(&summary),
                            "chat: conversation preview updated"
                        );
                        InboundRoute::PreviewOnly
                    }
                    PreviewOutcome::UnknownConversation => {
                        if guard.reload_in_flight {
                            InboundRoute::Ignored
                        } else {
                            guard.reload_in_flight = true;
                            InboundRoute::ScheduleReload
                        }
                    }
                }
            };
            (route, guard.conversations.total_unread())
        };

        match route {
            InboundRoute::ActiveTimeline => {
                let _ = self.events.send(ClientEvent::TimelineUpdated {
                    conversation_id: conversation_id.clone(),
                });
                let _ = self.events.send(ClientEvent::ConversationsUpdated);
                let _ = self
                    .events
                    .send(ClientEvent::UnreadTotalChanged(total_unread));
            }
            InboundRoute::PreviewOnly => {
                let _ = self.events.send(ClientEvent::ConversationsUpdated);
                let _ = self
                    .events
                    .send(ClientEvent::UnreadTotalChanged(total_unread));
            }
            InboundRoute::ScheduleReload => {
                // First message of a brand-new conversation: reload the full
                // list instead of fabricating a record with stale
                // participants.
                let client = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(err) = client.load_conversations().await {
                        let _ = client.events.send(ClientEvent::Error(format!(
                            "failed to reload conversations after event for unknown conversation: {err}"
                        )));
                    }
                });
            }
            InboundRoute::Ignored => {}
        }
    }

    async fn handle_presence(&self, user_id: UserId, online: bool) {
        let changed = self.presence.write().await.apply(user_id.clone(), online);
        if changed {
            let _ = self
                .events
                .send(ClientEvent::PresenceChanged { user_id, online });
        }
    }

    /// Refresh everything that may have drifted while the channel was down.
    async fn resync(&self) -> Result<()> {
        self.load_conversations().await?;
        let selected = { self.inner.lock().await.conversations.selected().cloned() };
        if let Some(conversation_id) = selected {
            self.load_timeline(&conversation_id).await?;
        }
        Ok(())
    }

    // --- conversation operations --------------------------------------------

    /// Replace the conversation set from the history endpoint.
    pub async fn load_conversations(&self) -> Result<()> {
        let (server_url, access_token, user_id) = self.session().await?;
        let values = match self.fetch_json_array(format!("{server_url}/conversations"), &access_token).await
        {
            Ok(values) => values,
            Err(err) => {
                self.inner.lock().await.reload_in_flight = false;
                return Err(err);
            }
        };

        let conversations: Vec<Conversation> =
            values.iter().map(envelope::conversation_from_value).collect();
        let total_unread = {
            let mut guard = self.inner.lock().await;
            guard.conversations.replace_all(conversations, &user_id);
            guard.reload_in_flight = false;
            guard.conversations.total_unread()
        };

        let _ = self.events.send(ClientEvent::ConversationsUpdated);
        let _ = self
            .events
            .send(ClientEvent::UnreadTotalChanged(total_unread));
        Ok(())
    }

    /// Make a conversation active: zero its unread count and (re)load its
    /// timeline.
    pub async fn select_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let total_unread = {
            let mut guard = self.inner.lock().await;
            if !guard.conversations.select(conversation_id) {
                return Err(anyhow!("unknown conversation {conversation_id}"));
            }
            guard.timeline.clear();
            guard.conversations.total_unread()
        };
        let _ = self.events.send(ClientEvent::ConversationsUpdated);
        let _ = self
            .events
            .send(ClientEvent::UnreadTotalChanged(total_unread));

        self.load_timeline(conversation_id).await
    }

    async fn load_timeline(&self, conversation_id: &ConversationId) -> Result<()> {
        let (server_url, access_token, _) = self.session().await?;
        let values: Vec<Value> = self
            .http
            .get(format!(
                "{server_url}/conversations/{conversation_id}/messages"
            ))
            .query(&[("limit", HISTORY_PAGE_LIMIT)])
            .bearer_auth(&access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let messages: Vec<Message> = values
            .iter()
            .map(|value| {
                let mut message = envelope::message_from_value(value);
                if message.conversation_id.is_empty() {
                    message.conversation_id = conversation_id.clone();
                }
                message
            })
            .collect();

        {
            let mut guard = self.inner.lock().await;
            // The selection may have moved while the request was in flight.
            if guard.conversations.selected() != Some(conversation_id) {
                return Ok(());
            }
            guard.timeline.replace_all(messages);
        }
        let _ = self.events.send(ClientEvent::TimelineUpdated {
            conversation_id: conversation_id.clone(),
        });
        Ok(())
    }

    pub async fn create_direct_conversation(&self, other_user_id: &UserId) -> Result<ConversationId> {
        let (server_url, access_token, _) = self.session().await?;
        let value: Value = self
            .http
            .post(format!("{server_url}/conversations/direct"))
            .bearer_auth(&access_token)
            .json(&CreateDirectRequest {
                user_id: other_user_id,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let conversation_id = conversation_id_from_response(&value)?;
        self.load_conversations().await?;
        Ok(conversation_id)
    }

    pub async fn create_group_conversation(
        &self,
        title: &str,
        member_ids: &[UserId],
    ) -> Result<ConversationId> {
        let (server_url, access_token, _) = self.session().await?;
        let value: Value = self
            .http
            .post(format!("{server_url}/conversations/group"))
            .bearer_auth(&access_token)
            .json(&CreateGroupRequest { title, member_ids })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let conversation_id = conversation_id_from_response(&value)?;
        self.load_conversations().await?;
        Ok(conversation_id)
    }

    // --- send pipeline ------------------------------------------------------

    /// Send into the active conversation.
    pub async fn send_message(
        &self,
        text: &str,
        attachments: Vec<AttachmentUpload>,
    ) -> Result<Message, SendError> {
        let conversation_id = {
            self.inner.lock().await.conversations.selected().cloned()
        }
        .ok_or(SendError::NoActiveConversation)?;
        self.send_to_conversation(&conversation_id, text, attachments)
            .await
    }

    /// The full pipeline: synthesize a pending entry, issue the multipart
    /// request, reconcile the outcome. Pending entries only exist in the
    /// active conversation's timeline; sends into other conversations (e.g.
    /// meeting announcements) skip straight to the preview update.
    async fn send_to_conversation(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        attachments: Vec<AttachmentUpload>,
    ) -> Result<Message, SendError> {
        let trimmed = text.trim();
        if trimmed.is_empty() && attachments.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        if attachments.len() > MAX_ATTACHMENTS_PER_MESSAGE {
            return Err(SendError::TooManyAttachments(attachments.len()));
        }

        let (server_url, access_token, user_id) = self
            .session()
            .await
            .map_err(|_| SendError::NotAuthenticated)?;

        let client_tag = Uuid::new_v4().to_string();

        // Build the form before touching the timeline so a malformed upload
        // cannot leave an orphaned pending entry behind.
        let mut form = multipart::Form::new().text("client_tag", client_tag.clone());
        if !trimmed.is_empty() {
            form = form.text("text", trimmed.to_string());
        }
        let mut pending_attachments = Vec::with_capacity(attachments.len());
        for upload in attachments {
            pending_attachments.push(Attachment {
                id: AttachmentId::default(),
                url: String::new(),
                file_name: Some(upload.file_name.clone()),
                kind: upload.kind_hint(),
            });
            let mut part = multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
            if let Some(mime) = upload.mime_type {
                part = part
                    .mime_str(&mime)
                    .map_err(|err| SendError::Request(format!("invalid mime type: {err}")))?;
            }
            form = form.part("files", part);
        }

        let pending = Message {
            id: MessageId::new(format!("local-{}", Uuid::new_v4())),
            conversation_id: conversation_id.clone(),
            sender_id: user_id,
            text: trimmed.to_string(),
            attachments: pending_attachments,
            created_at: Utc::now(),
            pending: true,
            read_by_all: false,
            client_tag: Some(client_tag.clone()),
        };

        let on_active_timeline = {
            let mut guard = self.inner.lock().await;
            let active = guard.conversations.selected() == Some(conversation_id);
            if active {
                guard.timeline.insert(pending);
            }
            active
        };
        if on_active_timeline {
            let _ = self.events.send(ClientEvent::TimelineUpdated {
                conversation_id: conversation_id.clone(),
            });
        }

        let url = format!("{server_url}/conversations/{conversation_id}/messages");
        match self.post_message_form(url, &access_token, form).await {
            Ok(value) => {
                let mut confirmed = envelope::message_from_value(&value);
                if confirmed.conversation_id.is_empty() {
                    confirmed.conversation_id = conversation_id.clone();
                }
                if confirmed.client_tag.is_none() {
                    confirmed.client_tag = Some(client_tag.clone());
                }
                let summary = MessageSummary::of(&confirmed);

                let total_unread = {
                    let mut guard = self.inner.lock().await;
                    if guard.conversations.selected() == Some(conversation_id) {
                        // The temporary entry goes unconditionally; the
                        // confirmed message merges by id (the realtime echo
                        // may already have inserted it).
                        guard.timeline.remove_pending(&client_tag);
                        guard.timeline.merge_confirmed(confirmed.clone());
                    }
                    guard
                        .conversations
                        .apply_preview(conversation_id, summary, false);
                    guard.conversations.total_unread()
                };

                if on_active_timeline {
                    let _ = self.events.send(ClientEvent::TimelineUpdated {
                        conversation_id: conversation_id.clone(),
                    });
                }
                let _ = self.events.send(ClientEvent::ConversationsUpdated);
                let _ = self
                    .events
                    .send(ClientEvent::UnreadTotalChanged(total_unread));
                Ok(confirmed)
            }
            Err(err) => {
                {
                    let mut guard = self.inner.lock().await;
                    guard.timeline.remove_pending(&client_tag);
                }
                if on_active_timeline {
                    let _ = self.events.send(ClientEvent::TimelineUpdated {
                        conversation_id: conversation_id.clone(),
                    });
                }
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("failed to send message: {err}")));
                Err(SendError::Request(err.to_string()))
            }
        }
    }

    async fn post_message_form(
        &self,
        url: String,
        access_token: &str,
        form: multipart::Form,
    ) -> reqwest::Result<Value> {
        self.http
            .post(url)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    // --- meetings -----------------------------------------------------------

    /// Start (or rejoin) the meeting for a conversation and return its URL.
    /// Announcement messages go through the ordinary send pipeline; their
    /// failure never blocks the meeting itself.
    pub async fn start_meeting(&self, conversation_id: &ConversationId) -> Result<String> {
        let launch = self.meetings.begin(conversation_id).await?;
        if launch.announce {
            let join_text = format!("{JOIN_MEETING_PREFIX}{}", launch.url);
            for text in [join_text.as_str(), MEETING_STARTED_TEXT] {
                if let Err(err) = self
                    .send_to_conversation(conversation_id, text, Vec::new())
                    .await
                {
                    warn!(
                        conversation_id = %conversation_id,
                        "meeting: announcement not delivered: {err}"
                    );
                }
            }
            self.meetings.mark_link_posted(conversation_id).await?;
        }
        let _ = self.events.send(ClientEvent::MeetingStateChanged {
            conversation_id: conversation_id.clone(),
            active: true,
        });
        Ok(launch.url)
    }

    /// End the meeting for a conversation. Without an active session this is
    /// a no-op: no message, no error.
    pub async fn end_meeting(&self, conversation_id: &ConversationId) -> Result<()> {
        let Some(record) = self.meetings.session(conversation_id).await? else {
            return Ok(());
        };

        if let Err(err) = self
            .send_to_conversation(conversation_id, MEETING_ENDED_TEXT, Vec::new())
            .await
        {
            warn!(
                conversation_id = %conversation_id,
                "meeting: end announcement not delivered: {err}"
            );
        }
        self.meetings.finish(conversation_id).await?;

        // Retract the join link locally so a dead room is not left clickable
        // in the active timeline.
        let retracted = {
            let mut guard = self.inner.lock().await;
            if guard.conversations.selected() == Some(conversation_id) {
                let room_url = record.url.trim_end_matches('/').to_string();
                guard.timeline.retract(|message| {
                    message.text.starts_with(JOIN_MEETING_PREFIX)
                        && format::extract_links(&message.text)
                            .iter()
                            .any(|link| link.as_str().trim_end_matches('/') == room_url)
                })
            } else {
                0
            }
        };
        if retracted > 0 {
            let _ = self.events.send(ClientEvent::TimelineUpdated {
                conversation_id: conversation_id.clone(),
            });
        }

        let _ = self.events.send(ClientEvent::MeetingStateChanged {
            conversation_id: conversation_id.clone(),
            active: false,
        });
        Ok(())
    }

    pub async fn meeting_active(&self, conversation_id: &ConversationId) -> Result<bool> {
        self.meetings.is_active(conversation_id).await
    }

    // --- snapshots ----------------------------------------------------------

    pub async fn conversations_snapshot(&self) -> Vec<Conversation> {
        self.inner.lock().await.conversations.list().to_vec()
    }

    pub async fn active_conversation(&self) -> Option<ConversationId> {
        self.inner.lock().await.conversations.selected().cloned()
    }

    pub async fn timeline_snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.timeline.messages().to_vec()
    }

    pub async fn total_unread(&self) -> u32 {
        self.inner.lock().await.conversations.total_unread()
    }

    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.presence.read().await.is_online(user_id)
    }

    // --- helpers ------------------------------------------------------------

    async fn session(&self) -> Result<(String, String, UserId)> {
        let guard = self.inner.lock().await;
        let server_url = guard
            .server_url
            .clone()
            .ok_or_else(|| anyhow!("not signed in: missing server_url"))?;
        let access_token = guard
            .access_token
            .clone()
            .ok_or_else(|| anyhow!("not signed in: missing access token"))?;
        let user_id = guard
            .user_id
            .clone()
            .ok_or_else(|| anyhow!("not signed in: missing user id"))?;
        Ok((server_url, access_token, user_id))
    }

    async fn fetch_json_array(&self, url: String, access_token: &str) -> Result<Vec<Value>> {
        let values: Vec<Value> = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(values)
    }
}

fn conversation_id_from_response(value: &Value) -> Result<ConversationId> {
    let id = ["id", "_id", "conversationId", "conversation_id"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default();
    if id.is_empty() {
        return Err(anyhow!("create-conversation response carried no id"));
    }
    Ok(ConversationId::new(id))
}

/// The surface the rest of the application talks to.
#[async_trait]
pub trait ChatHandle: Send + Sync {
    async fn connect(&self, server_url: &str, access_token: &str, user_id: UserId) -> Result<()>;
    async fn disconnect(&self);
    async fn load_conversations(&self) -> Result<()>;
    async fn select_conversation(&self, conversation_id: &ConversationId) -> Result<()>;
    async fn send_message(
        &self,
        text: &str,
        attachments: Vec<AttachmentUpload>,
    ) -> Result<Message, SendError>;
    async fn start_meeting(&self, conversation_id: &ConversationId) -> Result<String>;
    async fn end_meeting(&self, conversation_id: &ConversationId) -> Result<()>;
    async fn meeting_active(&self, conversation_id: &ConversationId) -> Result<bool>;
    async fn total_unread(&self) -> u32;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

#[async_trait]
impl ChatHandle for Arc<ChatClient> {
    async fn connect(&self, server_url: &str, access_token: &str, user_id: UserId) -> Result<()> {
        ChatClient::connect(self, server_url, access_token, user_id).await
    }

    async fn disconnect(&self) {
        ChatClient::disconnect(self).await
    }

    async fn load_conversations(&self) -> Result<()> {
        ChatClient::load_conversations(self).await
    }

    async fn select_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        ChatClient::select_conversation(self, conversation_id).await
    }

    async fn send_message(
        &self,
        text: &str,
        attachments: Vec<AttachmentUpload>,
    ) -> Result<Message, SendError> {
        ChatClient::send_message(self, text, attachments).await
    }

    async fn start_meeting(&self, conversation_id: &ConversationId) -> Result<String> {
        ChatClient::start_meeting(self, conversation_id).await
    }

    async fn end_meeting(&self, conversation_id: &ConversationId) -> Result<()> {
        ChatClient::end_meeting(self, conversation_id).await
    }

    async fn meeting_active(&self, conversation_id: &ConversationId) -> Result<bool> {
        ChatClient::meeting_active(self, conversation_id).await
    }

    async fn total_unread(&self) -> u32 {
        ChatClient::total_unread(self).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        ChatClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
