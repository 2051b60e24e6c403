use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Feature, FeatureHandler};
use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel, Role};

pub type SessionId = Uuid;

/// Message history of one session, always starting with the system prompt
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages after the system prompt
    pub fn turns(&self) -> &[ChatMessage] {
        match self.messages.first() {
            Some(first) if first.role == Role::System => &self.messages[1..],
            _ => &self.messages,
        }
    }

    /// Drop the oldest turns beyond `max_turns`, keeping the system prompt.
    ///
    /// Turns go in user/assistant pairs so the history never opens with a reply.
    fn trim(&mut self, max_turns: usize) {
        let turns = self.turns().len();
        let excess = turns.saturating_sub(max_turns).next_multiple_of(2).min(turns);
        if excess > 0 {
            let start = self.messages.len() - self.turns().len();
            self.messages.drain(start..start + excess);
        }
    }
}

/// Conversations keyed by session id.
///
/// Sessions idle longer than the configured time are dropped, and the store
/// never holds more than `max_sessions` entries.
#[derive(Clone)]
pub struct ChatSessions {
    sessions: Cache<SessionId, Arc<Mutex<Conversation>>>,
    system_prompt: String,
    max_history: usize,
}

impl ChatSessions {
    pub fn new(config: &ChatConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(Duration::from_secs(config.session_idle_secs.max(1)))
            .build();

        Self {
            sessions,
            system_prompt: config.system_prompt.clone(),
            max_history: config.max_history,
        }
    }

    /// Open a new conversation
    pub async fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions
            .insert(id, Arc::new(Mutex::new(Conversation::new(&self.system_prompt))))
            .await;
        debug!("Chat session {} created", id);
        id
    }

    async fn get(&self, id: SessionId) -> Result<Arc<Mutex<Conversation>>> {
        self.sessions
            .get(&id)
            .await
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Copy of a conversation
    pub async fn history(&self, id: SessionId) -> Result<Conversation> {
        let conversation = self.get(id).await?;
        let guard = conversation.lock().await;
        Ok(guard.clone())
    }

    pub async fn remove(&self, id: SessionId) -> Result<()> {
        if self.sessions.remove(&id).await.is_none() {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        debug!("Chat session {} removed", id);
        Ok(())
    }

    /// Approximate number of live sessions
    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a new session
    #[serde(default)]
    pub session: Option<SessionId>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub session: SessionId,
    pub reply: String,
    /// Turns held after this exchange, system prompt excluded
    pub turns: usize,
}

pub struct ChatHandler {
    model: Arc<dyn ChatModel>,
    sessions: ChatSessions,
}

impl ChatHandler {
    pub fn new(model: Arc<dyn ChatModel>, sessions: ChatSessions) -> Self {
        Self { model, sessions }
    }

    pub const fn sessions(&self) -> &ChatSessions {
        &self.sessions
    }
}

#[async_trait]
impl FeatureHandler for ChatHandler {
    type Request = ChatRequest;
    type Response = ChatReply;

    fn feature(&self) -> Feature {
        Feature::Chat
    }

    async fn handle(&self, request: ChatRequest) -> Result<ChatReply> {
        if request.message.trim().is_empty() {
            return Err(Error::InvalidArgument("message is empty".to_string()));
        }

        let session = match request.session {
            Some(id) => id,
            None => self.sessions.create().await,
        };

        let conversation = self.sessions.get(session).await?;
        // Held across the model call so turns of one session stay ordered
        let mut conversation = conversation.lock().await;
        conversation.messages.push(ChatMessage::user(request.message));

        match self.model.complete(conversation.messages()).await {
            Ok(reply) => {
                conversation.messages.push(ChatMessage::assistant(reply.clone()));
                conversation.trim(self.sessions.max_history);
                Ok(ChatReply {
                    session,
                    reply,
                    turns: conversation.turns().len(),
                })
            }
            Err(e) => {
                conversation.messages.pop();
                warn!("Chat completion failed for session {}: {}", session, e);
                Err(e)
            }
        }
    }
}
