//! The session store, single source of truth for all conversations.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::conversation::{Conversation, Message};
use crate::storage::{SlotStorage, StorageError};

/// Name of the slot holding the serialized conversations.
pub const CONVERSATIONS_SLOT: &str = "heso.chats";

/// The error type for [`SessionStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No conversation has the given id.
    #[error("conversation not found: {0}")]
    NotFound(String),
    /// The conversations could not be serialized.
    #[error("failed to encode conversations: {0}")]
    Encode(#[from] serde_json::Error),
    /// The storage backend rejected the write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owns all conversations and the active selection, and commits every
/// change to a [`SlotStorage`].
///
/// Each mutating operation builds the next state, writes it to the slot,
/// and only then makes it observable. When the write fails the operation
/// returns an error and the store is left as it was.
///
/// The conversation list is never empty, and the active id always refers
/// to one of its members.
pub struct SessionStore {
    storage: Arc<dyn SlotStorage>,
    conversations: Vec<Conversation>,
    active_id: String,
}

impl SessionStore {
    /// Loads the persisted conversations.
    ///
    /// Missing or invalid data is treated as absent, in which case the store
    /// starts with a single welcome conversation. The first conversation
    /// becomes active. This never fails; problems are logged.
    pub fn load(storage: Arc<dyn SlotStorage>) -> Self {
        let restored = match storage.read_slot(CONVERSATIONS_SLOT) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(conversations) => Some(conversations),
                Err(reason) => {
                    warn!("discarding persisted conversations: {reason}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("failed to read persisted conversations: {err}");
                None
            }
        };

        let Some(conversations) = restored else {
            let welcome = Conversation::welcome(fresh_id(&[]));
            let mut store = Self {
                storage,
                active_id: welcome.id.clone(),
                conversations: vec![welcome],
            };
            if let Err(err) = store.commit_current() {
                warn!("failed to persist the welcome conversation: {err}");
            }
            debug!("started with a welcome conversation");
            return store;
        };

        let active_id = conversations[0].id.clone();
        debug!("restored {} conversations", conversations.len());
        Self {
            storage,
            conversations,
            active_id,
        }
    }

    /// Returns all conversations, newest first.
    #[inline]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Returns the id of the active conversation.
    #[inline]
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Returns the active conversation.
    #[inline]
    pub fn active(&self) -> &Conversation {
        let idx = self.position(&self.active_id).unwrap_or_default();
        &self.conversations[idx]
    }

    /// Looks up a conversation by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Creates an empty conversation in front of the others and makes it
    /// active. Returns its id.
    pub fn create_conversation(&mut self) -> Result<String, StoreError> {
        let id = fresh_id(&self.conversations);
        let mut next = Vec::with_capacity(self.conversations.len() + 1);
        next.push(Conversation::new(id.clone()));
        next.extend(self.conversations.iter().cloned());

        self.commit(&next)?;
        self.conversations = next;
        self.active_id = id.clone();
        debug!("created conversation {id}");
        Ok(id)
    }

    /// Makes the conversation with `id` active.
    pub fn switch_active(&mut self, id: &str) -> Result<(), StoreError> {
        if self.position(id).is_none() {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        self.commit(&self.conversations)?;
        self.active_id = id.to_owned();
        Ok(())
    }

    /// Appends a message to a conversation.
    ///
    /// The first user message of a regular conversation also sets its
    /// title.
    pub fn append_message(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(), StoreError> {
        let Some(idx) = self.position(conversation_id) else {
            return Err(StoreError::NotFound(conversation_id.to_owned()));
        };
        let mut next = self.conversations.clone();
        next[idx].push(message);

        self.commit(&next)?;
        self.conversations = next;
        Ok(())
    }

    /// Discards every conversation and starts over with a single welcome
    /// conversation.
    ///
    /// This cannot be undone, callers should ask the user first.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        let welcome = Conversation::welcome(fresh_id(&self.conversations));
        let next = vec![welcome];

        self.commit(&next)?;
        self.active_id = next[0].id.clone();
        self.conversations = next;
        debug!("cleared all conversations");
        Ok(())
    }

    #[inline]
    fn position(&self, id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn commit(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(conversations)?;
        self.storage.write_slot(CONVERSATIONS_SLOT, &raw)?;
        trace!("committed {} conversations", conversations.len());
        Ok(())
    }

    #[inline]
    fn commit_current(&self) -> Result<(), StoreError> {
        self.commit(&self.conversations)
    }
}

fn decode(raw: &str) -> Result<Vec<Conversation>, String> {
    let conversations = serde_json::from_str::<Vec<Conversation>>(raw)
        .map_err(|err| format!("{err}"))?;
    if conversations.is_empty() {
        return Err("no conversations".to_owned());
    }
    let mut seen = HashSet::new();
    for conversation in &conversations {
        if !seen.insert(conversation.id.as_str()) {
            return Err(format!("duplicate id {}", conversation.id));
        }
    }
    Ok(conversations)
}

fn fresh_id(existing: &[Conversation]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if existing.iter().all(|c| c.id != id) {
            return id;
        }
    }
}
