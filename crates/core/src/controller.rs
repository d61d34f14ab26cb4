mod builder;
mod state;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::conversation::{Conversation, Message};
use crate::store::StoreError;
pub use builder::ChatControllerBuilder;
use state::Command;

/// Appended in place of a reply when the provider fails.
pub const APOLOGY: &str =
    "Sorry, Heso is unavailable right now. Please try again later!";

/// The error type for [`ChatController`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The input was empty after trimming.
    #[error("message is empty")]
    EmptyInput,
    /// The conversation is still waiting for a reply.
    #[error("conversation {0} is waiting for a reply")]
    ReplyPending(String),
    /// No conversation has the given id.
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
    /// The change could not be persisted and was not applied.
    #[error("failed to persist the change: {0}")]
    Persistence(StoreError),
    /// The controller task has stopped.
    #[error("the chat controller has stopped")]
    Closed,
}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ControllerError::ConversationNotFound(id),
            err => ControllerError::Persistence(err),
        }
    }
}

/// Notifications emitted by the controller as replies progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// A user message was appended and a reply was requested.
    ReplyPending {
        /// The conversation waiting for the reply.
        conversation_id: String,
    },
    /// The provider replied and the reply was appended.
    ReplyReceived {
        /// The conversation the reply was appended to.
        conversation_id: String,
        /// The appended assistant message.
        message: Message,
    },
    /// The provider failed and the apology was appended instead.
    ReplyFailed {
        /// The conversation the apology was appended to.
        conversation_id: String,
        /// The appended apology message.
        message: Message,
    },
    /// No reply is outstanding anymore.
    Idle,
}

/// A copy of the session state at one point in time.
#[derive(Clone, Debug)]
pub struct ChatSnapshot {
    conversations: Vec<Conversation>,
    active_id: String,
    pending: HashSet<String>,
}

impl ChatSnapshot {
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
    pub fn active(&self) -> Option<&Conversation> {
        self.get(&self.active_id)
    }

    /// Looks up a conversation by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    /// Returns `true` if the conversation is waiting for a reply.
    #[inline]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Returns `true` if the active conversation is waiting for a reply,
    /// i.e. a typing indicator should be shown.
    #[inline]
    pub fn is_typing(&self) -> bool {
        self.is_pending(&self.active_id)
    }
}

/// Handle to a running chat controller.
///
/// The controller owns the session store and mediates every user action.
/// All commands are processed one at a time by a single task, while replies
/// are fetched in the background. At most one reply is outstanding per
/// conversation; a send to a conversation that is still waiting is rejected,
/// not queued.
///
/// Handles are cheap to clone. The controller stops when every handle is
/// dropped or when [`ChatController::shutdown`] is called, abandoning any
/// outstanding reply.
#[derive(Clone)]
pub struct ChatController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    kill_tx: Arc<watch::Sender<bool>>,
}

impl ChatController {
    /// Sends a user message in the active conversation.
    ///
    /// Returns once the message has been appended and the reply requested;
    /// the reply itself is delivered through [`ChatEvent`]s.
    pub async fn send_message<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<(), ControllerError> {
        let input = input.into();
        self.request(|reply_tx| Command::SendMessage { input, reply_tx })
            .await?
    }

    /// Creates a new conversation, makes it active and returns its id.
    pub async fn new_conversation(&self) -> Result<String, ControllerError> {
        self.request(|reply_tx| Command::NewConversation { reply_tx })
            .await?
    }

    /// Makes the conversation with `id` active.
    pub async fn switch_conversation<S: Into<String>>(
        &self,
        id: S,
    ) -> Result<(), ControllerError> {
        let id = id.into();
        self.request(|reply_tx| Command::SwitchConversation { id, reply_tx })
            .await?
    }

    /// Discards every conversation and starts over with a welcome one.
    ///
    /// This cannot be undone. Ask the user for confirmation before calling.
    pub async fn clear_all(&self) -> Result<(), ControllerError> {
        self.request(|reply_tx| Command::ClearAll { reply_tx }).await?
    }

    /// Returns a copy of the current session state.
    pub async fn snapshot(&self) -> Result<ChatSnapshot, ControllerError> {
        self.request(|reply_tx| Command::Snapshot { reply_tx }).await
    }

    /// Stops the controller. Outstanding replies are abandoned.
    #[inline]
    pub fn shutdown(&self) {
        self.kill_tx.send(true).ok();
    }

    async fn request<T>(
        &self,
        make_cmd: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make_cmd(reply_tx))
            .map_err(|_| ControllerError::Closed)?;
        reply_rx.await.map_err(|_| ControllerError::Closed)
    }
}
