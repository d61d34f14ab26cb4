//! Conversation-related types.

use chrono::{DateTime, Utc};
use heso_model::ReplyMessage;
use serde::{Deserialize, Serialize};

/// Title of a conversation before its first user message.
pub const PLACEHOLDER_TITLE: &str = "New chat";

/// Title of the welcome conversation.
pub const WELCOME_TITLE: &str = "Welcome";

/// The greeting the welcome conversation is seeded with.
pub const WELCOME_GREETING: &str =
    "Hi! I'm Heso, your friendly assistant. What's on your mind today? 😊";

/// Maximum number of characters kept when deriving a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Appended to a derived title that has been truncated.
pub const TITLE_ELLIPSIS: &str = "...";

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,
    /// The reply provider.
    #[serde(alias = "ai")]
    Assistant,
}

/// One turn in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    #[inline]
    pub(crate) fn to_reply_message(&self) -> ReplyMessage {
        match self.role {
            Role::User => ReplyMessage::User(self.content.clone()),
            Role::Assistant => ReplyMessage::Assistant(self.content.clone()),
        }
    }
}

/// A titled, ordered sequence of messages with a unique id.
///
/// Messages are only ever appended, and the title is derived from the
/// first user message unless the conversation is the welcome one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) messages: Vec<Message>,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) welcome: bool,
}

impl Conversation {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            title: PLACEHOLDER_TITLE.to_owned(),
            messages: vec![],
            created_at: Utc::now(),
            welcome: false,
        }
    }

    pub(crate) fn welcome(id: String) -> Self {
        Self {
            id,
            title: WELCOME_TITLE.to_owned(),
            messages: vec![Message::assistant(WELCOME_GREETING)],
            created_at: Utc::now(),
            welcome: true,
        }
    }

    /// Returns the unique id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display title.
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the messages in append order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns when the conversation was created.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns `true` if this is a seeded welcome conversation.
    #[inline]
    pub fn is_welcome(&self) -> bool {
        self.welcome
    }

    /// Appends a message, deriving the title from it if it is the first
    /// user message of a regular conversation.
    pub(crate) fn push(&mut self, message: Message) {
        let first_user_message = message.role == Role::User
            && !self.messages.iter().any(|m| m.role == Role::User);
        if first_user_message && !self.welcome {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
    }
}

/// Derives a conversation title from a message.
///
/// Keeps the first [`TITLE_MAX_CHARS`] characters and appends
/// [`TITLE_ELLIPSIS`] if anything was cut.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let mut title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("Hi"), "Hi");
        assert_eq!(
            derive_title("Hello there, how are you today please"),
            "Hello there, how are you today..."
        );
        let exact = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&exact), exact);
        // Counted in characters, not bytes.
        let cyrillic = "Привет, как у тебя дела сегодня вечером?";
        assert_eq!(
            derive_title(cyrillic),
            format!("{}...", cyrillic.chars().take(30).collect::<String>())
        );
    }

    #[test]
    fn test_title_rewrite_once() {
        let mut conversation = Conversation::new("c1".to_owned());
        assert_eq!(conversation.title(), PLACEHOLDER_TITLE);

        conversation.push(Message::assistant("Ignored for titles"));
        assert_eq!(conversation.title(), PLACEHOLDER_TITLE);

        conversation.push(Message::user("Hello there, how are you today please"));
        assert_eq!(conversation.title(), "Hello there, how are you today...");

        conversation.push(Message::user("Second question"));
        assert_eq!(conversation.title(), "Hello there, how are you today...");
        assert_eq!(conversation.messages().len(), 3);
    }

    #[test]
    fn test_welcome_keeps_title() {
        let mut conversation = Conversation::welcome("w".to_owned());
        assert_eq!(conversation.messages(), [Message::assistant(WELCOME_GREETING)]);

        conversation.push(Message::user("What can you do?"));
        assert_eq!(conversation.title(), WELCOME_TITLE);
    }

    #[test]
    fn test_serde_format() {
        let json = r#"{
            "id": "1700000000000",
            "title": "Old chat",
            "messages": [
                { "role": "user", "content": "Hi" },
                { "role": "ai", "content": "Hello!" }
            ],
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.id(), "1700000000000");
        assert!(!conversation.is_welcome());
        assert_eq!(conversation.messages()[1], Message::assistant("Hello!"));

        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value["createdAt"], "2024-05-01T10:00:00Z");
        assert_eq!(value["messages"][1]["role"], "assistant");
    }
}
