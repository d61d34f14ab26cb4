/// A request to be sent to the reply provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReplyRequest {
    /// The conversation history, oldest first.
    pub messages: Vec<ReplyMessage>,
}

/// A complete message in the history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReplyMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ReplyMessage {
    /// Returns the text content of this message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ReplyMessage::System(content)
            | ReplyMessage::User(content)
            | ReplyMessage::Assistant(content) => content,
        }
    }
}
