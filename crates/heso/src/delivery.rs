//! Routing of controller events to the terminal.

use heso_core::conversation::Message;
use heso_core::{ChatEvent, ChatSnapshot};

/// What the terminal should do with a [`ChatEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Print the message, it belongs to the open conversation.
    Show(Message),
    /// A reply landed in another conversation; mention it by title.
    Notice {
        /// The conversation the reply was appended to.
        conversation_id: String,
        /// Its current title.
        title: String,
    },
    /// Nothing to print.
    Ignore,
}

/// Decides how an event is presented, given the state after it happened.
///
/// Replies for a conversation that no longer exists are ignored.
pub fn deliver(snapshot: &ChatSnapshot, event: ChatEvent) -> Delivery {
    match event {
        ChatEvent::ReplyReceived {
            conversation_id,
            message,
        }
        | ChatEvent::ReplyFailed {
            conversation_id,
            message,
        } => {
            if conversation_id == snapshot.active_id() {
                return Delivery::Show(message);
            }
            match snapshot.get(&conversation_id) {
                Some(conversation) => Delivery::Notice {
                    title: conversation.title().to_owned(),
                    conversation_id,
                },
                None => Delivery::Ignore,
            }
        }
        ChatEvent::ReplyPending { .. } | ChatEvent::Idle => Delivery::Ignore,
    }
}
