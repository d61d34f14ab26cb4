//! Parsing of lines typed at the prompt.

use heso_core::ChatSnapshot;

use crate::settings::{ParseThemeError, Theme};

/// What a line typed at the prompt asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send the text to the active conversation.
    Send(String),
    /// Start a new conversation.
    New,
    /// List conversations.
    List,
    /// Switch to a conversation, by list number or id.
    Switch(String),
    /// Print the active conversation.
    Show,
    /// Delete every conversation, after confirmation.
    Clear,
    /// Set the display name.
    Name(String),
    /// Set the theme.
    Theme(Theme),
    /// Print the help.
    Help,
    /// Leave.
    Quit,
}

/// The error type for [`parse`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command name is not known.
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    /// The command needs an argument.
    #[error("/{0} needs an argument, try /help")]
    MissingArgument(&'static str),
    /// The theme argument is invalid.
    #[error(transparent)]
    InvalidTheme(#[from] ParseThemeError),
}

/// Usage shown by `/help`.
pub const HELP: &str = "\
/new               start a new conversation
/list              list conversations
/switch <n|id>     switch to a conversation
/show              print the active conversation
/clear             delete every conversation
/name <name>       set your display name
/theme <light|dark> set the color theme
/quit              leave";

/// Parses one line of input.
///
/// Lines that don't start with `/` are sent as they are; trimming and
/// rejecting blank input is left to the controller.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Send(line.to_owned()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |command: &'static str| {
        if arg.is_empty() {
            Err(CommandError::MissingArgument(command))
        } else {
            Ok(arg.to_owned())
        }
    };

    let command = match name {
        "new" => Command::New,
        "list" | "ls" => Command::List,
        "switch" => Command::Switch(required("switch")?),
        "show" => Command::Show,
        "clear" => Command::Clear,
        "name" => Command::Name(required("name")?),
        "theme" => Command::Theme(required("theme")?.parse()?),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(command)
}

/// Resolves a `/switch` argument to a conversation id.
///
/// Numbers are 1-based positions in the conversation list. Anything else,
/// including a number past the end of the list, must be a full id or an
/// unambiguous id prefix.
pub fn resolve_conversation(snapshot: &ChatSnapshot, arg: &str) -> Option<String> {
    let conversations = snapshot.conversations();
    let by_position = arg
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|idx| conversations.get(idx));
    if let Some(conversation) = by_position {
        return Some(conversation.id().to_owned());
    }

    if let Some(exact) = snapshot.get(arg) {
        return Some(exact.id().to_owned());
    }
    let mut matches = conversations.iter().filter(|c| c.id().starts_with(arg));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.id().to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use heso_core::ChatControllerBuilder;
    use heso_core::storage::{MemoryStorage, SlotStorage};
    use heso_core::store::CONVERSATIONS_SLOT;
    use heso_test_model::TestReplyProvider;

    use super::*;

    #[test]
    fn test_parse_messages() {
        assert_eq!(parse("Hello!"), Ok(Command::Send("Hello!".to_owned())));
        assert_eq!(parse("   "), Ok(Command::Send("   ".to_owned())));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("/new"), Ok(Command::New));
        assert_eq!(parse(" /list "), Ok(Command::List));
        assert_eq!(parse("/switch 2"), Ok(Command::Switch("2".to_owned())));
        assert_eq!(
            parse("/name  Daniil Kamaev "),
            Ok(Command::Name("Daniil Kamaev".to_owned()))
        );
        assert_eq!(parse("/theme dark"), Ok(Command::Theme(Theme::Dark)));
        assert_eq!(parse("/q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("/switch"), Err(CommandError::MissingArgument("switch")));
        assert_eq!(parse("/dance"), Err(CommandError::Unknown("dance".to_owned())));
        assert!(matches!(
            parse("/theme neon"),
            Err(CommandError::InvalidTheme(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_conversation() {
        let controller =
            ChatControllerBuilder::with_reply_provider(TestReplyProvider::default())
                .build();
        let newest = controller.new_conversation().await.unwrap();
        let snapshot = controller.snapshot().await.unwrap();
        let welcome = snapshot.conversations()[1].id().to_owned();

        assert_eq!(resolve_conversation(&snapshot, "1"), Some(newest.clone()));
        assert_eq!(resolve_conversation(&snapshot, "2"), Some(welcome.clone()));
        assert_eq!(resolve_conversation(&snapshot, &welcome), Some(welcome.clone()));
        assert_eq!(resolve_conversation(&snapshot, &newest[..9]), Some(newest));
        assert_eq!(resolve_conversation(&snapshot, "zzz"), None);
    }

    #[tokio::test]
    async fn test_resolve_numeric_ids() {
        let storage = MemoryStorage::new();
        storage
            .write_slot(
                CONVERSATIONS_SLOT,
                r#"[
                    {"id":"1700000000001","title":"Newer","messages":[],"createdAt":"2024-05-02T10:00:00Z"},
                    {"id":"1700000000000","title":"Older","messages":[],"createdAt":"2024-05-01T10:00:00Z"}
                ]"#,
            )
            .unwrap();
        let controller =
            ChatControllerBuilder::with_reply_provider(TestReplyProvider::default())
                .with_storage(Arc::new(storage))
                .build();
        let snapshot = controller.snapshot().await.unwrap();

        // Small numbers are still list positions.
        assert_eq!(
            resolve_conversation(&snapshot, "2"),
            Some("1700000000000".to_owned())
        );
        assert_eq!(
            resolve_conversation(&snapshot, "1700000000000"),
            Some("1700000000000".to_owned())
        );
        assert_eq!(
            resolve_conversation(&snapshot, "1700000000001"),
            Some("1700000000001".to_owned())
        );
        assert_eq!(resolve_conversation(&snapshot, "170000000000"), None);
        assert_eq!(resolve_conversation(&snapshot, "3"), None);
        assert_eq!(resolve_conversation(&snapshot, "0"), None);
    }
}
