use heso_model::{ErrorKind, Reply, ReplyMessage, ReplyRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, OpenRouterConfig};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatCompletionResponse {
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub error: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ReplyRequest,
    config: &OpenRouterConfig,
) -> ChatCompletionRequest {
    let persona = config.system_prompt.iter().map(|prompt| Message::System {
        content: prompt.clone(),
    });
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: persona
            .chain(req.messages.iter().map(create_message))
            .collect(),
        stream: false,
    }
}

#[inline]
fn create_message(msg: &ReplyMessage) -> Message {
    match msg {
        ReplyMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ReplyMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ReplyMessage::Assistant(content) => Message::Assistant {
            content: content.clone(),
        },
    }
}

/// Extracts the first choice's message content from a successful body.
pub fn parse_reply(body: &str) -> Result<Reply, Error> {
    let resp = serde_json::from_str::<ChatCompletionResponse>(body)
        .map_err(|err| Error::new(format!("{err}"), ErrorKind::Malformed))?;

    if let Some(error) = resp.error {
        let message = error_message(&error)
            .unwrap_or_else(|| "upstream reported an error".to_owned());
        return Err(Error::new(message, ErrorKind::Upstream));
    }

    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);
    let Some(content) = content else {
        return Err(Error::new(
            "response has no message content",
            ErrorKind::Malformed,
        ));
    };

    Ok(Reply {
        content,
        model: resp.model,
    })
}

/// Describes an error body returned with a non-success status.
///
/// Both `{"error": {"message": ...}}` and `{"message": ...}` shapes are
/// understood. Returns `None` if the body carries no message.
pub fn describe_error_body(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    value
        .get("error")
        .and_then(error_message)
        .or_else(|| error_message(&value))
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}
