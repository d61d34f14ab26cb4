use serde::{Deserialize, Serialize};

/// A reply generated by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reply {
    /// Text content of the first generated message.
    pub content: String,
    /// The model that actually produced the reply, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Reply {
    /// Creates a reply with the given content.
    #[inline]
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}
