use heso_model::Reply;
use serde::{Deserialize, Serialize};

/// How the provider should settle one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// Resolve successfully with this reply.
    #[serde(rename = "reply")]
    Reply(Reply),
    /// Fail with the given error kind.
    #[serde(rename = "failure")]
    Failure(PresetFailure),
}

impl PresetReply {
    /// Creates a successful preset with the given content.
    #[inline]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self::Reply(Reply::new(content))
    }

    /// Creates a failing preset.
    #[inline]
    pub fn failure(kind: PresetFailure) -> Self {
        Self::Failure(kind)
    }
}

/// Serializable mirror of [`heso_model::ErrorKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    /// See [`heso_model::ErrorKind::Transport`].
    Transport,
    /// See [`heso_model::ErrorKind::RateLimitExceeded`].
    RateLimitExceeded,
    /// See [`heso_model::ErrorKind::Status`].
    Status,
    /// See [`heso_model::ErrorKind::Malformed`].
    Malformed,
    /// See [`heso_model::ErrorKind::Upstream`].
    Upstream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let presets = vec![
            PresetReply::text("Hi there! 😊"),
            PresetReply::failure(PresetFailure::Status),
            PresetReply::failure(PresetFailure::RateLimitExceeded),
        ];

        let serialized = serde_json::to_string(&presets).unwrap();
        assert!(serialized.contains(r#""type":"failure","data":"status""#));
        assert!(serialized.contains(r#""data":"rate_limit_exceeded""#));
        let deserialized: Vec<PresetReply> =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(presets, deserialized);
    }
}
