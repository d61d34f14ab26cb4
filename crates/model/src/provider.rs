use std::error::Error;

use crate::error::ErrorKind;
use crate::reply::Reply;
use crate::request::ReplyRequest;

/// The error type for a reply provider.
pub trait ReplyProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents a reply provider, which turns a conversation
/// history into the next assistant message.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state, but callers should not rely on it,
/// and the provider should be prepared for being dropped anytime.
///
/// Providers are expected to add their own system instructions (persona)
/// in front of the history. Callers only send user and assistant turns.
pub trait ReplyProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ReplyProviderError;

    /// Sends a request and resolves with the generated reply.
    ///
    /// The returned future must not borrow from `self` or `req`.
    fn send_request(
        &self,
        req: &ReplyRequest,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static;
}
