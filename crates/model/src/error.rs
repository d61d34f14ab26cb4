/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider could not be reached.
    Transport,
    /// The upstream model is rate limited.
    RateLimitExceeded,
    /// The provider answered with a non-success status.
    Status,
    /// The provider answered successfully, but the payload could not be
    /// understood.
    Malformed,
    /// The payload carries an explicit error from the upstream model.
    Upstream,
    /// Any other errors.
    Other,
}
