use std::pin::Pin;
use std::sync::Arc;

use heso_model::{Reply, ReplyProvider, ReplyProviderError, ReplyRequest};
use tracing::Instrument;

type SendRequestResult = Result<Reply, Box<dyn ReplyProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ReplyRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a reply provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ReplyClient {
    handler_fn: HandlerFn,
}

impl ReplyClient {
    #[inline]
    pub fn new<P: ReplyProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since the controller doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            let message_count = req.messages.len();
            Box::pin(
                async move {
                    trace!("sending a request with {message_count} messages");
                    match fut.await {
                        Ok(reply) => {
                            trace!("got a reply: {reply:?}");
                            Ok(reply)
                        }
                        Err(err) => {
                            error!("got an error ({:?}): {err}", err.kind());
                            Err(Box::new(err) as Box<dyn ReplyProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("reply client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the reply.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe as long as the provider's future is.
    #[inline]
    pub async fn send_request(
        &self,
        req: ReplyRequest,
    ) -> Result<Reply, Box<dyn ReplyProviderError>> {
        (self.handler_fn)(req).await
    }
}
