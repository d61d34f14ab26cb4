use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use heso_model::ReplyProvider;
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use super::state::{ControllerState, run_controller};
use super::{ChatController, ChatEvent};
use crate::reply_client::ReplyClient;
use crate::storage::{MemoryStorage, SlotStorage};
use crate::store::SessionStore;

/// [`ChatController`] builder.
pub struct ChatControllerBuilder {
    reply_client: ReplyClient,
    storage: Option<Arc<dyn SlotStorage>>,
    on_event: Option<Box<dyn Fn(ChatEvent) + Send + Sync>>,
}

impl ChatControllerBuilder {
    /// Creates a new builder with the specified reply provider.
    #[inline]
    pub fn with_reply_provider<P: ReplyProvider + 'static>(provider: P) -> Self {
        Self {
            reply_client: ReplyClient::new(provider),
            storage: None,
            on_event: None,
        }
    }

    /// Sets the storage conversations are loaded from and committed to.
    ///
    /// Without one, conversations live in memory only.
    #[inline]
    pub fn with_storage(mut self, storage: Arc<dyn SlotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attaches a callback to be invoked for every [`ChatEvent`].
    ///
    /// The callback runs on the controller task and should return quickly.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(ChatEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Loads the session and starts the controller.
    ///
    /// This must be called within a tokio runtime.
    pub fn build(self) -> ChatController {
        let Self {
            reply_client,
            storage,
            on_event,
        } = self;

        let storage: Arc<dyn SlotStorage> = match storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };
        let state = ControllerState {
            store: SessionStore::load(storage),
            reply_client,
            pending: HashSet::new(),
            running_tasks: HashMap::new(),
            next_task_id: 1,
            on_event,
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        tokio::spawn(
            run_controller(state, cmd_tx.downgrade(), cmd_rx, kill_rx)
                .instrument(trace_span!("chat controller")),
        );
        ChatController {
            cmd_tx,
            kill_tx: Arc::new(kill_tx),
        }
    }
}
