use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};

use heso_model::{Reply, ReplyProviderError, ReplyRequest};
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{APOLOGY, ChatEvent, ChatSnapshot, ControllerError};
use crate::conversation::Message;
use crate::reply_client::ReplyClient;
use crate::store::{SessionStore, StoreError};

type EventFn = Box<dyn Fn(ChatEvent) + Send + Sync>;

pub(crate) enum Command {
    SendMessage {
        input: String,
        reply_tx: oneshot::Sender<Result<(), ControllerError>>,
    },
    NewConversation {
        reply_tx: oneshot::Sender<Result<String, ControllerError>>,
    },
    SwitchConversation {
        id: String,
        reply_tx: oneshot::Sender<Result<(), ControllerError>>,
    },
    ClearAll {
        reply_tx: oneshot::Sender<Result<(), ControllerError>>,
    },
    Snapshot {
        reply_tx: oneshot::Sender<ChatSnapshot>,
    },
    ReplyFinished {
        task_id: u64,
        conversation_id: String,
        response: Result<Reply, Box<dyn ReplyProviderError>>,
    },
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SendMessage { input, .. } => f
                .debug_struct("SendMessage")
                .field("input", input)
                .finish_non_exhaustive(),
            Command::NewConversation { .. } => {
                f.debug_struct("NewConversation").finish_non_exhaustive()
            }
            Command::SwitchConversation { id, .. } => f
                .debug_struct("SwitchConversation")
                .field("id", id)
                .finish_non_exhaustive(),
            Command::ClearAll { .. } => {
                f.debug_struct("ClearAll").finish_non_exhaustive()
            }
            Command::Snapshot { .. } => {
                f.debug_struct("Snapshot").finish_non_exhaustive()
            }
            Command::ReplyFinished {
                task_id,
                conversation_id,
                response,
            } => f
                .debug_struct("ReplyFinished")
                .field("task_id", task_id)
                .field("conversation_id", conversation_id)
                .field("response", response)
                .finish(),
        }
    }
}

pub(crate) struct ControllerState {
    pub(crate) store: SessionStore,
    pub(crate) reply_client: ReplyClient,
    pub(crate) pending: HashSet<String>,
    pub(crate) running_tasks: HashMap<u64, JoinHandle<()>>,
    pub(crate) next_task_id: u64,
    pub(crate) on_event: Option<EventFn>,
}

impl ControllerState {
    fn handle(&mut self, cmd: Command, cmd_tx: &mpsc::WeakUnboundedSender<Command>) {
        match cmd {
            Command::SendMessage { input, reply_tx } => {
                reply_tx.send(self.send_message(&input, cmd_tx)).ok();
            }
            Command::NewConversation { reply_tx } => {
                let result = self.store.create_conversation().map_err(Into::into);
                reply_tx.send(result).ok();
            }
            Command::SwitchConversation { id, reply_tx } => {
                let result = self.store.switch_active(&id).map_err(Into::into);
                reply_tx.send(result).ok();
            }
            Command::ClearAll { reply_tx } => {
                let result = self.store.clear_all().map_err(Into::into);
                reply_tx.send(result).ok();
            }
            Command::Snapshot { reply_tx } => {
                reply_tx.send(self.snapshot()).ok();
            }
            Command::ReplyFinished {
                task_id,
                conversation_id,
                response,
            } => {
                self.finish_reply(task_id, conversation_id, response);
            }
        }
    }

    fn send_message(
        &mut self,
        input: &str,
        cmd_tx: &mpsc::WeakUnboundedSender<Command>,
    ) -> Result<(), ControllerError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ControllerError::EmptyInput);
        }

        let conversation_id = self.store.active_id().to_owned();
        if self.pending.contains(&conversation_id) {
            debug!("dropped a send to {conversation_id}, a reply is pending");
            return Err(ControllerError::ReplyPending(conversation_id));
        }
        let Some(cmd_tx) = cmd_tx.upgrade() else {
            return Err(ControllerError::Closed);
        };

        // The user message is committed before the provider is asked, and
        // stays even if the provider fails.
        self.store
            .append_message(&conversation_id, Message::user(input))?;
        let request = self.build_reply_request(&conversation_id);
        self.pending.insert(conversation_id.clone());
        self.emit(ChatEvent::ReplyPending {
            conversation_id: conversation_id.clone(),
        });

        let reply_client = self.reply_client.clone();
        self.spawn_task(|task_id| async move {
            let response = reply_client.send_request(request).await;
            cmd_tx
                .send(Command::ReplyFinished {
                    task_id,
                    conversation_id,
                    response,
                })
                .ok();
        });
        Ok(())
    }

    fn finish_reply(
        &mut self,
        task_id: u64,
        conversation_id: String,
        response: Result<Reply, Box<dyn ReplyProviderError>>,
    ) {
        self.running_tasks.remove(&task_id);
        self.pending.remove(&conversation_id);

        let (message, failed) = match response {
            Ok(reply) => (Message::assistant(reply.content), false),
            Err(err) => {
                warn!("reply for {conversation_id} failed: {err}");
                (Message::assistant(APOLOGY), true)
            }
        };

        match self.store.append_message(&conversation_id, message.clone()) {
            Ok(()) => {
                let event = if failed {
                    ChatEvent::ReplyFailed {
                        conversation_id,
                        message,
                    }
                } else {
                    ChatEvent::ReplyReceived {
                        conversation_id,
                        message,
                    }
                };
                self.emit(event);
            }
            Err(StoreError::NotFound(_)) => {
                debug!("conversation {conversation_id} is gone, dropped its reply");
            }
            Err(err) => {
                error!("failed to persist the reply for {conversation_id}: {err}");
            }
        }

        if self.pending.is_empty() {
            self.emit(ChatEvent::Idle);
        }
    }

    fn build_reply_request(&self, conversation_id: &str) -> ReplyRequest {
        let messages = self
            .store
            .get(conversation_id)
            .map(|c| c.messages().iter().map(Message::to_reply_message).collect())
            .unwrap_or_default();
        ReplyRequest { messages }
    }

    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            conversations: self.store.conversations().to_vec(),
            active_id: self.store.active_id().to_owned(),
            pending: self.pending.clone(),
        }
    }

    #[inline]
    fn emit(&self, event: ChatEvent) {
        trace!("emitting event: {event:?}");
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    fn spawn_task<F, Fut>(&mut self, f: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let task = tokio::spawn(f(task_id));
        self.running_tasks.insert(task_id, task);
    }
}

pub(crate) async fn run_controller(
    mut state: ControllerState,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut kill_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let cmd = select! {
            biased;

            _ = kill_rx.changed() => {
                break;
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                cmd
            }
        };
        trace!("received command: {cmd:?}");

        let proc_span = trace_span!("proc cmd");
        proc_span.in_scope(|| {
            state.handle(cmd, &cmd_tx);
            trace!("finished");
        });
    }

    for (_, task) in state.running_tasks.drain() {
        task.abort();
    }
    debug!("will terminate");
}
