//! Core logic of the chat client: the session store, slot storage and the
//! chat controller that talks to a reply provider.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod controller;
pub mod conversation;
mod reply_client;
pub mod storage;
pub mod store;

pub use controller::{
    APOLOGY, ChatController, ChatControllerBuilder, ChatEvent, ChatSnapshot,
    ControllerError,
};
