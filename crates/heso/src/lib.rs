//! Heso, a chat client for OpenRouter-hosted models with local history.
//!
//! The crate includes a CLI tool for chatting in the terminal. The pieces
//! it is assembled from (configuration, settings, persona and command
//! parsing) are exposed so other front ends can reuse them.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod command;
pub mod config;
pub mod delivery;
pub mod persona;
pub mod settings;

/// Re-exports of [`heso_core`] crate.
pub mod core {
    pub use heso_core::*;
}
