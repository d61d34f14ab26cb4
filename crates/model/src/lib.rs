//! An abstraction layer for reply providers.
//!
//! A reply provider takes the history of one conversation and produces
//! the next assistant message. This crate establishes the protocol the
//! chat controller uses to talk to any such provider, so that the
//! upstream model can be swapped without touching the core.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod reply;
mod request;

pub use error::*;
pub use provider::*;
pub use reply::*;
pub use request::*;
