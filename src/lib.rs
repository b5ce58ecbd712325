// src/lib.rs
//
// Library entry point for mailbox-leads.
// Re-exports modules needed by the binary and integration tests.

pub mod cfg;
pub mod classify;
pub mod client_ops;
pub mod error;
pub mod imap_session;
pub mod llm;
pub mod message;
pub mod model;
pub mod ops;
pub mod query;
pub mod resolver;
pub mod store;
pub mod sync;

pub use client_ops::{Clock, RealClock};
pub use error::{Error, Result};
pub use store::Store;
