// src/client_ops.rs
//
// Trait abstractions for the IMAP capability and for time.
// Production code talks to real sessions; tests plug in scripted mocks.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::ImapEndpoint;

/// One message as delivered by a sequence-range FETCH of envelope + source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedMessage {
    pub seq: u32,
    /// First address of the envelope's From list.
    pub from: Option<String>,
    pub subject: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Raw RFC-2822 source.
    pub source: Option<Vec<u8>>,
}

/// An authenticated IMAP session.
pub trait ImapSession {
    /// Total number of messages in the inbox (STATUS MESSAGES).
    fn inbox_message_count(&mut self) -> Result<u32>;

    /// Take the inbox for exclusive use so sequence numbers stay stable.
    fn lock_inbox(&mut self) -> Result<()>;

    /// Give the inbox back.
    fn release_inbox(&mut self) -> Result<()>;

    /// Fetch envelope + source for a sequence set like `9:*`.
    fn fetch_range(&mut self, seq_set: &str) -> Result<Vec<FetchedMessage>>;

    /// Graceful LOGOUT.
    fn logout(&mut self) -> Result<()>;
}

/// Opens authenticated sessions against an endpoint.
pub trait ImapConnector {
    fn connect(&self, endpoint: &ImapEndpoint) -> Result<Box<dyn ImapSession>>;
}

/// Trait for time providers.
/// Allows production code to use real time or virtual time for testing.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock implementation using system time.
#[derive(Clone, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
