// tests/harness/mock_client.rs
//
// Mock IMAP connector. Sessions operate against a shared VirtualInbox and
// record every command for verification.

use std::sync::{Arc, RwLock};

use mailbox_leads::client_ops::{FetchedMessage, ImapConnector, ImapSession};
use mailbox_leads::model::ImapEndpoint;
use mailbox_leads::{Error, Result};

use crate::harness::virtual_mailbox::VirtualInbox;

/// Recorded commands, in the order the synchronizer issued them.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAction {
    Connect { host: String, port: u16, user: String, tls: bool },
    Status,
    Examine,
    Fetch { seq_set: String },
    Close,
    Logout,
}

/// Which commands should fail, and with what server text.
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub connect: Option<String>,
    pub fetch: Option<String>,
    pub logout: Option<String>,
}

#[derive(Clone)]
pub struct MockImapConnector {
    inbox: Arc<RwLock<VirtualInbox>>,
    actions: Arc<RwLock<Vec<RecordedAction>>>,
    failures: Arc<RwLock<Failures>>,
}

impl MockImapConnector {
    pub fn new(inbox: Arc<RwLock<VirtualInbox>>) -> Self {
        Self {
            inbox,
            actions: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(Failures::default())),
        }
    }

    pub fn fail_connect(&self, msg: &str) {
        self.failures.write().unwrap().connect = Some(msg.to_string());
    }

    pub fn fail_fetch(&self, msg: &str) {
        self.failures.write().unwrap().fetch = Some(msg.to_string());
    }

    pub fn fail_logout(&self, msg: &str) {
        self.failures.write().unwrap().logout = Some(msg.to_string());
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.actions.read().unwrap().clone()
    }

    pub fn fetch_ranges(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                RecordedAction::Fetch { seq_set } => Some(seq_set),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, action: &RecordedAction) -> usize {
        self.actions().iter().filter(|a| *a == action).count()
    }

    fn record(&self, action: RecordedAction) {
        self.actions.write().unwrap().push(action);
    }
}

impl ImapConnector for MockImapConnector {
    fn connect(&self, endpoint: &ImapEndpoint) -> Result<Box<dyn ImapSession>> {
        self.record(RecordedAction::Connect {
            host: endpoint.host.clone(),
            port: endpoint.port,
            user: endpoint.user.clone(),
            tls: endpoint.tls,
        });
        if let Some(msg) = self.failures.read().unwrap().connect.clone() {
            return Err(Error::connection(msg));
        }
        Ok(Box::new(MockSession { conn: self.clone() }))
    }
}

struct MockSession {
    conn: MockImapConnector,
}

impl ImapSession for MockSession {
    fn inbox_message_count(&mut self) -> Result<u32> {
        self.conn.record(RecordedAction::Status);
        Ok(self.conn.inbox.read().unwrap().len())
    }

    fn lock_inbox(&mut self) -> Result<()> {
        self.conn.record(RecordedAction::Examine);
        Ok(())
    }

    fn release_inbox(&mut self) -> Result<()> {
        self.conn.record(RecordedAction::Close);
        Ok(())
    }

    fn fetch_range(&mut self, seq_set: &str) -> Result<Vec<FetchedMessage>> {
        self.conn.record(RecordedAction::Fetch {
            seq_set: seq_set.to_string(),
        });
        if let Some(msg) = self.conn.failures.read().unwrap().fetch.clone() {
            return Err(Error::connection(msg));
        }
        self.conn.inbox.read().unwrap().fetch(seq_set).map_err(Error::connection)
    }

    fn logout(&mut self) -> Result<()> {
        self.conn.record(RecordedAction::Logout);
        match self.conn.failures.read().unwrap().logout.clone() {
            Some(msg) => Err(Error::connection(msg)),
            None => Ok(()),
        }
    }
}
