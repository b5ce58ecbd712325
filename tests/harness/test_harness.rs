// tests/harness/test_harness.rs
//
// High-level test harness: a temp-dir store on a virtual clock plus a mock
// IMAP server, with helpers to seed projects, mailboxes and messages.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tempfile::TempDir;

use mailbox_leads::model::{Email, Mailbox, Project};
use mailbox_leads::ops::{self, NewEmail, NewMailbox};
use mailbox_leads::sync::MailboxSynchronizer;
use mailbox_leads::Store;

use crate::harness::mock_client::MockImapConnector;
use crate::harness::virtual_clock::VirtualClock;
use crate::harness::virtual_mailbox::{InboxMessage, VirtualInbox};

pub struct TestHarness {
    pub dir: TempDir,
    pub clock: VirtualClock,
    pub store: Store<VirtualClock>,
    pub inbox: Arc<RwLock<VirtualInbox>>,
    pub imap: MockImapConnector,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::at_time(
            DateTime::parse_from_rfc3339("2024-01-15T10:00:00+00:00")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    pub fn at_time(time: DateTime<Utc>) -> Self {
        let dir = TempDir::new().unwrap();
        let clock = VirtualClock::at(time);
        let store = Store::with_clock(dir.path().join("data").join("db.json"), clock.clone());
        let inbox = Arc::new(RwLock::new(VirtualInbox::new()));
        let imap = MockImapConnector::new(Arc::clone(&inbox));
        Self {
            dir,
            clock,
            store,
            inbox,
            imap,
        }
    }

    /// A second handle on the same document file, as another process would open it.
    pub fn reopen(&self) -> Store<VirtualClock> {
        Store::with_clock(self.store.path().to_path_buf(), self.clock.clone())
    }

    // ===== Seeding =====

    pub fn project(&self, name: &str) -> Project {
        ops::create_project(&self.store, name).unwrap()
    }

    pub fn mailbox(&self, project_id: &str, password: Option<&str>) -> Mailbox {
        ops::create_mailbox(
            &self.store,
            project_id,
            NewMailbox {
                host: "imap.acme.test".to_string(),
                user: "leads@acme.test".to_string(),
                password: password.map(String::from),
                ..Default::default()
            },
        )
        .unwrap()
    }

    pub fn ingest(&self, mailbox_id: &str, subject: &str) -> Email {
        self.clock.advance_minutes(1);
        ops::ingest_email(
            &self.store,
            NewEmail {
                mailbox_id: mailbox_id.to_string(),
                subject: subject.to_string(),
                sender: "kunde@example.de".to_string(),
                body: Some(format!("Body of {}", subject)),
                ..Default::default()
            },
        )
        .unwrap()
        .email
    }

    pub fn add_messages(&self, count: u32) {
        let mut inbox = self.inbox.write().unwrap();
        for i in 1..=count {
            inbox.add(InboxMessage::new(
                &format!("sender{}@example.de", i),
                &format!("Message {}", i),
                &format!("Body {}", i),
            ));
        }
    }

    pub fn add_message(&self, message: InboxMessage) -> u32 {
        self.inbox.write().unwrap().add(message)
    }

    pub fn synchronizer(&self) -> MailboxSynchronizer<'_, MockImapConnector, VirtualClock> {
        MailboxSynchronizer::new(&self.store, self.imap.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
