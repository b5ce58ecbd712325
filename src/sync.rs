// src/sync.rs
//
// Pulls the most recent messages of a mailbox's INBOX into stored email records.

use log::{debug, info, warn};
use serde::Serialize;

use crate::client_ops::{Clock, FetchedMessage, ImapConnector, ImapSession};
use crate::error::Result;
use crate::model::{Email, ImapEndpoint};
use crate::store::Store;

pub const DEFAULT_FETCH_LIMIT: u32 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub fetched: usize,
    pub message: String,
    #[serde(skip)]
    pub emails: Vec<Email>,
}

/// 1-based sequence set covering the newest `limit` of `total` messages.
pub fn sequence_range(total: u32, limit: u32) -> String {
    let start = total.saturating_sub(limit).saturating_add(1).max(1);
    format!("{}:*", start)
}

pub struct MailboxSynchronizer<'a, K: ImapConnector, C: Clock> {
    store: &'a Store<C>,
    connector: K,
}

impl<'a, K: ImapConnector, C: Clock> MailboxSynchronizer<'a, K, C> {
    pub fn new(store: &'a Store<C>, connector: K) -> Self {
        MailboxSynchronizer { store, connector }
    }

    /// Fetch the newest `limit` messages and append them as emails.
    /// Nothing is written unless the whole fetch succeeded.
    pub fn sync(&self, mailbox_id: &str, limit: u32) -> Result<SyncReport> {
        let endpoint = self.store.load()?.mailbox(mailbox_id)?.endpoint()?;
        let limit = limit.max(1);
        info!("Syncing mailbox {} ({}@{}), limit {}", mailbox_id, endpoint.user, endpoint.host, limit);

        let fetched = self.with_session(&endpoint, |session| fetch_recent(session, limit))?;
        if fetched.is_empty() {
            info!("Mailbox {} has no messages", mailbox_id);
            return Ok(SyncReport {
                fetched: 0,
                message: "No emails found.".to_string(),
                emails: vec![],
            });
        }

        let emails = self.store.update(|doc| {
            doc.mailbox(mailbox_id)?;
            let now = self.store.now();
            let emails: Vec<Email> = fetched
                .iter()
                .map(|msg| msg.to_email(self.store.new_id("eml"), mailbox_id, now))
                .collect();
            doc.emails.extend(emails.iter().cloned());
            Ok(emails)
        })?;

        info!("✅ Stored {} emails for mailbox {}", emails.len(), mailbox_id);
        Ok(SyncReport {
            fetched: emails.len(),
            message: format!("Fetched {} emails.", emails.len()),
            emails,
        })
    }

    /// Connect, authenticate and log out without touching the inbox.
    pub fn test_connection(&self, mailbox_id: &str) -> Result<String> {
        let endpoint = self.store.load()?.mailbox(mailbox_id)?.endpoint()?;
        info!("Testing IMAP login for mailbox {} at {}:{}", mailbox_id, endpoint.host, endpoint.port);
        let mut session = self.connector.connect(&endpoint)?;
        session.logout()?;
        Ok("Connection successful. IMAP login verified.".to_string())
    }

    /// Run `f` on a fresh session and always attempt LOGOUT afterwards.
    /// A logout failure is logged and never replaces `f`'s result.
    fn with_session<T, F>(&self, endpoint: &ImapEndpoint, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ImapSession) -> Result<T>,
    {
        let mut session = self.connector.connect(endpoint)?;
        let result = f(session.as_mut());
        if let Err(e) = session.logout() {
            warn!("Ignoring logout failure on {}: {}", endpoint.host, e);
        }
        result
    }
}

fn fetch_recent(session: &mut dyn ImapSession, limit: u32) -> Result<Vec<FetchedMessage>> {
    let total = session.inbox_message_count()?;
    debug!("INBOX holds {} messages", total);
    if total == 0 {
        return Ok(vec![]);
    }

    session.lock_inbox()?;
    let range = sequence_range(total, limit);
    debug!("FETCHing sequence range {}", range);
    let fetched = session.fetch_range(&range);
    let released = session.release_inbox();

    let messages = fetched?;
    if let Err(e) = released {
        warn!("Failed to release INBOX after fetch: {}", e);
    }
    Ok(messages)
}
