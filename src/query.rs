// src/query.rs
//
// Read-side views that join emails with their parse results and
// classifications, plus the cascading clear of a mailbox's history.

use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::client_ops::Clock;
use crate::error::Result;
use crate::model::{Classification, Document, Email, Mailbox, ParseResult};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailListing {
    pub emails: Vec<Email>,
    /// Keyed by email id; the newest parse result per email.
    pub parse_results: BTreeMap<String, ParseResult>,
    /// Keyed by email id; the live classification per email.
    pub classifications: BTreeMap<String, Classification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailboxView {
    pub mailbox: Mailbox,
    #[serde(flatten)]
    pub listing: EmailListing,
}

/// Newest parse result per email (latest `created_at`; on a tie the one stored last).
pub fn latest_parse_results(doc: &Document, email_ids: &HashSet<&str>) -> BTreeMap<String, ParseResult> {
    let mut out: BTreeMap<String, ParseResult> = BTreeMap::new();
    for pr in doc.parse_results.iter().filter(|pr| email_ids.contains(pr.email_id.as_str())) {
        match out.get(&pr.email_id) {
            Some(current) if current.created_at > pr.created_at => {}
            _ => {
                out.insert(pr.email_id.clone(), pr.clone());
            }
        }
    }
    out
}

fn listing(doc: &Document, emails: Vec<Email>) -> EmailListing {
    let ids: HashSet<&str> = emails.iter().map(|e| e.id.as_str()).collect();
    let parse_results = latest_parse_results(doc, &ids);
    let classifications = doc
        .classifications
        .iter()
        .filter(|c| ids.contains(c.email_id.as_str()))
        .map(|c| (c.email_id.clone(), c.clone()))
        .collect();
    EmailListing {
        emails,
        parse_results,
        classifications,
    }
}

pub fn emails_for_mailbox(doc: &Document, mailbox_id: &str) -> Result<MailboxView> {
    let mailbox = doc.mailbox(mailbox_id)?.clone();
    let emails = doc
        .emails
        .iter()
        .filter(|e| e.mailbox_id == mailbox_id)
        .cloned()
        .collect();
    Ok(MailboxView {
        mailbox,
        listing: listing(doc, emails),
    })
}

/// Emails across every mailbox the project owns.
pub fn emails_for_project(doc: &Document, project_id: &str) -> Result<EmailListing> {
    doc.project(project_id)?;
    let mailbox_ids: HashSet<&str> = doc
        .mailboxes
        .iter()
        .filter(|m| m.project_id == project_id)
        .map(|m| m.id.as_str())
        .collect();
    let emails = doc
        .emails
        .iter()
        .filter(|e| mailbox_ids.contains(e.mailbox_id.as_str()))
        .cloned()
        .collect();
    Ok(listing(doc, emails))
}

/// Drop the mailbox's emails and their parse results and classifications.
/// Returns the number of emails removed.
pub(crate) fn remove_mailbox_emails(doc: &mut Document, mailbox_id: &str) -> usize {
    let email_ids: HashSet<String> = doc
        .emails
        .iter()
        .filter(|e| e.mailbox_id == mailbox_id)
        .map(|e| e.id.clone())
        .collect();
    doc.emails.retain(|e| e.mailbox_id != mailbox_id);
    doc.parse_results.retain(|pr| !email_ids.contains(&pr.email_id));
    doc.classifications.retain(|c| !email_ids.contains(&c.email_id));
    email_ids.len()
}

/// Irreversibly delete the mailbox's email history. The mailbox itself stays.
pub fn clear_mailbox_emails<C: Clock>(store: &Store<C>, mailbox_id: &str) -> Result<usize> {
    let cleared = store.update(|doc| {
        doc.mailbox(mailbox_id)?;
        Ok(remove_mailbox_emails(doc, mailbox_id))
    })?;
    info!("Cleared {} emails from mailbox {}", cleared, mailbox_id);
    Ok(cleared)
}
