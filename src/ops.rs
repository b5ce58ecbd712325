// src/ops.rs
//
// Project, mailbox and manual-ingest operations. Each call is one atomic
// store update; validation runs before anything is loaded.

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::client_ops::Clock;
use crate::error::{Error, Result};
use crate::model::{Email, FieldValue, Mailbox, ParseResult, Project};
use crate::query::remove_mailbox_emails;
use crate::store::Store;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_POLL_MINUTES: u32 = 30;

fn required<'s>(value: &'s str, what: &str) -> Result<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} required", what)));
    }
    Ok(trimmed)
}

pub fn create_project<C: Clock>(store: &Store<C>, name: &str) -> Result<Project> {
    let name = required(name, "Project name")?;
    let project = store.update(|doc| {
        let project = Project {
            id: store.new_id("proj"),
            name: name.to_string(),
            created_at: store.now(),
        };
        doc.projects.push(project.clone());
        Ok(project)
    })?;
    info!("Created project {} ({})", project.id, project.name);
    Ok(project)
}

pub fn rename_project<C: Clock>(store: &Store<C>, id: &str, name: &str) -> Result<Project> {
    let name = required(name, "Project name")?;
    store.update(|doc| {
        let project = doc.project_mut(id)?;
        project.name = name.to_string();
        Ok(project.clone())
    })
}

pub fn list_projects<C: Clock>(store: &Store<C>) -> Result<Vec<Project>> {
    Ok(store.load()?.projects)
}

pub fn get_project<C: Clock>(store: &Store<C>, id: &str) -> Result<Project> {
    Ok(store.load()?.project(id)?.clone())
}

#[derive(Debug, Clone, Default)]
pub struct NewMailbox {
    pub host: String,
    pub user: String,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    pub polling_interval_minutes: Option<u32>,
}

pub fn create_mailbox<C: Clock>(store: &Store<C>, project_id: &str, input: NewMailbox) -> Result<Mailbox> {
    let host = required(&input.host, "Host and user")?;
    let user = required(&input.user, "Host and user")?;
    let mailbox = store.update(|doc| {
        doc.project(project_id)?;
        let mailbox = Mailbox {
            id: store.new_id("mbx"),
            project_id: project_id.to_string(),
            host: host.to_string(),
            port: input.port.unwrap_or(DEFAULT_IMAP_PORT),
            user: user.to_string(),
            password: input.password.as_deref().map(|p| p.trim().to_string()),
            tls: input.tls.unwrap_or(true),
            polling_interval_minutes: input.polling_interval_minutes.unwrap_or(DEFAULT_POLL_MINUTES),
            created_at: store.now(),
        };
        doc.mailboxes.push(mailbox.clone());
        Ok(mailbox)
    })?;
    info!("Created mailbox {} for {}@{}", mailbox.id, mailbox.user, mailbox.host);
    Ok(mailbox)
}

pub fn list_mailboxes<C: Clock>(store: &Store<C>, project_id: &str) -> Result<Vec<Mailbox>> {
    let doc = store.load()?;
    doc.project(project_id)?;
    Ok(doc
        .mailboxes
        .into_iter()
        .filter(|m| m.project_id == project_id)
        .collect())
}

/// Partial update. Blank host/user keep the old value; a given password is
/// stored trimmed, so an empty one clears it.
#[derive(Debug, Clone, Default)]
pub struct MailboxUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    pub polling_interval_minutes: Option<u32>,
}

pub fn update_mailbox<C: Clock>(store: &Store<C>, id: &str, update: MailboxUpdate) -> Result<Mailbox> {
    store.update(|doc| {
        let mailbox = doc.mailbox_mut(id)?;
        if let Some(host) = update.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            mailbox.host = host.to_string();
        }
        if let Some(user) = update.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            mailbox.user = user.to_string();
        }
        if let Some(password) = update.password.as_deref() {
            mailbox.password = Some(password.trim().to_string());
        }
        if let Some(port) = update.port {
            mailbox.port = port;
        }
        if let Some(tls) = update.tls {
            mailbox.tls = tls;
        }
        if let Some(minutes) = update.polling_interval_minutes {
            mailbox.polling_interval_minutes = minutes;
        }
        Ok(mailbox.clone())
    })
}

/// Remove the mailbox and everything hanging off it. Returns the number of emails removed.
pub fn delete_mailbox<C: Clock>(store: &Store<C>, id: &str) -> Result<usize> {
    let removed = store.update(|doc| {
        doc.mailbox(id)?;
        let removed = remove_mailbox_emails(doc, id);
        doc.mailboxes.retain(|m| m.id != id);
        Ok(removed)
    })?;
    info!("Deleted mailbox {} and {} emails", id, removed);
    Ok(removed)
}

#[derive(Debug, Clone, Default)]
pub struct ParseInput {
    pub lead: Option<bool>,
    pub confidence: Option<f64>,
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, Default)]
pub struct NewEmail {
    pub mailbox_id: String,
    pub subject: String,
    pub sender: String,
    pub body: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub parse: Option<ParseInput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingested {
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_result: Option<ParseResult>,
}

pub fn ingest_email<C: Clock>(store: &Store<C>, input: NewEmail) -> Result<Ingested> {
    if input.mailbox_id.trim().is_empty() || input.subject.trim().is_empty() || input.sender.trim().is_empty() {
        return Err(Error::validation("mailboxId, subject, sender required"));
    }
    if let Some(c) = input.parse.as_ref().and_then(|p| p.confidence) {
        if !(0.0..=1.0).contains(&c) {
            return Err(Error::validation(format!("confidence must be within 0..1, got {}", c)));
        }
    }

    store.update(|doc| {
        doc.mailbox(&input.mailbox_id)?;
        let email = Email {
            id: store.new_id("email"),
            mailbox_id: input.mailbox_id.clone(),
            subject: input.subject.clone(),
            sender: input.sender.clone(),
            body: input.body.clone().unwrap_or_default(),
            received_at: input.received_at.unwrap_or_else(|| store.now()),
        };
        doc.emails.push(email.clone());

        let parse_result = input.parse.as_ref().map(|p| ParseResult {
            id: store.new_id("parse"),
            email_id: email.id.clone(),
            lead: p.lead.unwrap_or(false),
            confidence: p.confidence.unwrap_or(0.0),
            fields: p.fields.clone(),
            created_at: store.now(),
        });
        if let Some(pr) = &parse_result {
            doc.parse_results.push(pr.clone());
        }

        Ok(Ingested { email, parse_result })
    })
}
