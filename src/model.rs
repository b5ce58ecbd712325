// src/model.rs
//
// Persisted entities. Field names serialize in camelCase so the document stays
// readable by the dashboard that shares it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    pub id: String,
    pub project_id: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub tls: bool,
    /// Advisory only; nothing schedules polls.
    pub polling_interval_minutes: u32,
    pub created_at: DateTime<Utc>,
}

/// Connection parameters of a mailbox that passed the credential check.
#[derive(Debug, Clone, PartialEq)]
pub struct ImapEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub tls: bool,
}

impl Mailbox {
    /// Host, user and password must all be non-blank before we touch the network.
    pub fn endpoint(&self) -> Result<ImapEndpoint> {
        let password = self.password.as_deref().unwrap_or_default();
        if self.host.trim().is_empty() || self.user.trim().is_empty() || password.trim().is_empty() {
            return Err(Error::MissingCredentials(
                "host, user, and password are required".to_string(),
            ));
        }
        Ok(ImapEndpoint {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: password.to_string(),
            tls: self.tls,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    pub mailbox_id: String,
    pub subject: String,
    pub sender: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// Scalar value of an extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl FieldValue {
    /// Parse a `key=value` style CLI literal: booleans and numbers are recognised,
    /// `null` maps to Null, anything else stays text.
    pub fn parse_literal(raw: &str) -> Self {
        match raw.trim() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            "null" => FieldValue::Null,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub id: String,
    pub email_id: String,
    pub lead: bool,
    pub confidence: f64,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
}

/// `Unknown` only appears when reading records written by other tools with a
/// missing or unrecognised category; fresh classifications never carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    LeadRequest,
    LeadSource,
    Normal,
    #[default]
    #[serde(other)]
    Unknown,
}

serde_plain::derive_display_from_serialize!(Category);
serde_plain::derive_fromstr_from_deserialize!(Category);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Cerebras,
}

serde_plain::derive_display_from_serialize!(ProviderKind);
serde_plain::derive_fromstr_from_deserialize!(ProviderKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactName {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub url: Option<String>,
    pub address: Option<String>,
}

/// Everything needed to replay or audit one provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationLog {
    pub provider: ProviderKind,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_text: String,
    pub latency_ms: u64,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub id: String,
    pub email_id: String,
    #[serde(default)]
    pub category: Category,
    pub source: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_name: Option<ContactName>,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub request_text: Option<String>,
    pub log: ClassificationLog,
    pub created_at: DateTime<Utc>,
}

/// The whole persisted state. Collections missing from older documents load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub mailboxes: Vec<Mailbox>,
    pub emails: Vec<Email>,
    pub parse_results: Vec<ParseResult>,
    pub classifications: Vec<Classification>,
}

impl Document {
    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Project", id))
    }

    pub fn project_mut(&mut self, id: &str) -> Result<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Project", id))
    }

    pub fn mailbox(&self, id: &str) -> Result<&Mailbox> {
        self.mailboxes
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::not_found("Mailbox", id))
    }

    pub fn mailbox_mut(&mut self, id: &str) -> Result<&mut Mailbox> {
        self.mailboxes
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::not_found("Mailbox", id))
    }

    pub fn email(&self, id: &str) -> Result<&Email> {
        self.emails
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::not_found("Email", id))
    }

    /// Drop any live classification for the email, then append the new one.
    pub fn supersede_classification(&mut self, classification: Classification) {
        self.classifications
            .retain(|c| c.email_id != classification.email_id);
        self.classifications.push(classification);
    }
}
