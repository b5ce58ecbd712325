// src/cli.rs

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use secure_string::SecureString;
use std::path::PathBuf;

use mailbox_leads::model::FieldValue;

/// Command-line interface options for mailbox-leads.
#[derive(Parser, Debug)]
#[command(
    name = "mailbox-leads",
    version = env!("GIT_DESCRIBE"),
    about = "Sync IMAP mailboxes and classify emails into leads",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON document store
    #[arg(short = 'S', long, env = "MAILBOX_LEADS_STORE")]
    pub store: Option<PathBuf>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<SecureString>,

    #[arg(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    #[arg(long, env = "CEREBRAS_API_KEY", hide_env_values = true)]
    pub cerebras_api_key: Option<SecureString>,

    #[arg(long, env = "CEREBRAS_MODEL")]
    pub cerebras_model: Option<String>,

    #[arg(short, long, help = "turn on debug logging")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCmd),

    /// Manage mailboxes, sync and classify them
    #[command(subcommand)]
    Mailbox(MailboxCmd),

    /// Ingest or classify single emails
    #[command(subcommand)]
    Email(EmailCmd),

    /// Suggest IMAP settings for an email address
    Resolve { email: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCmd {
    Create { name: String },
    Rename { id: String, name: String },
    List,
    Show { id: String },
    /// Emails across all mailboxes of the project
    Emails { id: String },
}

#[derive(clap::Args, Debug, Default)]
pub struct MailboxArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub user: Option<String>,

    /// Empty string clears a stored password
    #[arg(long)]
    pub password: Option<SecureString>,

    #[arg(long)]
    pub tls: Option<bool>,

    #[arg(long)]
    pub poll_minutes: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum MailboxCmd {
    Create {
        project_id: String,
        #[command(flatten)]
        settings: MailboxArgs,
    },
    Update {
        id: String,
        #[command(flatten)]
        settings: MailboxArgs,
    },
    /// Delete the mailbox and all of its emails
    Delete { id: String },
    List { project_id: String },
    /// Mailbox with its emails, parse results and classifications
    Show { id: String },
    Sync {
        id: String,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Verify the IMAP login without fetching
    Test { id: String },
    /// Delete every email of the mailbox, keeping the mailbox
    Clear { id: String },
    Classify {
        id: String,
        #[arg(short, long)]
        provider: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EmailCmd {
    Ingest {
        mailbox_id: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        sender: String,
        #[arg(long)]
        body: Option<String>,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        received_at: Option<DateTime<Utc>>,
        /// Attach a parse result marking this email as a lead
        #[arg(long)]
        lead: Option<bool>,
        #[arg(long)]
        confidence: Option<f64>,
        /// Extracted field as key=value; repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, FieldValue)>,
    },
    Classify {
        id: String,
        #[arg(short, long)]
        provider: Option<String>,
    },
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{}'", raw));
    }
    Ok((key.to_string(), FieldValue::parse_literal(value)))
}
