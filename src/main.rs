use clap::Parser;
use env_logger::Builder;
use eyre::{eyre, Result};
use log::{debug, LevelFilter};
use secure_string::SecureString;
use serde::Serialize;
use serde_json::{json, Value};

use mailbox_leads::cfg::config::{load_config, Config, ProviderSettings};
use mailbox_leads::classify::Classifier;
use mailbox_leads::imap_session::NetworkConnector;
use mailbox_leads::llm::{build_provider, select_provider};
use mailbox_leads::model::Mailbox;
use mailbox_leads::ops::{self, MailboxUpdate, NewEmail, NewMailbox, ParseInput};
use mailbox_leads::query;
use mailbox_leads::resolver::{DnsMxLookup, ProviderDirectory};
use mailbox_leads::sync::MailboxSynchronizer;
use mailbox_leads::Store;

mod cli;

use cli::{Cli, Command, EmailCmd, MailboxArgs, MailboxCmd, ProjectCmd};

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    Builder::new()
        .filter_level(if cli.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .try_init()
        .ok();

    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &mut cli);
    debug!("Using store {}", config.store_path.display());

    let store = Store::open(&config.store_path);
    let output = run(cli.command, &store, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Command-line and environment values win over the config file.
fn apply_overrides(config: &mut Config, cli: &mut Cli) {
    if let Some(path) = cli.store.take() {
        config.store_path = path;
    }
    override_provider(&mut config.providers.openai, cli.openai_api_key.take(), cli.openai_model.take());
    override_provider(&mut config.providers.cerebras, cli.cerebras_api_key.take(), cli.cerebras_model.take());
}

fn override_provider(settings: &mut ProviderSettings, key: Option<SecureString>, model: Option<String>) {
    if key.is_some() {
        settings.api_key = key;
    }
    if model.is_some() {
        settings.model = model;
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn redact(mut mailbox: Mailbox) -> Mailbox {
    if mailbox.password.as_deref().is_some_and(|p| !p.is_empty()) {
        mailbox.password = Some("********".to_string());
    }
    mailbox
}

fn run(command: Command, store: &Store, config: &Config) -> Result<Value> {
    match command {
        Command::Project(cmd) => run_project(cmd, store),
        Command::Mailbox(cmd) => run_mailbox(cmd, store, config),
        Command::Email(cmd) => run_email(cmd, store, config),
        Command::Resolve { email } => {
            let directory = ProviderDirectory::new(DnsMxLookup::new(config.request_timeout())?)?;
            to_json(directory.resolve(&email)?)
        }
    }
}

fn run_project(cmd: ProjectCmd, store: &Store) -> Result<Value> {
    match cmd {
        ProjectCmd::Create { name } => to_json(ops::create_project(store, &name)?),
        ProjectCmd::Rename { id, name } => to_json(ops::rename_project(store, &id, &name)?),
        ProjectCmd::List => to_json(ops::list_projects(store)?),
        ProjectCmd::Show { id } => {
            let project = ops::get_project(store, &id)?;
            let mailboxes: Vec<Mailbox> = ops::list_mailboxes(store, &id)?.into_iter().map(redact).collect();
            Ok(json!({ "project": project, "mailboxes": mailboxes }))
        }
        ProjectCmd::Emails { id } => to_json(query::emails_for_project(&store.load()?, &id)?),
    }
}

fn mailbox_update(settings: MailboxArgs) -> MailboxUpdate {
    MailboxUpdate {
        host: settings.host,
        port: settings.port,
        user: settings.user,
        password: settings.password.map(|p| p.unsecure().to_string()),
        tls: settings.tls,
        polling_interval_minutes: settings.poll_minutes,
    }
}

fn run_mailbox(cmd: MailboxCmd, store: &Store, config: &Config) -> Result<Value> {
    let connector = || NetworkConnector::new(config.request_timeout());
    match cmd {
        MailboxCmd::Create { project_id, settings } => {
            let update = mailbox_update(settings);
            let input = NewMailbox {
                host: update.host.ok_or_else(|| eyre!("--host is required"))?,
                user: update.user.ok_or_else(|| eyre!("--user is required"))?,
                port: update.port,
                password: update.password,
                tls: update.tls,
                polling_interval_minutes: update.polling_interval_minutes,
            };
            to_json(redact(ops::create_mailbox(store, &project_id, input)?))
        }
        MailboxCmd::Update { id, settings } => {
            to_json(redact(ops::update_mailbox(store, &id, mailbox_update(settings))?))
        }
        MailboxCmd::Delete { id } => {
            let removed = ops::delete_mailbox(store, &id)?;
            Ok(json!({ "deleted": id, "emailsRemoved": removed }))
        }
        MailboxCmd::List { project_id } => {
            let mailboxes: Vec<Mailbox> = ops::list_mailboxes(store, &project_id)?.into_iter().map(redact).collect();
            to_json(mailboxes)
        }
        MailboxCmd::Show { id } => {
            let mut view = query::emails_for_mailbox(&store.load()?, &id)?;
            view.mailbox = redact(view.mailbox);
            to_json(view)
        }
        MailboxCmd::Sync { id, limit } => {
            let synchronizer = MailboxSynchronizer::new(store, connector());
            to_json(synchronizer.sync(&id, limit.unwrap_or(config.sync_limit))?)
        }
        MailboxCmd::Test { id } => {
            let synchronizer = MailboxSynchronizer::new(store, connector());
            let message = synchronizer.test_connection(&id)?;
            Ok(json!({ "ok": true, "message": message }))
        }
        MailboxCmd::Clear { id } => {
            let cleared = query::clear_mailbox_emails(store, &id)?;
            Ok(json!({ "cleared": cleared }))
        }
        MailboxCmd::Classify { id, provider } => {
            let provider = build_provider(select_provider(provider.as_deref()), &config.providers, config.request_timeout())?;
            to_json(Classifier::new(store, provider.as_ref()).classify_mailbox(&id)?)
        }
    }
}

fn run_email(cmd: EmailCmd, store: &Store, config: &Config) -> Result<Value> {
    match cmd {
        EmailCmd::Ingest {
            mailbox_id,
            subject,
            sender,
            body,
            received_at,
            lead,
            confidence,
            fields,
        } => {
            let parse = if lead.is_some() || confidence.is_some() || !fields.is_empty() {
                Some(ParseInput {
                    lead,
                    confidence,
                    fields: fields.into_iter().collect(),
                })
            } else {
                None
            };
            let input = NewEmail {
                mailbox_id,
                subject,
                sender,
                body,
                received_at,
                parse,
            };
            to_json(ops::ingest_email(store, input)?)
        }
        EmailCmd::Classify { id, provider } => {
            let provider = build_provider(select_provider(provider.as_deref()), &config.providers, config.request_timeout())?;
            to_json(Classifier::new(store, provider.as_ref()).classify_email(&id)?)
        }
    }
}
