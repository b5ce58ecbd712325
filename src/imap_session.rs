// src/imap_session.rs
//
// Real IMAP sessions over the `imap` crate, TLS or plain TCP.

use imap::Session;
use log::debug;
use native_tls::TlsConnector;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::client_ops::{FetchedMessage, ImapConnector, ImapSession};
use crate::error::{Error, Result};
use crate::message::{decode_header_value, envelope_address, parse_date};
use crate::model::ImapEndpoint;

const INBOX: &str = "INBOX";

/// Connects with a per-socket read/write deadline so a hung server fails the call.
pub struct NetworkConnector {
    timeout: Duration,
}

impl NetworkConnector {
    pub fn new(timeout: Duration) -> Self {
        NetworkConnector { timeout }
    }

    fn tcp(&self, endpoint: &ImapEndpoint) -> Result<TcpStream> {
        let addr = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(Error::connection)?
            .next()
            .ok_or_else(|| Error::Connection(format!("No address for {}", endpoint.host)))?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(Error::connection)?;
        stream.set_read_timeout(Some(self.timeout)).map_err(Error::connection)?;
        stream.set_write_timeout(Some(self.timeout)).map_err(Error::connection)?;
        Ok(stream)
    }
}

fn login<T>(stream: T, endpoint: &ImapEndpoint) -> Result<Box<dyn ImapSession>>
where
    T: Read + Write + 'static,
{
    let mut client = imap::Client::new(stream);
    client.read_greeting().map_err(Error::connection)?;
    let session = client
        .login(&endpoint.user, &endpoint.password)
        .map_err(|(e, _)| Error::Connection(format!("login failed: {}", e)))?;
    debug!("Logged in to {}:{} as {}", endpoint.host, endpoint.port, endpoint.user);
    Ok(Box::new(LiveSession { session }))
}

impl ImapConnector for NetworkConnector {
    fn connect(&self, endpoint: &ImapEndpoint) -> Result<Box<dyn ImapSession>> {
        debug!(
            "Connecting to {}:{} (tls={})",
            endpoint.host, endpoint.port, endpoint.tls
        );
        let tcp = self.tcp(endpoint)?;
        if endpoint.tls {
            let tls = TlsConnector::builder().build().map_err(Error::connection)?;
            let stream = tls
                .connect(&endpoint.host, tcp)
                .map_err(|e| Error::Connection(format!("TLS handshake failed: {}", e)))?;
            login(stream, endpoint)
        } else {
            login(tcp, endpoint)
        }
    }
}

struct LiveSession<T: Read + Write> {
    session: Session<T>,
}

impl<T: Read + Write> ImapSession for LiveSession<T> {
    fn inbox_message_count(&mut self) -> Result<u32> {
        let status = self
            .session
            .status(INBOX, "(MESSAGES)")
            .map_err(Error::connection)?;
        Ok(status.exists)
    }

    fn lock_inbox(&mut self) -> Result<()> {
        // EXAMINE: read-only selection, so fetching RFC822 does not set \Seen.
        self.session.examine(INBOX).map_err(Error::connection)?;
        Ok(())
    }

    fn release_inbox(&mut self) -> Result<()> {
        self.session.close().map_err(Error::connection)
    }

    fn fetch_range(&mut self, seq_set: &str) -> Result<Vec<FetchedMessage>> {
        let fetches = self
            .session
            .fetch(seq_set, "(ENVELOPE RFC822)")
            .map_err(Error::connection)?;
        debug!("FETCH {} returned {} records", seq_set, fetches.len());

        let mut out = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            let source = fetch.body().map(|b| b.to_vec());
            let msg = match fetch.envelope() {
                Some(env) => FetchedMessage {
                    seq: fetch.message,
                    from: env
                        .from
                        .as_ref()
                        .and_then(|addrs| addrs.first())
                        .and_then(|a| envelope_address(a.mailbox, a.host)),
                    subject: env.subject.map(|s| decode_header_value("Subject", s)),
                    date: env.date.and_then(parse_date),
                    source,
                },
                None => match source {
                    Some(raw) => FetchedMessage::from_source(fetch.message, raw),
                    None => FetchedMessage { seq: fetch.message, ..Default::default() },
                },
            };
            out.push(msg);
        }
        Ok(out)
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout().map_err(Error::connection)
    }
}
