// src/message.rs

use chrono::{DateTime, Utc};
use mailparse::{addrparse_header, parse_header, parse_headers, MailAddr, MailHeaderMap};

use crate::client_ops::FetchedMessage;
use crate::model::Email;

/// Number of characters of raw source kept as the body preview.
pub const PREVIEW_CHARS: usize = 500;

pub const UNKNOWN_SENDER: &str = "unknown";
pub const NO_SUBJECT: &str = "(no subject)";

impl FetchedMessage {
    /// Build from raw RFC-2822 source alone, reading From/Subject/Date out of the headers.
    /// Used when the server returns no ENVELOPE.
    pub fn from_source(seq: u32, source: Vec<u8>) -> Self {
        let (from, subject, date) = match parse_headers(&source) {
            Ok((headers, _)) => {
                let from = headers
                    .get_first_header("From")
                    .and_then(|h| addrparse_header(h).ok())
                    .and_then(|addrs| first_address(&addrs));
                let subject = headers.get_first_value("Subject");
                let date = headers
                    .get_first_value("Date")
                    .and_then(|d| parse_date(d.as_bytes()));
                (from, subject, date)
            }
            Err(_) => (None, None, None),
        };

        FetchedMessage {
            seq,
            from,
            subject,
            date,
            source: Some(source),
        }
    }

    /// Normalize into a stored email record, filling the documented defaults.
    pub fn to_email(&self, id: String, mailbox_id: &str, now: DateTime<Utc>) -> Email {
        Email {
            id,
            mailbox_id: mailbox_id.to_string(),
            subject: self.subject.clone().unwrap_or_else(|| NO_SUBJECT.to_string()),
            sender: self.from.clone().unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            body: preview(self.source.as_deref()),
            received_at: self.date.unwrap_or(now),
        }
    }
}

/// First `PREVIEW_CHARS` characters of the raw source, lossily decoded.
pub fn preview(source: Option<&[u8]>) -> String {
    source
        .map(|raw| String::from_utf8_lossy(raw).chars().take(PREVIEW_CHARS).collect())
        .unwrap_or_default()
}

/// Decode an RFC-2047 encoded header value such as an envelope subject.
pub fn decode_header_value(name: &str, raw: &[u8]) -> String {
    let mut line = Vec::with_capacity(name.len() + 2 + raw.len());
    line.extend_from_slice(name.as_bytes());
    line.extend_from_slice(b": ");
    line.extend_from_slice(raw);
    match parse_header(&line) {
        Ok((header, _)) => header.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// RFC-2822 date to UTC; `None` when unparseable.
pub fn parse_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = String::from_utf8_lossy(raw);
    mailparse::dateparse(text.trim())
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
}

/// Join envelope address parts into `mailbox@host`.
pub fn envelope_address(mailbox: Option<&[u8]>, host: Option<&[u8]>) -> Option<String> {
    let mailbox = String::from_utf8_lossy(mailbox?).into_owned();
    match host {
        Some(host) if !host.is_empty() => Some(format!("{}@{}", mailbox, String::from_utf8_lossy(host))),
        _ => Some(mailbox),
    }
}

fn first_address(addrs: &[MailAddr]) -> Option<String> {
    addrs.iter().find_map(|addr| match addr {
        MailAddr::Single(info) => Some(info.addr.clone()),
        MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_source() -> Vec<u8> {
        b"From: Test User <test@example.com>\r\n\
          To: recipient@example.com\r\n\
          Subject: =?UTF-8?Q?Anfrage_f=C3=BCr_Wohnung?=\r\n\
          Date: Mon, 15 Jan 2024 10:00:00 +0000\r\n\
          \r\n\
          Hello, I would like to view the flat.\r\n"
            .to_vec()
    }

    #[test]
    fn test_from_source_parses_headers() {
        let msg = FetchedMessage::from_source(7, make_test_source());
        assert_eq!(msg.seq, 7);
        assert_eq!(msg.from.as_deref(), Some("test@example.com"));
        assert_eq!(msg.subject.as_deref(), Some("Anfrage für Wohnung"));
        assert_eq!(
            msg.date,
            Some(DateTime::parse_from_rfc3339("2024-01-15T10:00:00+00:00").unwrap().with_timezone(&Utc))
        );
    }

    #[test]
    fn test_to_email_fills_defaults() {
        let now = Utc::now();
        let msg = FetchedMessage { seq: 1, ..Default::default() };
        let email = msg.to_email("eml_1".to_string(), "mbx_1", now);

        assert_eq!(email.sender, UNKNOWN_SENDER);
        assert_eq!(email.subject, NO_SUBJECT);
        assert_eq!(email.received_at, now);
        assert_eq!(email.body, "");
        assert_eq!(email.mailbox_id, "mbx_1");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        let long = "ä".repeat(PREVIEW_CHARS + 50);
        let out = preview(Some(long.as_bytes()));
        assert_eq!(out.chars().count(), PREVIEW_CHARS);

        let short = preview(Some(b"short body"));
        assert_eq!(short, "short body");
    }

    #[test]
    fn test_decode_header_value_plain_and_encoded() {
        assert_eq!(decode_header_value("Subject", b"Plain subject"), "Plain subject");
        assert_eq!(decode_header_value("Subject", b"=?UTF-8?B?SGFsbG8=?="), "Hallo");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date(b"not a date").is_none());
        assert!(parse_date(b"Tue, 1 Jul 2003 10:52:37 +0200").is_some());
    }

    #[test]
    fn test_envelope_address() {
        assert_eq!(
            envelope_address(Some(b"jane"), Some(b"example.com")).as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(envelope_address(None, Some(b"example.com")), None);
    }
}
