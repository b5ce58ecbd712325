// tests/harness/virtual_mailbox.rs
//
// In-memory INBOX. Messages are addressed by 1-based sequence number the way
// an IMAP server numbers them.

use chrono::{DateTime, Utc};

use mailbox_leads::client_ops::FetchedMessage;

#[derive(Debug, Clone)]
pub struct InboxMessage {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub body: String,
}

impl InboxMessage {
    pub fn new(from: &str, subject: &str, body: &str) -> Self {
        Self {
            from: Some(from.to_string()),
            subject: Some(subject.to_string()),
            date: None,
            body: body.to_string(),
        }
    }

    /// A message with no usable envelope at all.
    pub fn bare(body: &str) -> Self {
        Self {
            from: None,
            subject: None,
            date: None,
            body: body.to_string(),
        }
    }

    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn source(&self) -> String {
        let mut out = String::new();
        if let Some(from) = &self.from {
            out.push_str(&format!("From: {}\r\n", from));
        }
        if let Some(subject) = &self.subject {
            out.push_str(&format!("Subject: {}\r\n", subject));
        }
        if let Some(date) = &self.date {
            out.push_str(&format!("Date: {}\r\n", date.to_rfc2822()));
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }
}

#[derive(Debug, Default)]
pub struct VirtualInbox {
    messages: Vec<InboxMessage>,
}

impl VirtualInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: InboxMessage) -> u32 {
        self.messages.push(message);
        self.messages.len() as u32
    }

    pub fn len(&self) -> u32 {
        self.messages.len() as u32
    }

    /// Resolve `N`, `N:M` or `N:*` against the current sequence numbers.
    pub fn fetch(&self, seq_set: &str) -> Result<Vec<FetchedMessage>, String> {
        let (start, end) = match seq_set.split_once(':') {
            Some((s, "*")) => (parse_seq(s)?, self.len()),
            Some((s, e)) => (parse_seq(s)?, parse_seq(e)?),
            None => {
                let n = parse_seq(seq_set)?;
                (n, n)
            }
        };
        Ok(self
            .messages
            .iter()
            .enumerate()
            .map(|(i, m)| (i as u32 + 1, m))
            .filter(|(seq, _)| *seq >= start && *seq <= end)
            .map(|(seq, m)| FetchedMessage {
                seq,
                from: m.from.clone(),
                subject: m.subject.clone(),
                date: m.date,
                source: Some(m.source().into_bytes()),
            })
            .collect())
    }
}

fn parse_seq(raw: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("BAD sequence number '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_open_range() {
        let mut inbox = VirtualInbox::new();
        for i in 1..=10 {
            inbox.add(InboxMessage::new("a@b.c", &format!("msg {}", i), "hi"));
        }
        let fetched = inbox.fetch("9:*").unwrap();
        let seqs: Vec<u32> = fetched.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![9, 10]);
        assert_eq!(fetched[0].subject.as_deref(), Some("msg 9"));
    }

    #[test]
    fn test_fetch_rejects_zero() {
        let inbox = VirtualInbox::new();
        assert!(inbox.fetch("0:*").is_err());
    }
}
