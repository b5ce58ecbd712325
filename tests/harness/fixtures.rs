// tests/harness/fixtures.rs
//
// Canned provider answers and raw message sources.

/// A well-formed lead request, the shape the prompt asks for.
pub const LEAD_REQUEST_JSON: &str = r#"{
  "category": "lead_request",
  "source": null,
  "confidence": 0.92,
  "contact_email": "max.mustermann@example.de",
  "contact_name": {"first_name": "Max", "last_name": "Mustermann"},
  "company": {"name": "Muster GmbH", "domain": "muster.de", "url": null, "address": ""},
  "phones": ["+49 30 1234567", 301234568],
  "request_text": "Ich interessiere mich für die Wohnung in Berlin-Mitte."
}"#;

pub const LEAD_SOURCE_JSON: &str = r#"{"category":"lead_source","source":"ImmoScout24","confidence":"0.8"}"#;

pub const NORMAL_JSON: &str = r#"{"category":"normal","source":"ignored","confidence":0.1}"#;

pub const NOT_JSON: &str = "Sure! Here is the classification: lead_request";

pub const UNKNOWN_CATEGORY_JSON: &str = r#"{"category":"spam","confidence":0.99}"#;

/// Raw RFC-2822 source with encoded headers, as a server would return it
/// without an ENVELOPE.
pub const ENCODED_SOURCE: &str = "From: =?UTF-8?Q?J=C3=BCrgen_M=C3=BCller?= <juergen@example.de>\r\n\
Subject: =?UTF-8?B?QW5mcmFnZSBXb2hudW5n?=\r\n\
Date: Mon, 15 Jan 2024 10:00:00 +0100\r\n\
\r\n\
Guten Tag, ist die Wohnung noch frei?\r\n";
