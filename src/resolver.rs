// src/resolver.rs
//
// Maps an email address to the IMAP endpoint of its provider: first by a static
// domain table, then by matching the domain's MX exchanges against known hosts.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::Resolver;
use log::{debug, info};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Domain,
    Mx,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImapLookup {
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub source: ResolutionSource,
}

impl ImapLookup {
    fn unknown() -> Self {
        ImapLookup {
            host: None,
            port: None,
            provider: None,
            source: ResolutionSource::Unknown,
        }
    }

    fn found(entry: &Endpoint, source: ResolutionSource) -> Self {
        ImapLookup {
            host: Some(entry.host.to_string()),
            port: Some(entry.port),
            provider: Some(entry.provider.to_string()),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    host: &'static str,
    port: u16,
    provider: &'static str,
}

const GOOGLE: Endpoint = Endpoint { host: "imap.gmail.com", port: 993, provider: "Google" };
const MICROSOFT: Endpoint = Endpoint { host: "outlook.office365.com", port: 993, provider: "Microsoft" };
const YAHOO: Endpoint = Endpoint { host: "imap.mail.yahoo.com", port: 993, provider: "Yahoo" };
const APPLE: Endpoint = Endpoint { host: "imap.mail.me.com", port: 993, provider: "Apple" };
const PROTON: Endpoint = Endpoint { host: "imap.protonmail.com", port: 993, provider: "Proton" };
const ZOHO: Endpoint = Endpoint { host: "imap.zoho.com", port: 993, provider: "Zoho" };

fn known_domain(domain: &str) -> Option<Endpoint> {
    match domain {
        "gmail.com" | "googlemail.com" => Some(GOOGLE),
        "outlook.com" | "hotmail.com" | "live.com" | "office365.com" => Some(MICROSOFT),
        "yahoo.com" => Some(YAHOO),
        "icloud.com" | "me.com" => Some(APPLE),
        "proton.me" | "protonmail.com" => Some(PROTON),
        "zoho.com" => Some(ZOHO),
        _ => None,
    }
}

const MX_PATTERNS: &[(&str, Endpoint)] = &[
    (r"google\.com$", GOOGLE),
    (r"googlemail\.com$", GOOGLE),
    (r"outlook\.com$", MICROSOFT),
    (r"office365\.com$", MICROSOFT),
    (r"yahoodns\.net$", YAHOO),
    (r"icloud\.com$", APPLE),
    (r"zoho\.com$", ZOHO),
    (r"protonmail\.ch$", PROTON),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

/// DNS mail-exchange lookup capability.
pub trait MxLookup {
    fn lookup_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, String>;
}

/// System resolver, one attempt per query, bounded by `timeout`.
pub struct DnsMxLookup {
    resolver: Resolver,
}

impl DnsMxLookup {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = Resolver::new(ResolverConfig::default(), opts)
            .map_err(|e| Error::Configuration(format!("Failed to build DNS resolver: {}", e)))?;
        Ok(DnsMxLookup { resolver })
    }
}

impl MxLookup for DnsMxLookup {
    fn lookup_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, String> {
        let lookup = self.resolver.mx_lookup(domain).map_err(|e| e.to_string())?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord {
                preference: mx.preference(),
                exchange: mx.exchange().to_string().trim_end_matches('.').to_string(),
            })
            .collect())
    }
}

pub struct ProviderDirectory<L: MxLookup> {
    lookup: L,
    patterns: Vec<(Regex, Endpoint)>,
}

impl<L: MxLookup> ProviderDirectory<L> {
    pub fn new(lookup: L) -> Result<Self> {
        let patterns = MX_PATTERNS
            .iter()
            .map(|(pat, endpoint)| {
                RegexBuilder::new(pat)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, *endpoint))
                    .map_err(|e| Error::Configuration(format!("Bad MX pattern '{}': {}", pat, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ProviderDirectory { lookup, patterns })
    }

    /// Resolve the IMAP endpoint for `address`. Only a blank address is an error;
    /// DNS failures and unmatched exchanges degrade to `unknown`.
    pub fn resolve(&self, address: &str) -> Result<ImapLookup> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::validation("Email is required"));
        }

        let domain = match address.split('@').nth(1).map(|d| d.trim().to_lowercase()) {
            Some(d) if !d.is_empty() => d,
            _ => {
                debug!("No domain in '{}'", address);
                return Ok(ImapLookup::unknown());
            }
        };

        if let Some(entry) = known_domain(&domain) {
            debug!("Domain '{}' is a known {} domain", domain, entry.provider);
            return Ok(ImapLookup::found(&entry, ResolutionSource::Domain));
        }

        let mut records = match self.lookup.lookup_mx(&domain) {
            Ok(records) => records,
            Err(e) => {
                debug!("MX lookup for '{}' failed: {}", domain, e);
                return Ok(ImapLookup::unknown());
            }
        };
        records.sort_by_key(|r| r.preference);

        for record in &records {
            let exchange = record.exchange.to_lowercase();
            if let Some((_, entry)) = self.patterns.iter().find(|(re, _)| re.is_match(&exchange)) {
                info!("MX {} (pref {}) identifies {}", exchange, record.preference, entry.provider);
                return Ok(ImapLookup::found(entry, ResolutionSource::Mx));
            }
        }

        debug!("No known provider among {} MX records for '{}'", records.len(), domain);
        Ok(ImapLookup::unknown())
    }
}
