// src/classify.rs
//
// Lead classification of stored emails through a chat provider.

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client_ops::Clock;
use crate::error::{Error, Result};
use crate::llm::ChatProvider;
use crate::model::{
    Category, ChatMessage, Classification, ClassificationLog, Company, ContactName, Email, ProviderKind,
};
use crate::store::Store;

pub const SYSTEM_PROMPT: &str = "You are a strict JSON API. Output JSON only.";

/// The fixed two-message exchange sent for every email.
pub fn build_prompt(email: &Email) -> Vec<ChatMessage> {
    let from = format!("From: {}", email.sender);
    let subject = format!("Subject: {}", email.subject);
    let body = format!("Body: {}", email.body);
    let lines: [&str; 18] = [
        "Classify this email into one of the categories:",
        "- lead_request (customer asking for a lead)",
        "- lead_source (lead from a source like Immowelt, etc.)",
        "- normal (not a lead)",
        "Return strict JSON only with fields:",
        "category, source, confidence,",
        "contact_email,",
        "contact_name { first_name, last_name },",
        "company { name, domain, url, address },",
        "phones (array of strings),",
        "request_text.",
        "If category is lead_source, set source to the provider name. Otherwise source is null.",
        "If a field is missing, return null (or empty array for phones).",
        "confidence should be a number 0-1.",
        "Email:",
        &from,
        &subject,
        &body,
    ];

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(lines.join("\n"))]
}

/// Provider output after field-by-field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedClassification {
    pub category: Category,
    pub source: Option<String>,
    pub confidence: f64,
    pub contact_email: Option<String>,
    pub contact_name: Option<ContactName>,
    pub company: Option<Company>,
    pub phones: Vec<String>,
    pub request_text: Option<String>,
}

/// Parse the raw response text. Non-JSON, a non-object, or a missing/unknown
/// category is an error; every other field falls back to null/empty when it
/// has the wrong shape.
pub fn parse_response(text: &str) -> Result<ParsedClassification> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| Error::ResponseParse(format!("response is not JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::ResponseParse("response is not a JSON object".to_string()))?;

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::ResponseParse("missing category".to_string()))?;
    let category = match category.trim().parse::<Category>() {
        Ok(Category::Unknown) | Err(_) => {
            return Err(Error::ResponseParse(format!("unknown category '{}'", category)));
        }
        Ok(known) => known,
    };

    let source = match category {
        Category::LeadSource => text_field(obj, "source"),
        _ => None,
    };

    Ok(ParsedClassification {
        category,
        source,
        confidence: confidence(obj.get("confidence")),
        contact_email: text_field(obj, "contact_email"),
        contact_name: obj.get("contact_name").and_then(Value::as_object).map(|name| ContactName {
            first_name: text_field(name, "first_name"),
            last_name: text_field(name, "last_name"),
        }),
        company: obj.get("company").and_then(Value::as_object).map(|co| Company {
            name: text_field(co, "name"),
            domain: text_field(co, "domain"),
            url: text_field(co, "url"),
            address: text_field(co, "address"),
        }),
        phones: obj
            .get("phones")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar_text).collect())
            .unwrap_or_default(),
        request_text: text_field(obj, "request_text"),
    })
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings are accepted; anything else is 0. Clamped to [0, 1].
fn confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub average_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
    pub usage: UsageTotals,
    pub latency: LatencyStats,
    pub cost_usd: Option<f64>,
    pub provider: ProviderKind,
    pub model: String,
}

/// Result of classifying one email inside a batch.
#[derive(Debug)]
pub enum ItemOutcome {
    Classified(Classification),
    Failed { email_id: String, error: Error },
}

/// Running totals over the successful items of a batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    processed: usize,
    failed: usize,
    prompt_tokens: u64,
    completion_tokens: u64,
    latency_sum_ms: u64,
    latency_max_ms: u64,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Classified(c) => {
                self.processed += 1;
                if let Some(usage) = c.log.usage {
                    self.prompt_tokens += usage.prompt_tokens;
                    self.completion_tokens += usage.completion_tokens;
                }
                self.latency_sum_ms += c.log.latency_ms;
                self.latency_max_ms = self.latency_max_ms.max(c.log.latency_ms);
            }
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn finish(&self, total: usize, provider: &dyn ChatProvider) -> BatchReport {
        let average_ms = if self.processed == 0 {
            0
        } else {
            (self.latency_sum_ms as f64 / self.processed as f64).round() as u64
        };
        BatchReport {
            processed: self.processed,
            failed: self.failed,
            total,
            usage: UsageTotals {
                prompt_tokens: self.prompt_tokens,
                completion_tokens: self.completion_tokens,
                total_tokens: self.prompt_tokens + self.completion_tokens,
            },
            latency: LatencyStats {
                average_ms,
                max_ms: self.latency_max_ms,
            },
            cost_usd: provider
                .cost_rates()
                .map(|rates| rates.estimate(self.prompt_tokens, self.completion_tokens)),
            provider: provider.kind(),
            model: provider.model().to_string(),
        }
    }
}

pub struct Classifier<'a, C: Clock> {
    store: &'a Store<C>,
    provider: &'a dyn ChatProvider,
}

impl<'a, C: Clock> Classifier<'a, C> {
    pub fn new(store: &'a Store<C>, provider: &'a dyn ChatProvider) -> Self {
        Classifier { store, provider }
    }

    /// Classify one email and replace any earlier classification of it.
    pub fn classify_email(&self, email_id: &str) -> Result<Classification> {
        let email = self.store.load()?.email(email_id)?.clone();
        let classification = self.run(&email)?;

        self.store.update(|doc| {
            doc.email(email_id)?;
            doc.supersede_classification(classification.clone());
            Ok(())
        })?;
        info!(
            "Classified email {} as {} ({:.2})",
            email_id, classification.category, classification.confidence
        );
        Ok(classification)
    }

    /// Classify every email of the mailbox one at a time. Failed items are
    /// skipped; successes are committed together at the end.
    pub fn classify_mailbox(&self, mailbox_id: &str) -> Result<BatchReport> {
        let snapshot = self.store.load()?;
        snapshot.mailbox(mailbox_id)?;
        let emails: Vec<&Email> = snapshot
            .emails
            .iter()
            .filter(|e| e.mailbox_id == mailbox_id)
            .collect();
        info!(
            "Classifying {} emails of mailbox {} with {} ({})",
            emails.len(),
            mailbox_id,
            self.provider.kind(),
            self.provider.model()
        );

        let mut summary = BatchSummary::default();
        let mut classified = Vec::new();
        for email in &emails {
            let outcome = match self.run(email) {
                Ok(c) => ItemOutcome::Classified(c),
                Err(error) => ItemOutcome::Failed {
                    email_id: email.id.clone(),
                    error,
                },
            };
            summary.record(&outcome);
            match outcome {
                ItemOutcome::Classified(c) => classified.push(c),
                ItemOutcome::Failed { email_id, error } => {
                    warn!("Skipping email {}: {}", email_id, error);
                }
            }
        }

        self.store.update(|doc| {
            for c in classified {
                if doc.email(&c.email_id).is_ok() {
                    doc.supersede_classification(c);
                } else {
                    debug!("Email {} vanished during batch; dropping its classification", c.email_id);
                }
            }
            Ok(())
        })?;

        let report = summary.finish(emails.len(), self.provider);
        info!(
            "✅ Batch done: {}/{} classified, {} failed, {} tokens, avg {} ms",
            report.processed,
            report.total,
            report.failed,
            report.usage.total_tokens,
            report.latency.average_ms
        );
        Ok(report)
    }

    fn run(&self, email: &Email) -> Result<Classification> {
        let messages = build_prompt(email);
        let completion = self.provider.submit(&messages)?;
        let parsed = parse_response(&completion.response_text)?;

        Ok(Classification {
            id: self.store.new_id("classify"),
            email_id: email.id.clone(),
            category: parsed.category,
            source: parsed.source,
            confidence: parsed.confidence,
            contact_email: parsed.contact_email,
            contact_name: parsed.contact_name,
            company: parsed.company,
            phones: parsed.phones,
            request_text: parsed.request_text,
            log: ClassificationLog {
                provider: self.provider.kind(),
                model: self.provider.model().to_string(),
                messages,
                response_text: completion.response_text,
                latency_ms: completion.latency_ms,
                usage: completion.usage,
            },
            created_at: self.store.now(),
        })
    }
}
