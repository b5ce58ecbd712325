// src/llm.rs
//
// Chat-completion providers. Each provider owns its endpoint, credential,
// default model and sampling parameters; callers only see `ChatProvider`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::cfg::config::{ProviderSettings, ProvidersConfig};
use crate::error::{Error, Result};
use crate::model::{ChatMessage, ProviderKind, TokenUsage};

pub const OPENAI_MODEL_FALLBACK: &str = "gpt-4o-mini";
pub const CEREBRAS_MODEL_FALLBACK: &str = "gpt-oss-120b";

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const CEREBRAS_BASE_URL: &str = "https://api.cerebras.ai";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub max_completion_tokens: Option<u32>,
}

/// USD per token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub input: f64,
    pub output: f64,
}

impl CostRates {
    pub fn estimate(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        prompt_tokens as f64 * self.input + completion_tokens as f64 * self.output
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub response_text: String,
    pub usage: Option<TokenUsage>,
    pub latency_ms: u64,
}

pub trait ChatProvider {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    fn submit(&self, messages: &[ChatMessage]) -> Result<Completion>;

    /// Per-token pricing, for providers whose spend we track.
    fn cost_rates(&self) -> Option<CostRates> {
        None
    }
}

/// Map a user-supplied provider name to a kind; anything unrecognised means OpenAI.
pub fn select_provider(raw: Option<&str>) -> ProviderKind {
    match raw.map(|r| r.trim().to_lowercase()) {
        None => ProviderKind::OpenAi,
        Some(name) => name.parse::<ProviderKind>().unwrap_or_else(|_| {
            warn!("Unknown provider '{}', using openai", name);
            ProviderKind::OpenAi
        }),
    }
}

/// Pick the provider for `kind`, failing before any network call if its key is missing.
pub fn build_provider(
    kind: ProviderKind,
    providers: &ProvidersConfig,
    timeout: Duration,
) -> Result<Box<dyn ChatProvider>> {
    Ok(match kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(&providers.openai, timeout)?),
        ProviderKind::Cerebras => Box::new(CerebrasProvider::new(&providers.cerebras, timeout)?),
    })
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// OpenAI-compatible `/v1/chat/completions` transport.
struct CompletionsClient {
    kind: ProviderKind,
    agent: ureq::Agent,
    url: String,
    api_key: String,
}

impl CompletionsClient {
    fn new(
        kind: ProviderKind,
        settings: &ProviderSettings,
        default_base: &str,
        env_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_ref()
            .map(|k| k.unsecure().trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Configuration(format!("{} not configured", env_name)))?;
        let base = settings.base_url.as_deref().unwrap_or(default_base);
        Ok(CompletionsClient {
            kind,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            api_key,
        })
    }

    fn provider_error(&self, detail: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.kind.to_string(),
            detail: detail.into(),
        }
    }

    fn submit(&self, model: &str, messages: &[ChatMessage], sampling: &SamplingParams) -> Result<Completion> {
        let request = CompletionRequest {
            model,
            messages,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_completion_tokens: sampling.max_completion_tokens,
        };
        debug!("POST {} model={} messages={}", self.url, model, messages.len());

        let started = Instant::now();
        let response = match self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
        {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                warn!("{} returned HTTP {}", self.kind, code);
                return Err(self.provider_error(body));
            }
            Err(ureq::Error::Transport(t)) => return Err(self.provider_error(t.to_string())),
        };

        let body: CompletionResponse = response
            .into_json()
            .map_err(|e| self.provider_error(format!("unreadable response: {}", e)))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let response_text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        let usage = body.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        debug!("{} answered in {} ms ({:?})", self.kind, latency_ms, usage);

        Ok(Completion {
            response_text,
            usage,
            latency_ms,
        })
    }
}

pub struct OpenAiProvider {
    client: CompletionsClient,
    model: String,
}

impl OpenAiProvider {
    pub const SAMPLING: SamplingParams = SamplingParams {
        temperature: 0.2,
        top_p: None,
        max_completion_tokens: None,
    };

    pub const RATES: CostRates = CostRates {
        input: 0.15 / 1_000_000.0,
        output: 0.6 / 1_000_000.0,
    };

    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self> {
        Ok(OpenAiProvider {
            client: CompletionsClient::new(
                ProviderKind::OpenAi,
                settings,
                OPENAI_BASE_URL,
                "OPENAI_API_KEY",
                timeout,
            )?,
            model: model_or(settings, OPENAI_MODEL_FALLBACK),
        })
    }
}

impl ChatProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn submit(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.client.submit(&self.model, messages, &Self::SAMPLING)
    }

    fn cost_rates(&self) -> Option<CostRates> {
        Some(Self::RATES)
    }
}

pub struct CerebrasProvider {
    client: CompletionsClient,
    model: String,
}

impl CerebrasProvider {
    pub const SAMPLING: SamplingParams = SamplingParams {
        temperature: 1.0,
        top_p: Some(1.0),
        max_completion_tokens: Some(32_768),
    };

    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Result<Self> {
        Ok(CerebrasProvider {
            client: CompletionsClient::new(
                ProviderKind::Cerebras,
                settings,
                CEREBRAS_BASE_URL,
                "CEREBRAS_API_KEY",
                timeout,
            )?,
            model: model_or(settings, CEREBRAS_MODEL_FALLBACK),
        })
    }
}

impl ChatProvider for CerebrasProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cerebras
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn submit(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.client.submit(&self.model, messages, &Self::SAMPLING)
    }
}

fn model_or(settings: &ProviderSettings, fallback: &str) -> String {
    settings
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
