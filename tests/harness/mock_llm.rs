// tests/harness/mock_llm.rs
//
// Chat provider that replays a queue of canned answers and keeps every prompt it saw.

use std::cell::RefCell;
use std::collections::VecDeque;

use mailbox_leads::llm::{ChatProvider, Completion, CostRates};
use mailbox_leads::model::{ChatMessage, ProviderKind, TokenUsage};
use mailbox_leads::{Error, Result};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(Completion),
    Fail(String),
}

pub struct ScriptedProvider {
    kind: ProviderKind,
    model: String,
    rates: Option<CostRates>,
    script: RefCell<VecDeque<Scripted>>,
    prompts: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind, model: &str) -> Self {
        Self {
            kind,
            model: model.to_string(),
            rates: None,
            script: RefCell::new(VecDeque::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn with_rates(mut self, rates: CostRates) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn reply(self, text: &str, prompt_tokens: u64, completion_tokens: u64, latency_ms: u64) -> Self {
        self.script.borrow_mut().push_back(Scripted::Reply(Completion {
            response_text: text.to_string(),
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            latency_ms,
        }));
        self
    }

    pub fn fail(self, detail: &str) -> Self {
        self.script.borrow_mut().push_back(Scripted::Fail(detail.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn prompt(&self, index: usize) -> Vec<ChatMessage> {
        self.prompts.borrow()[index].clone()
    }
}

impl ChatProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn submit(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.prompts.borrow_mut().push(messages.to_vec());
        match self.script.borrow_mut().pop_front() {
            Some(Scripted::Reply(completion)) => Ok(completion),
            Some(Scripted::Fail(detail)) => Err(Error::Provider {
                provider: self.kind.to_string(),
                detail,
            }),
            None => Err(Error::Provider {
                provider: self.kind.to_string(),
                detail: "script exhausted".to_string(),
            }),
        }
    }

    fn cost_rates(&self) -> Option<CostRates> {
        self.rates
    }
}
