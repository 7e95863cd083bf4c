//! Generative model capability
//!
//! Every model call in the crate goes through the [`Generator`] trait:
//! prompt + system instruction, optionally constrained by an output contract.
//! Retry/backoff is layered on here and nowhere else.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::contract::OutputContract;
use crate::error::OrchestrationError;
use crate::Result;

pub mod gemini;
pub use gemini::GeminiClient;

/// One generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub system_instruction: &'a str,
    pub contract: Option<&'a OutputContract>,
}

impl<'a> GenerationRequest<'a> {
    pub fn text(prompt: &'a str, system_instruction: &'a str) -> Self {
        Self {
            prompt,
            system_instruction,
            contract: None,
        }
    }

    pub fn structured(
        prompt: &'a str,
        system_instruction: &'a str,
        contract: &'a OutputContract,
    ) -> Self {
        Self {
            prompt,
            system_instruction,
            contract: Some(contract),
        }
    }
}

/// What came back from the model
#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    Structured(Value),
    Text(String),
}

impl Generated {
    pub fn into_text(self) -> String {
        match self {
            Generated::Text(text) => text,
            Generated::Structured(value) => value.to_string(),
        }
    }
}

/// Trait for the opaque generative-model capability
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generated>;

    /// Whether a contract can be attached as a structural constraint
    fn supports_contracts(&self) -> bool {
        true
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generated> {
        (**self).generate(request).await
    }

    fn supports_contracts(&self) -> bool {
        (**self).supports_contracts()
    }
}

//
// ================= Retry =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: initial_backoff.saturating_mul(16),
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Retries transient failures of the wrapped generator
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generated> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(request).await {
                Ok(generated) => return Ok(generated),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.backoff(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Transient LLM failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn supports_contracts(&self) -> bool {
        self.inner.supports_contracts()
    }
}

//
// ================= Mock =================
//

/// Scripted reply for [`MockGenerator`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Text(String),
    Fail(String),
    Transient(String),
    Delayed(Duration, Box<MockReply>),
}

/// A call seen by [`MockGenerator`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub system_instruction: String,
    pub contract: Option<&'static str>,
}

struct MockRule {
    needle: String,
    reply: MockReply,
    remaining: Option<u32>,
}

/// Mock generator for development & testing.
///
/// Rules match a substring of the system instruction or the prompt and are
/// checked in insertion order. Unmatched structured calls get the contract's
/// sample object; unmatched text calls get a canned sentence.
pub struct MockGenerator {
    rules: Mutex<Vec<MockRule>>,
    calls: Mutex<Vec<RecordedCall>>,
    structured: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            structured: true,
        }
    }

    /// Behave like a model without structured-output support
    pub fn text_only(mut self) -> Self {
        self.structured = false;
        self
    }

    pub fn respond_when(self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.push_rule(needle.into(), reply, None);
        self
    }

    /// Rule that only fires `times` times, then falls through
    pub fn respond_times(self, needle: impl Into<String>, times: u32, reply: MockReply) -> Self {
        self.push_rule(needle.into(), reply, Some(times));
        self
    }

    fn push_rule(&self, needle: String, reply: MockReply, remaining: Option<u32>) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(MockRule {
                needle,
                reply,
                remaining,
            });
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn take_reply(&self, request: &GenerationRequest<'_>) -> Option<MockReply> {
        let mut rules = self.rules.lock().ok()?;
        let rule = rules.iter_mut().find(|r| {
            r.remaining != Some(0)
                && (request.system_instruction.contains(&r.needle) || request.prompt.contains(&r.needle))
        })?;
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        Some(rule.reply.clone())
    }

    fn fallback(&self, request: &GenerationRequest<'_>) -> Generated {
        match request.contract {
            Some(contract) if self.structured => Generated::Structured(Value::Object(contract.sample_object())),
            Some(contract) => Generated::Text(Value::Object(contract.sample_object()).to_string()),
            None => Generated::Text("Mock synthesis of the specialist findings.".to_string()),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

async fn play(reply: MockReply) -> Result<Generated> {
    let mut reply = reply;
    loop {
        match reply {
            MockReply::Delayed(delay, next) => {
                tokio::time::sleep(delay).await;
                reply = *next;
            }
            MockReply::Json(v) => return Ok(Generated::Structured(v)),
            MockReply::Text(t) => return Ok(Generated::Text(t)),
            MockReply::Fail(msg) => return Err(OrchestrationError::LlmError(msg)),
            MockReply::Transient(msg) => {
                return Err(OrchestrationError::LlmStatus {
                    status: 503,
                    body: msg,
                })
            }
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generated> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: request.prompt.to_string(),
                system_instruction: request.system_instruction.to_string(),
                contract: request.contract.map(|c| c.name()),
            });
        }

        let reply = self.take_reply(&request);
        debug!(matched = reply.is_some(), "MockGenerator call");

        match reply {
            Some(reply) => play(reply).await,
            None => Ok(self.fallback(&request)),
        }
    }

    fn supports_contracts(&self) -> bool {
        self.structured
    }
}
