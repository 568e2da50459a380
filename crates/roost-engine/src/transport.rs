//! Message and voice transport abstraction

use async_trait::async_trait;
use roost_core::{Person, Result, RoostError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Outbound text delivery (allows mocking in tests)
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send `body` with optional media to a person
    async fn send(&self, to: &Person, body: &str, media: &[String]) -> Result<()>;
}

/// Webhook URLs the voice provider calls back during a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub prompt: String,
    pub digits: String,
    pub status: String,
}

impl CallbackUrls {
    /// Standard callback layout under `base_url` for a call
    pub fn for_call(base_url: &str, call_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            prompt: format!("{}/call/{}", base, call_id),
            digits: format!("{}/call/{}/response", base, call_id),
            status: format!("{}/call/{}/status", base, call_id),
        }
    }
}

/// Outbound voice calls
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Start a call; returns the provider's call reference
    async fn initiate_call(&self, to: &Person, callbacks: &CallbackUrls) -> Result<String>;
}

/// A text captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
    pub media: Vec<String>,
}

/// A call captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub to: String,
    pub callbacks: CallbackUrls,
}

/// Recording transport for testing and dry runs
#[derive(Debug, Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<SentMessage>>,
    calls: Mutex<Vec<PlacedCall>>,
    failing: AtomicBool,
    call_counter: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail with a delivery error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn messages_to(&self, name: &str) -> Vec<SentMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.to == name)
            .collect()
    }

    pub fn calls(&self) -> Vec<PlacedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn check_failing(&self, what: &str) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(RoostError::Delivery(format!("{} rejected by test transport", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, to: &Person, body: &str, media: &[String]) -> Result<()> {
        self.check_failing("message")?;
        debug!("Recorded message to {}: {}", to.name, body);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(SentMessage {
                to: to.name.clone(),
                body: body.to_string(),
                media: media.to_vec(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VoiceTransport for RecordingTransport {
    async fn initiate_call(&self, to: &Person, callbacks: &CallbackUrls) -> Result<String> {
        self.check_failing("call")?;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(PlacedCall {
                to: to.name.clone(),
                callbacks: callbacks.clone(),
            });
        }
        let n = self.call_counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("CA-test-{}", n))
    }
}
