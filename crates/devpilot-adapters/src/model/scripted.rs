//! A `LanguageModel` that replays a fixed script.
//!
//! Each `complete` call pops the next queued response. The requests it was
//! given are kept so callers can inspect what the graph sent.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    message::Message,
};
use devpilot_core::traits::{CompletionRequest, LanguageModel, ToolChoice};

#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<Message>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = Message>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    /// Queue another response behind the current script.
    pub fn push(&self, response: Message) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// How many requests were text-only summarization passes.
    pub fn text_only_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.tool_choice == ToolChoice::None)
            .count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> DevpilotResult<Message> {
        self.requests.lock().map_err(poisoned)?.push(request);
        self.script
            .lock()
            .map_err(poisoned)?
            .pop_front()
            .ok_or_else(|| DevpilotError::ModelFailure {
                reason: "script exhausted".to_string(),
            })
    }
}

fn poisoned<T>(_: PoisonError<T>) -> DevpilotError {
    DevpilotError::ModelFailure {
        reason: "scripted model lock poisoned".to_string(),
    }
}
