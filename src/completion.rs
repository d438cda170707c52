//! The completion boundary: "system instruction + user prompt in, one text
//! completion out". The engine only talks to this trait, so the OpenAI client
//! and the scripted test double are interchangeable.

use async_trait::async_trait;
use thiserror::Error;

/// One single-shot, stateless completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
  pub system: String,
  pub user: String,
  pub temperature: f32,
  pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum CompletionError {
  #[error("completion API key not configured")]
  NotConfigured,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("completion API HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("completion API returned no text")]
  EmptyCompletion,
  #[error("completion call timed out after {0:?}")]
  Timeout(std::time::Duration),
  #[error("malformed completion response: {0}")]
  Decode(String),
}

#[async_trait]
pub trait CompletionApi: Send + Sync {
  /// Model identifier, for logs only.
  fn model(&self) -> &str;

  async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError>;
}

#[cfg(test)]
pub(crate) mod scripted {
  //! In-memory `CompletionApi` that replays canned replies and records what it was sent.

  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;

  pub enum Reply {
    Text(String),
    Fail,
  }

  pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    /// Served once the queue is exhausted.
    default: Option<String>,
    seen: Mutex<Vec<CompletionRequest>>,
  }

  impl ScriptedCompletion {
    pub fn always(text: impl Into<String>) -> Self {
      Self { replies: Mutex::new(VecDeque::new()), default: Some(text.into()), seen: Mutex::new(vec![]) }
    }

    pub fn failing() -> Self {
      Self { replies: Mutex::new(VecDeque::new()), default: None, seen: Mutex::new(vec![]) }
    }

    pub fn sequence(replies: Vec<Reply>) -> Self {
      Self { replies: Mutex::new(replies.into()), default: None, seen: Mutex::new(vec![]) }
    }

    pub fn calls(&self) -> usize {
      self.seen.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
      self.seen.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl CompletionApi for ScriptedCompletion {
    fn model(&self) -> &str { "scripted" }

    async fn complete(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
      self.seen.lock().unwrap().push(req.clone());
      let next = self.replies.lock().unwrap().pop_front();
      match next {
        Some(Reply::Text(t)) => Ok(t),
        Some(Reply::Fail) => Err(CompletionError::Status { status: 503, message: "scripted outage".into() }),
        None => match &self.default {
          Some(t) => Ok(t.clone()),
          None => Err(CompletionError::Transport("scripted outage".into())),
        },
      }
    }
  }

  /// A minimal valid activity reply.
  pub fn activity_json(title: &str) -> String {
    serde_json::json!({
      "title": title,
      "description": "A model-written activity.",
      "materials": ["paper", "crayons"],
      "instructions": ["Set up", "Play"],
      "adaptations": { "sensory": ["dim lights"], "motor": [], "cognitive": [] }
    })
    .to_string()
  }
}
