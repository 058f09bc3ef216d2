//! Chat assistant: one independent request per send, answers appended in arrival order.

use std::sync::Arc;

use shared::{
    domain::{ChatRole, Stage},
    error::{application_fallback, transport_message, WorkflowError},
    protocol::{AskRequest, AskResponse},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    backend::WorkflowBackend,
    surface::{InputElement, TranscriptElement},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub role: ChatRole,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ChatRole::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ChatRole::Bot,
        }
    }

    pub fn bot_html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ChatRole::BotHtml,
        }
    }

    pub fn is_markup(&self) -> bool {
        self.role.is_markup()
    }

    /// Bubble body for HTML hosts: markup verbatim for `bot-html`, escaped text otherwise.
    pub fn to_html(&self) -> String {
        if self.is_markup() {
            self.text.clone()
        } else {
            escape_html(&self.text)
        }
    }

    fn from_answer(response: AskResponse) -> Self {
        if response.html {
            return Self::bot_html(response.answer.unwrap_or_default());
        }
        let text = [response.answer, response.error]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| application_fallback(Stage::Assist).to_string());
        Self::bot(text)
    }
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[derive(Clone)]
pub struct ChatElements {
    pub input: Arc<dyn InputElement>,
    pub transcript: Arc<dyn TranscriptElement>,
    pub context: Option<Arc<dyn InputElement>>,
}

pub struct AssistantHandler {
    backend: Arc<dyn WorkflowBackend>,
    elements: ChatElements,
    transcript: Mutex<Vec<ChatMessage>>,
}

impl AssistantHandler {
    pub fn new(backend: Arc<dyn WorkflowBackend>, elements: ChatElements) -> Self {
        Self {
            backend,
            elements,
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }

    async fn push(&self, message: ChatMessage) {
        self.elements.transcript.append(&message);
        self.transcript.lock().await.push(message);
    }

    /// Sends the current input. Blank input is ignored and returns `None`; otherwise the
    /// question is echoed, the input cleared, and the bot reply appended and returned.
    /// A transport failure still appends the network error bubble but returns `Err`.
    pub async fn send(&self) -> Option<Result<ChatMessage, WorkflowError>> {
        let raw = self.elements.input.value();
        let question = raw.trim();
        if question.is_empty() {
            debug!("blank assistant message ignored");
            return None;
        }

        self.push(ChatMessage::user(question)).await;
        self.elements.input.clear();

        let request = AskRequest {
            message: question.to_string(),
            context_type: self
                .elements
                .context
                .as_ref()
                .map(|context| context.value())
                .unwrap_or_default(),
        };
        debug!(context_type = %request.context_type, "asking assistant");

        match self.backend.ask(&request).await {
            Ok(response) => {
                let reply = ChatMessage::from_answer(response);
                self.push(reply.clone()).await;
                Some(Ok(reply))
            }
            Err(err) => {
                warn!(error = %err, "assistant request failed");
                self.push(ChatMessage::bot(transport_message(Stage::Assist)))
                    .await;
                Some(Err(WorkflowError::Transport {
                    stage: Stage::Assist,
                }))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/assistant_tests.rs"]
mod tests;
