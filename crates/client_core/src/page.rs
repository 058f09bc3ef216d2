//! Capability detection: a page lists the elements it has, and each section's controller is
//! built only when the elements it needs are present.

use std::sync::Arc;

use tracing::info;

use crate::{
    assistant::{AssistantHandler, ChatElements},
    backend::WorkflowBackend,
    coordinator::{WorkflowCoordinator, WorkflowElements, WorkflowOptions},
    pmpr::{PmPrElements, PmPrSection},
    session::Session,
    surface::{InputElement, NoticeElements, Notifier, TextElement, TranscriptElement},
};

#[derive(Clone, Default)]
pub struct ChatSlots {
    pub input: Option<Arc<dyn InputElement>>,
    pub transcript: Option<Arc<dyn TranscriptElement>>,
    pub context: Option<Arc<dyn InputElement>>,
}

impl ChatSlots {
    pub fn detect(self) -> Option<ChatElements> {
        Some(ChatElements {
            input: self.input?,
            transcript: self.transcript?,
            context: self.context,
        })
    }
}

#[derive(Clone, Default)]
pub struct PmPrSlots {
    pub kind: Option<Arc<dyn InputElement>>,
    pub name: Option<Arc<dyn InputElement>>,
    pub code_output: Option<Arc<dyn TextElement>>,
    pub filename_output: Option<Arc<dyn TextElement>>,
}

impl PmPrSlots {
    pub fn detect(self) -> Option<PmPrElements> {
        Some(PmPrElements {
            kind: self.kind?,
            name: self.name?,
            code_output: self.code_output?,
            filename_output: self.filename_output,
        })
    }
}

#[derive(Clone, Default)]
pub struct Page {
    pub notices: NoticeElements,
    /// `None` on pages without the conversion workflow.
    pub workflow: Option<WorkflowElements>,
    pub chat: ChatSlots,
    pub pmpr: PmPrSlots,
    /// Workdir to resume instead of starting without a session.
    pub session: Option<Session>,
}

pub struct Controllers {
    pub notifier: Arc<Notifier>,
    pub workflow: Option<Arc<WorkflowCoordinator>>,
    pub assistant: Option<Arc<AssistantHandler>>,
    pub pmpr: Option<Arc<PmPrSection>>,
}

pub fn mount(page: Page, backend: Arc<dyn WorkflowBackend>, options: WorkflowOptions) -> Controllers {
    let notifier = Arc::new(Notifier::new(page.notices, options.toast_duration));

    let session = page.session.unwrap_or_default();
    let workflow = page.workflow.map(|elements| {
        Arc::new(
            WorkflowCoordinator::new(
                Arc::clone(&backend),
                Arc::clone(&notifier),
                elements,
                options,
            )
            .with_session(session),
        )
    });
    let assistant = page
        .chat
        .detect()
        .map(|elements| Arc::new(AssistantHandler::new(Arc::clone(&backend), elements)));
    let pmpr = page.pmpr.detect().map(|elements| {
        Arc::new(PmPrSection::new(
            Arc::clone(&backend),
            Arc::clone(&notifier),
            elements,
        ))
    });

    info!(
        workflow = workflow.is_some(),
        upload_form = workflow.as_ref().is_some_and(|w| w.has_upload_form()),
        assistant = assistant.is_some(),
        pmpr = pmpr.is_some(),
        "page controllers mounted"
    );

    Controllers {
        notifier,
        workflow,
        assistant,
        pmpr,
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
