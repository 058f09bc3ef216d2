//! PM/PR scaffold generator section.

use std::sync::Arc;

use shared::{
    domain::{PmPrKind, Stage},
    error::WorkflowError,
    protocol::PmPrResponse,
};
use tracing::{info, warn};

use crate::{
    backend::WorkflowBackend,
    surface::{InputElement, Notifier, TextElement},
};

#[derive(Clone)]
pub struct PmPrElements {
    pub kind: Arc<dyn InputElement>,
    pub name: Arc<dyn InputElement>,
    pub code_output: Arc<dyn TextElement>,
    pub filename_output: Option<Arc<dyn TextElement>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScaffold {
    pub filename: String,
    pub code: String,
}

pub struct PmPrSection {
    backend: Arc<dyn WorkflowBackend>,
    notifier: Arc<Notifier>,
    elements: PmPrElements,
}

impl PmPrSection {
    pub fn new(
        backend: Arc<dyn WorkflowBackend>,
        notifier: Arc<Notifier>,
        elements: PmPrElements,
    ) -> Self {
        Self {
            backend,
            notifier,
            elements,
        }
    }

    fn fail(&self, err: WorkflowError) -> WorkflowError {
        self.notifier.show_error(&err.user_message());
        err
    }

    pub async fn generate(&self) -> Result<GeneratedScaffold, WorkflowError> {
        self.notifier.clear_error();
        let name = self.elements.name.value();
        let Some(kind) = PmPrKind::parse(&self.elements.kind.value()) else {
            return Err(self.fail(WorkflowError::InvalidPmPrRequest));
        };
        if name.trim().is_empty() {
            return Err(self.fail(WorkflowError::InvalidPmPrRequest));
        }

        let _loading = self.notifier.loading();
        let response = self
            .backend
            .generate_pmpr(kind, &name)
            .await
            .map_err(|err| {
                warn!(error = %err, "PM/PR request failed");
                self.fail(WorkflowError::Transport { stage: Stage::PmPr })
            })?;

        let scaffold = match response {
            PmPrResponse {
                ok: true,
                filename: Some(filename),
                code: Some(code),
                ..
            } => GeneratedScaffold { filename, code },
            PmPrResponse { error, .. } => {
                return Err(self.fail(WorkflowError::application(Stage::PmPr, error.as_deref())))
            }
        };
        info!(filename = %scaffold.filename, kind = kind.as_str(), "PM/PR scaffold generated");

        self.elements.code_output.set_text(&scaffold.code);
        self.elements.code_output.set_visible(true);
        if let Some(output) = &self.elements.filename_output {
            output.set_text(&scaffold.filename);
            output.set_visible(true);
        }
        self.notifier
            .toast(&format!("Generated {}.", scaffold.filename));
        Ok(scaffold)
    }
}

#[cfg(test)]
#[path = "tests/pmpr_tests.rs"]
mod tests;
