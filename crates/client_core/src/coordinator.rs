//! Conversion workflow: convert, retry, generate, and the best-effort code preview.
//!
//! Every operation is one network round-trip. The session is read before the request and
//! written only after a successful reply, so failures never mutate it. Overlapping calls are
//! not serialized: whichever reply lands last decides the final session and page state.
//! The code preview after Generate runs in the background and is not part of its outcome.

use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use shared::{
    domain::{Stage, Workdir},
    error::WorkflowError,
    protocol::{ConversionResult, GeneratedFiles},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    backend::{BackendError, ConvertForm, ImageUpload, RetryForm, WorkflowBackend},
    endpoints::SessionLinks,
    manifest::{first_applet_url, render_manifest, GeneratedLink},
    session::Session,
    surface::{
        InputElement, LinkListElement, Navigator, Notifier, Panel, TargetElement, TextElement,
        DEFAULT_TOAST_DURATION,
    },
};

pub const DEFAULT_MAX_TOKENS: u32 = 6000;
const CONVERT_TOAST: &str = "Preview generated.";
const RETRY_TOAST: &str = "New version generated.";
const GENERATE_TOAST: &str = "Generated Siebel WebTemplate.";

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Sent with convert and retry; omitted when `None`.
    pub max_tokens: Option<u32>,
    pub toast_duration: Duration,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

/// Elements of the workflow section. Each one is optional; absent ones are skipped.
#[derive(Clone, Default)]
pub struct WorkflowElements {
    /// Whether the page carries the image upload form. Generate works without it.
    pub upload_form: bool,
    pub model_select: Option<Arc<dyn InputElement>>,
    pub preview_block: Option<Arc<dyn Panel>>,
    pub preview_frame: Option<Arc<dyn TargetElement>>,
    pub raw_link: Option<Arc<dyn TargetElement>>,
    pub html_link: Option<Arc<dyn TargetElement>>,
    pub generated_links: Option<Arc<dyn LinkListElement>>,
    pub view_code: Option<Arc<dyn TextElement>>,
    pub applet_code: Option<Arc<dyn TextElement>>,
    pub code_compare: Option<Arc<dyn Panel>>,
    pub navigator: Option<Arc<dyn Navigator>>,
}

/// Where a generate request was triggered from. Both entry points share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateTrigger {
    Button,
    PageAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub message: String,
    pub archive: Option<String>,
    /// `None` when the reply carried no file manifest and the list was left untouched.
    pub links: Option<Vec<GeneratedLink>>,
}

pub struct WorkflowCoordinator {
    backend: Arc<dyn WorkflowBackend>,
    notifier: Arc<Notifier>,
    elements: WorkflowElements,
    options: WorkflowOptions,
    session: Mutex<Session>,
    preview: StdMutex<Option<JoinHandle<()>>>,
}

impl WorkflowCoordinator {
    pub fn new(
        backend: Arc<dyn WorkflowBackend>,
        notifier: Arc<Notifier>,
        elements: WorkflowElements,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            backend,
            notifier,
            elements,
            options,
            session: Mutex::new(Session::new()),
            preview: StdMutex::new(None),
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Mutex::new(session);
        self
    }

    pub fn has_upload_form(&self) -> bool {
        self.elements.upload_form
    }

    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub async fn workdir(&self) -> Option<Workdir> {
        self.session.lock().await.workdir().cloned()
    }

    fn fail(&self, err: WorkflowError) -> WorkflowError {
        self.notifier.show_error(&err.user_message());
        err
    }

    fn selected_model(&self) -> Option<String> {
        self.elements.model_select.as_ref().map(|select| select.value())
    }

    fn accept_conversion(
        stage: Stage,
        result: Result<ConversionResult, BackendError>,
    ) -> Result<Workdir, WorkflowError> {
        let result = result.map_err(|err| {
            warn!(%stage, error = %err, "conversion request failed");
            WorkflowError::Transport { stage }
        })?;

        match result {
            ConversionResult {
                ok: true,
                workdir: Some(workdir),
                ..
            } if !workdir.as_str().is_empty() => Ok(workdir),
            ConversionResult { ok, error, .. } => {
                warn!(%stage, ok, error = ?error, "conversion rejected by server");
                Err(WorkflowError::application(stage, error.as_deref()))
            }
        }
    }

    /// Replaces the session workdir and points the preview links at it under one lock, so
    /// overlapping replies cannot leave the links showing a different workdir.
    async fn adopt_workdir(&self, workdir: &Workdir) {
        let mut session = self.session.lock().await;
        let previous = session.replace(workdir.clone());
        self.show_session_links(workdir);
        drop(session);
        info!(%workdir, previous = ?previous, "session workdir updated");
    }

    fn show_session_links(&self, workdir: &Workdir) {
        let links = SessionLinks::for_workdir(workdir);
        if let Some(frame) = &self.elements.preview_frame {
            frame.set_target(&links.preview);
        }
        if let Some(raw) = &self.elements.raw_link {
            raw.set_target(&links.raw_response);
        }
        if let Some(html) = &self.elements.html_link {
            html.set_target(&links.generated_html);
        }
    }

    /// Uploads an image for a fresh conversion. A missing image is refused locally.
    pub async fn convert(&self, image: Option<ImageUpload>) -> Result<Workdir, WorkflowError> {
        self.notifier.clear_error();
        let Some(image) = image else {
            return Err(self.fail(WorkflowError::MissingImage));
        };

        let form = ConvertForm {
            image,
            model: self.selected_model(),
            max_tokens: self.options.max_tokens,
        };
        info!(filename = %form.image.filename, model = ?form.model, "submitting conversion");

        let result = {
            let _loading = self.notifier.loading();
            self.backend.convert(form).await
        };
        let workdir = Self::accept_conversion(Stage::Convert, result).map_err(|e| self.fail(e))?;

        self.adopt_workdir(&workdir).await;
        if let Some(block) = &self.elements.preview_block {
            block.set_visible(true);
        }
        self.notifier.toast(CONVERT_TOAST);
        Ok(workdir)
    }

    /// Regenerates the preview for the active session. Returns `Ok(None)` without issuing a
    /// request when there is no session.
    pub async fn retry(&self) -> Result<Option<Workdir>, WorkflowError> {
        let Some(current) = self.workdir().await else {
            debug!("retry ignored: no active session");
            return Ok(None);
        };
        self.notifier.clear_error();

        let form = RetryForm {
            workdir: current.clone(),
            model: self.selected_model(),
            max_tokens: self.options.max_tokens,
        };
        info!(workdir = %current, model = ?form.model, "retrying conversion");

        let result = {
            let _loading = self.notifier.loading();
            self.backend.retry(form).await
        };
        let workdir = Self::accept_conversion(Stage::Retry, result).map_err(|e| self.fail(e))?;

        self.adopt_workdir(&workdir).await;
        self.notifier.toast(RETRY_TOAST);
        Ok(Some(workdir))
    }

    /// Generates the webtemplate bundle for the active session. Returns `Ok(None)` without
    /// issuing a request when there is no session. Never changes the session.
    pub async fn generate(
        &self,
        trigger: GenerateTrigger,
    ) -> Result<Option<GenerationReport>, WorkflowError> {
        let Some(workdir) = self.workdir().await else {
            debug!(?trigger, "generate ignored: no active session");
            return Ok(None);
        };
        self.notifier.clear_error();
        info!(?trigger, %workdir, "generating webtemplate");

        let reply = {
            let _loading = self.notifier.loading();
            self.backend.generate(&workdir).await
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(BackendError::InvalidResponse { raw, source }) => {
                error!(%workdir, error = %source, raw = %raw, "non-JSON generate response");
                return Err(self.fail(WorkflowError::InvalidResponse {
                    stage: Stage::Generate,
                }));
            }
            Err(err) => {
                error!(%workdir, error = %err, "generate request failed");
                return Err(self.fail(WorkflowError::Transport {
                    stage: Stage::Generate,
                }));
            }
        };

        if !reply.is_success() {
            error!(
                %workdir,
                status = %reply.status,
                error = ?reply.body.error,
                hint = ?reply.body.hint,
                "generation rejected"
            );
            return Err(self.fail(WorkflowError::application(
                Stage::Generate,
                reply.body.error.as_deref(),
            )));
        }

        let body = reply.body;
        let message = body
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| GENERATE_TOAST.to_string());
        self.notifier.toast(&message);

        let archive = body.zip.filter(|zip| !zip.is_empty());
        if let Some(zip) = &archive {
            match &self.elements.navigator {
                Some(navigator) => navigator.navigate(zip),
                None => debug!(%zip, "no navigator; archive not downloaded"),
            }
        }

        let links = body.files.as_ref().map(|files| {
            let links = render_manifest(files, &workdir);
            if let Some(list) = &self.elements.generated_links {
                list.replace_links(&links);
            }
            links
        });

        self.start_code_preview(body.files, workdir);

        Ok(Some(GenerationReport {
            message,
            archive,
            links,
        }))
    }

    /// Waits for the code preview started by the last Generate, if one is still running.
    pub async fn preview_settled(&self) {
        let handle = self.preview.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "code preview task failed");
                }
            }
        }
    }

    /// Fetches the view and first applet sources in the background, then reveals the
    /// code-compare block. A newer Generate cancels a preview still in flight.
    fn start_code_preview(&self, files: Option<GeneratedFiles>, workdir: Workdir) {
        let preview = CodePreview {
            backend: Arc::clone(&self.backend),
            view_code: self.elements.view_code.clone(),
            applet_code: self.elements.applet_code.clone(),
            code_compare: self.elements.code_compare.clone(),
        };
        let Some(files) = files else {
            preview.reveal();
            return;
        };

        let handle = tokio::spawn(preview.run(files, workdir));
        if let Ok(mut slot) = self.preview.lock() {
            if let Some(stale) = slot.replace(handle) {
                stale.abort();
            }
        }
    }
}

struct CodePreview {
    backend: Arc<dyn WorkflowBackend>,
    view_code: Option<Arc<dyn TextElement>>,
    applet_code: Option<Arc<dyn TextElement>>,
    code_compare: Option<Arc<dyn Panel>>,
}

impl CodePreview {
    async fn run(self, files: GeneratedFiles, workdir: Workdir) {
        if let (Some(element), Some(view)) = (&self.view_code, files.view.as_deref()) {
            match self.backend.fetch_text(view).await {
                Ok(text) => element.set_text(&text),
                Err(err) => warn!(url = view, error = %err, "failed to fetch view file"),
            }
        }

        if let (Some(element), Some(url)) =
            (&self.applet_code, first_applet_url(&files, &workdir))
        {
            match self.backend.fetch_text(&url).await {
                Ok(text) => element.set_text(&text),
                Err(err) => warn!(%url, error = %err, "failed to fetch applet file"),
            }
        }

        self.reveal();
    }

    fn reveal(&self) {
        if let Some(compare) = &self.code_compare {
            compare.set_visible(true);
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
