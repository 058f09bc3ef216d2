//! Recording page elements and a scripted in-process backend for tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::{
    assistant::ChatMessage,
    backend::{HttpBackend, ImageUpload, WorkflowBackend},
    coordinator::{WorkflowCoordinator, WorkflowElements, WorkflowOptions},
    endpoints::{ASK_PATH, CONVERT_PATH, GENERATE_PATH, PMPR_PATH, RETRY_PATH},
    manifest::GeneratedLink,
    surface::{
        InputElement, LinkListElement, Navigator, NoticeElements, Notifier, Panel,
        TargetElement, TextElement, TranscriptElement,
    },
};

#[derive(Default)]
pub struct RecordingElement {
    text: Mutex<String>,
    visible: Mutex<bool>,
}

impl RecordingElement {
    pub fn text(&self) -> String {
        self.text.lock().expect("text lock").clone()
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.lock().expect("visible lock")
    }
}

impl Panel for RecordingElement {
    fn set_visible(&self, visible: bool) {
        *self.visible.lock().expect("visible lock") = visible;
    }
}

impl TextElement for RecordingElement {
    fn set_text(&self, text: &str) {
        *self.text.lock().expect("text lock") = text.to_string();
    }
}

#[derive(Default)]
pub struct RecordingTarget {
    target: Mutex<Option<String>>,
}

impl RecordingTarget {
    pub fn target(&self) -> Option<String> {
        self.target.lock().expect("target lock").clone()
    }
}

impl TargetElement for RecordingTarget {
    fn set_target(&self, target: &str) {
        *self.target.lock().expect("target lock") = Some(target.to_string());
    }
}

#[derive(Default)]
pub struct RecordingList {
    renders: Mutex<Vec<Vec<GeneratedLink>>>,
}

impl RecordingList {
    pub fn current(&self) -> Option<Vec<GeneratedLink>> {
        self.renders.lock().expect("renders lock").last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().expect("renders lock").len()
    }
}

impl LinkListElement for RecordingList {
    fn replace_links(&self, links: &[GeneratedLink]) {
        self.renders
            .lock()
            .expect("renders lock")
            .push(links.to_vec());
    }
}

#[derive(Default)]
pub struct FakeInput {
    value: Mutex<String>,
}

impl FakeInput {
    pub fn with_value(value: &str) -> Arc<Self> {
        let input = Arc::new(Self::default());
        input.set(value);
        input
    }

    pub fn set(&self, value: &str) {
        *self.value.lock().expect("value lock") = value.to_string();
    }
}

impl InputElement for FakeInput {
    fn value(&self) -> String {
        self.value.lock().expect("value lock").clone()
    }

    fn clear(&self) {
        self.value.lock().expect("value lock").clear();
    }
}

#[derive(Default)]
pub struct RecordingTranscript {
    messages: Mutex<Vec<ChatMessage>>,
}

impl RecordingTranscript {
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().expect("messages lock").clone()
    }
}

impl TranscriptElement for RecordingTranscript {
    fn append(&self, message: &ChatMessage) {
        self.messages
            .lock()
            .expect("messages lock")
            .push(message.clone());
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().expect("visits lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visits.lock().expect("visits lock").push(url.to_string());
    }
}

/// Every element a full conversion page can carry, as recording doubles.
#[derive(Default)]
pub struct TestPage {
    pub banner: Arc<RecordingElement>,
    pub loading: Arc<RecordingElement>,
    pub toaster: Arc<RecordingElement>,
    pub model: Arc<FakeInput>,
    pub preview_block: Arc<RecordingElement>,
    pub preview_frame: Arc<RecordingTarget>,
    pub raw_link: Arc<RecordingTarget>,
    pub html_link: Arc<RecordingTarget>,
    pub generated: Arc<RecordingList>,
    pub view_code: Arc<RecordingElement>,
    pub applet_code: Arc<RecordingElement>,
    pub code_compare: Arc<RecordingElement>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestPage {
    pub fn notices(&self) -> NoticeElements {
        let banner: Arc<dyn TextElement> = self.banner.clone();
        let loading: Arc<dyn Panel> = self.loading.clone();
        let toaster: Arc<dyn TextElement> = self.toaster.clone();
        NoticeElements {
            error_banner: Some(banner),
            loading: Some(loading),
            toaster: Some(toaster),
        }
    }

    pub fn workflow(&self) -> WorkflowElements {
        let model: Arc<dyn InputElement> = self.model.clone();
        let preview_block: Arc<dyn Panel> = self.preview_block.clone();
        let preview_frame: Arc<dyn TargetElement> = self.preview_frame.clone();
        let raw_link: Arc<dyn TargetElement> = self.raw_link.clone();
        let html_link: Arc<dyn TargetElement> = self.html_link.clone();
        let generated: Arc<dyn LinkListElement> = self.generated.clone();
        let view_code: Arc<dyn TextElement> = self.view_code.clone();
        let applet_code: Arc<dyn TextElement> = self.applet_code.clone();
        let code_compare: Arc<dyn Panel> = self.code_compare.clone();
        let navigator: Arc<dyn Navigator> = self.navigator.clone();
        WorkflowElements {
            upload_form: true,
            model_select: Some(model),
            preview_block: Some(preview_block),
            preview_frame: Some(preview_frame),
            raw_link: Some(raw_link),
            html_link: Some(html_link),
            generated_links: Some(generated),
            view_code: Some(view_code),
            applet_code: Some(applet_code),
            code_compare: Some(code_compare),
            navigator: Some(navigator),
        }
    }

    pub fn notifier(&self) -> Arc<Notifier> {
        Arc::new(Notifier::new(
            self.notices(),
            WorkflowOptions::default().toast_duration,
        ))
    }

    pub fn coordinator(&self, server_url: &str) -> WorkflowCoordinator {
        WorkflowCoordinator::new(
            http_backend(server_url),
            self.notifier(),
            self.workflow(),
            WorkflowOptions::default(),
        )
    }
}

pub fn http_backend(server_url: &str) -> Arc<dyn WorkflowBackend> {
    Arc::new(HttpBackend::new(server_url).expect("backend url"))
}

pub fn sample_image() -> ImageUpload {
    ImageUpload {
        filename: "mockup.png".to_string(),
        mime_type: Some("image/png".to_string()),
        bytes: b"\x89PNG-test-bytes".to_vec(),
    }
}

#[derive(Debug, Clone)]
pub struct Scripted {
    status: StatusCode,
    body: String,
    content_type: &'static str,
    delay: Duration,
}

impl Scripted {
    pub fn json(body: Value) -> Self {
        Self::json_with_status(StatusCode::OK, body)
    }

    pub fn json_with_status(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json",
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "text/html; charset=utf-8",
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub fields: HashMap<String, String>,
    pub file_names: HashMap<String, String>,
    pub json: Option<Value>,
}

#[derive(Clone, Default)]
pub struct MockServer {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    /// Queues a reply for `path`; replies to one path are served in queue order.
    pub fn script(&self, path: &str, reply: Scripted) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().expect("requests lock").push(request);
    }

    async fn reply(&self, path: &str) -> Response {
        let scripted = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get_mut(path)
            .and_then(VecDeque::pop_front);
        let Some(scripted) = scripted else {
            return (StatusCode::NOT_FOUND, "no scripted reply").into_response();
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        (
            scripted.status,
            [(header::CONTENT_TYPE, scripted.content_type)],
            scripted.body,
        )
            .into_response()
    }
}

async fn handle_multipart(
    State(server): State<MockServer>,
    uri: Uri,
    mut multipart: Multipart,
) -> Response {
    let mut request = RecordedRequest {
        path: uri.path().to_string(),
        ..RecordedRequest::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            request
                .file_names
                .insert(name.clone(), file_name.to_string());
        }
        let bytes = field.bytes().await.unwrap_or_default();
        request
            .fields
            .insert(name, String::from_utf8_lossy(&bytes).to_string());
    }
    server.record(request);
    server.reply(uri.path()).await
}

async fn handle_json(
    State(server): State<MockServer>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Response {
    server.record(RecordedRequest {
        path: uri.path().to_string(),
        json: Some(body),
        ..RecordedRequest::default()
    });
    server.reply(uri.path()).await
}

async fn handle_other(State(server): State<MockServer>, uri: Uri) -> Response {
    server.record(RecordedRequest {
        path: uri.path().to_string(),
        ..RecordedRequest::default()
    });
    server.reply(uri.path()).await
}

pub async fn spawn_mock_server() -> anyhow::Result<(String, MockServer)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = MockServer::default();
    let app = Router::new()
        .route(CONVERT_PATH, post(handle_multipart))
        .route(RETRY_PATH, post(handle_multipart))
        .route(GENERATE_PATH, post(handle_multipart))
        .route(PMPR_PATH, post(handle_multipart))
        .route(ASK_PATH, post(handle_json))
        .fallback(handle_other)
        .with_state(server.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), server))
}
