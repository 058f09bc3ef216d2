use super::*;
use crate::{
    endpoints::PMPR_PATH,
    test_support::{http_backend, spawn_mock_server, FakeInput, RecordingElement, Scripted, TestPage},
};
use axum::http::StatusCode;
use serde_json::json;

struct PmPrPage {
    notices: TestPage,
    kind: Arc<FakeInput>,
    name: Arc<FakeInput>,
    code: Arc<RecordingElement>,
    filename: Arc<RecordingElement>,
}

impl PmPrPage {
    fn new(kind: &str, name: &str) -> Self {
        Self {
            notices: TestPage::default(),
            kind: FakeInput::with_value(kind),
            name: FakeInput::with_value(name),
            code: Arc::new(RecordingElement::default()),
            filename: Arc::new(RecordingElement::default()),
        }
    }

    fn section(&self, server_url: &str) -> PmPrSection {
        let kind: Arc<dyn InputElement> = self.kind.clone();
        let name: Arc<dyn InputElement> = self.name.clone();
        let code: Arc<dyn TextElement> = self.code.clone();
        let filename: Arc<dyn TextElement> = self.filename.clone();
        PmPrSection::new(
            http_backend(server_url),
            self.notices.notifier(),
            PmPrElements {
                kind,
                name,
                code_output: code,
                filename_output: Some(filename),
            },
        )
    }
}

#[tokio::test]
async fn invalid_kind_or_blank_name_is_refused_locally() {
    let (server_url, server) = spawn_mock_server().await.expect("spawn server");

    for (kind, name) in [("view", "MyApplet"), ("pm", "   "), ("", "")] {
        let page = PmPrPage::new(kind, name);
        let err = page
            .section(&server_url)
            .generate()
            .await
            .expect_err("must refuse");
        assert_eq!(err, WorkflowError::InvalidPmPrRequest);
        assert_eq!(page.notices.banner.text(), "Choose PM/PR and enter a name.");
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn generated_scaffold_is_shown_as_text() {
    let (server_url, server) = spawn_mock_server().await.expect("spawn server");
    server.script(
        PMPR_PATH,
        Scripted::json(json!({
            "ok": true,
            "filename": "MyAppletPR.js",
            "code": "define(\"siebel/custom/MyAppletPR\", [], function () {});"
        })),
    );
    let page = PmPrPage::new("PR", "My Applet");

    let scaffold = page
        .section(&server_url)
        .generate()
        .await
        .expect("generate");

    assert_eq!(scaffold.filename, "MyAppletPR.js");
    assert_eq!(page.code.text(), scaffold.code);
    assert!(page.code.is_visible());
    assert_eq!(page.filename.text(), "MyAppletPR.js");
    assert_eq!(page.notices.toaster.text(), "Generated MyAppletPR.js.");

    let requests = server.requests_to(PMPR_PATH);
    assert_eq!(requests[0].fields.get("kind").map(String::as_str), Some("pr"));
    assert_eq!(requests[0].fields.get("name").map(String::as_str), Some("My Applet"));
}

#[tokio::test]
async fn server_rejection_is_surfaced_verbatim() {
    let (server_url, server) = spawn_mock_server().await.expect("spawn server");
    server.script(
        PMPR_PATH,
        Scripted::json_with_status(
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error": "Choose PM/PR and enter a name."}),
        ),
    );
    server.script(PMPR_PATH, Scripted::json(json!({"ok": true})));
    let page = PmPrPage::new("pm", "Header");
    let section = page.section(&server_url);

    let err = section.generate().await.expect_err("must fail");
    assert_eq!(err.to_string(), "Choose PM/PR and enter a name.");

    let err = section.generate().await.expect_err("must fail");
    assert_eq!(err.to_string(), "PM/PR generation failed.");
    assert_eq!(page.code.text(), "");
}
