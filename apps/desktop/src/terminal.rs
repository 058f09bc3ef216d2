//! Terminal renditions of the page elements.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use client_core::{
    ChatMessage, GeneratedLink, InputElement, LinkListElement, Navigator, NoticeElements, Panel,
    TargetElement, TextElement, TranscriptElement, WorkflowElements,
};
use tracing::{debug, info};
use url::Url;

fn resolve(base: &Url, target: &str) -> String {
    base.join(target)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| target.to_string())
}

#[derive(Default)]
pub struct Banner {
    text: Mutex<String>,
}

impl Panel for Banner {
    fn set_visible(&self, visible: bool) {
        if visible {
            let text = self.text.lock().map(|text| text.clone()).unwrap_or_default();
            eprintln!("error: {text}");
        }
    }
}

impl TextElement for Banner {
    fn set_text(&self, text: &str) {
        if let Ok(mut current) = self.text.lock() {
            *current = text.to_string();
        }
    }
}

pub struct Spinner;

impl Panel for Spinner {
    fn set_visible(&self, visible: bool) {
        if visible {
            info!("waiting for server...");
        } else {
            debug!("request finished");
        }
    }
}

pub struct Toaster;

impl Panel for Toaster {
    fn set_visible(&self, _visible: bool) {}
}

impl TextElement for Toaster {
    fn set_text(&self, text: &str) {
        println!("{text}");
    }
}

/// Prints a labeled absolute URL whenever a frame or link target changes.
pub struct LinkLine {
    label: &'static str,
    base: Url,
}

impl TargetElement for LinkLine {
    fn set_target(&self, target: &str) {
        println!("{:<10} {}", self.label, resolve(&self.base, target));
    }
}

pub struct FileList {
    base: Url,
    links: Mutex<Vec<GeneratedLink>>,
}

impl FileList {
    pub fn links(&self) -> Vec<GeneratedLink> {
        self.links.lock().map(|links| links.clone()).unwrap_or_default()
    }
}

impl LinkListElement for FileList {
    fn replace_links(&self, links: &[GeneratedLink]) {
        if links.is_empty() {
            println!("generated files: none");
        } else {
            println!("generated files:");
            for link in links {
                println!("  {:<32} {}", link.label, resolve(&self.base, &link.url));
            }
        }
        if let Ok(mut current) = self.links.lock() {
            *current = links.to_vec();
        }
    }
}

pub struct CodeBlock {
    label: &'static str,
}

impl CodeBlock {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Panel for CodeBlock {
    fn set_visible(&self, _visible: bool) {}
}

impl TextElement for CodeBlock {
    fn set_text(&self, text: &str) {
        println!("----- {} -----\n{text}\n----- end {} -----", self.label, self.label);
    }
}

/// Fixed input value, as if typed before the action was triggered.
pub struct StaticInput {
    value: Mutex<String>,
}

impl StaticInput {
    pub fn new(value: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value.into()),
        })
    }
}

impl InputElement for StaticInput {
    fn value(&self) -> String {
        self.value.lock().map(|value| value.clone()).unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut value) = self.value.lock() {
            value.clear();
        }
    }
}

pub struct Transcript;

impl TranscriptElement for Transcript {
    fn append(&self, message: &ChatMessage) {
        println!("[{}] {}", message.role.as_class(), message.text);
    }
}

/// Queues navigation requests; the caller downloads them once the operation returns.
#[derive(Default)]
pub struct DownloadQueue {
    pending: Mutex<Vec<String>>,
}

impl DownloadQueue {
    pub fn drain(&self) -> Vec<String> {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

impl Navigator for DownloadQueue {
    fn navigate(&self, url: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(url.to_string());
        }
    }
}

/// Local file name for a downloaded URL: its last path segment, with `.zip` appended to the
/// extensionless archive route. `None` when the segment cannot name a file in one directory.
pub fn download_file_name(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download");
    if matches!(segment, "." | "..") || segment.contains(['\\', ':']) {
        return None;
    }
    if path.contains("/download-webtemplate/") {
        Some(format!("webtemplate_{segment}.zip"))
    } else {
        Some(segment.to_string())
    }
}

/// Hands out distinct file names for one download batch. A repeated name gets a `_2`, `_3`,
/// ... suffix before its extension.
#[derive(Default)]
pub struct DownloadNames {
    taken: HashSet<String>,
}

impl DownloadNames {
    pub fn claim(&mut self, url: &str) -> Option<String> {
        let name = download_file_name(url)?;
        if self.taken.insert(name.clone()) {
            return Some(name);
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name.as_str(), None),
        };
        (2..)
            .map(|n| match ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            })
            .find(|candidate| self.taken.insert(candidate.clone()))
    }
}

pub struct TerminalPage {
    pub files: Arc<FileList>,
    pub downloads: Arc<DownloadQueue>,
    base: Url,
    show_code: bool,
}

impl TerminalPage {
    pub fn new(base: Url, show_code: bool) -> Self {
        Self {
            files: Arc::new(FileList {
                base: base.clone(),
                links: Mutex::new(Vec::new()),
            }),
            downloads: Arc::new(DownloadQueue::default()),
            base,
            show_code,
        }
    }

    pub fn notices(&self) -> NoticeElements {
        let banner: Arc<dyn TextElement> = Arc::new(Banner::default());
        let loading: Arc<dyn Panel> = Arc::new(Spinner);
        let toaster: Arc<dyn TextElement> = Arc::new(Toaster);
        NoticeElements {
            error_banner: Some(banner),
            loading: Some(loading),
            toaster: Some(toaster),
        }
    }

    pub fn workflow(&self, model: Option<String>) -> WorkflowElements {
        let link = |label| -> Option<Arc<dyn TargetElement>> {
            Some(Arc::new(LinkLine {
                label,
                base: self.base.clone(),
            }))
        };
        let code = |label| -> Option<Arc<dyn TextElement>> {
            self.show_code
                .then(|| Arc::new(CodeBlock { label }) as Arc<dyn TextElement>)
        };
        let files: Arc<dyn LinkListElement> = self.files.clone();
        let downloads: Arc<dyn Navigator> = self.downloads.clone();

        WorkflowElements {
            upload_form: true,
            model_select: model.map(|model| StaticInput::new(model) as Arc<dyn InputElement>),
            preview_block: None,
            preview_frame: link("preview"),
            raw_link: link("raw"),
            html_link: link("html"),
            generated_links: Some(files),
            view_code: code("view"),
            applet_code: code("applet"),
            code_compare: None,
            navigator: Some(downloads),
        }
    }
}
