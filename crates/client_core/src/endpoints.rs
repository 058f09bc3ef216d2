//! Backend route templates. Paths are part of the compatibility surface with the server.

use shared::domain::Workdir;

pub const CONVERT_PATH: &str = "/api/convert";
pub const RETRY_PATH: &str = "/api/retry";
pub const GENERATE_PATH: &str = "/api/generate_siebel";
pub const ASK_PATH: &str = "/api/client-script/ask";
pub const PMPR_PATH: &str = "/api/pmpr/generate";

pub fn preview_path(workdir: &Workdir) -> String {
    format!("/preview/{workdir}")
}

pub fn raw_response_path(workdir: &Workdir) -> String {
    format!("/download/{workdir}/raw_response.txt")
}

pub fn generated_html_path(workdir: &Workdir) -> String {
    format!("/download/{workdir}/generated.html")
}

/// Download route for one file written into the session's webtemplate folder.
pub fn webtemplate_file_path(workdir: &Workdir, file: &str) -> String {
    format!("/download/{workdir}/webtemplate/{file}")
}

pub fn archive_path(workdir: &Workdir) -> String {
    format!("/download-webtemplate/{workdir}")
}

/// References exposed once a workdir is known: the preview document and both downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLinks {
    pub preview: String,
    pub raw_response: String,
    pub generated_html: String,
}

impl SessionLinks {
    pub fn for_workdir(workdir: &Workdir) -> Self {
        Self {
            preview: preview_path(workdir),
            raw_response: raw_response_path(workdir),
            generated_html: generated_html_path(workdir),
        }
    }
}
