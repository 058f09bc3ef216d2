//! Normalization of the generated file manifest into renderable links.

use shared::{
    domain::Workdir,
    protocol::{AppletEntry, AppletRecord, GeneratedFiles},
};

use crate::endpoints::webtemplate_file_path;

pub const VIEW_TEMPLATE_LABEL: &str = "view_template.swt";
pub const FALLBACK_APPLET_LABEL: &str = "applet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLink {
    pub url: String,
    pub label: String,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}

/// Canonical link for one manifest entry.
///
/// A bare path is its own URL and is labeled by its last segment. A record uses its `url`,
/// else the webtemplate download route for `file` under `workdir`; it is labeled by `file`,
/// then `safe`, then [`FALLBACK_APPLET_LABEL`]. The URL is empty when a record names neither.
pub fn normalize_applet(entry: &AppletEntry, workdir: &Workdir) -> GeneratedLink {
    match entry {
        AppletEntry::Path(path) => {
            let label = path
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .unwrap_or(FALLBACK_APPLET_LABEL);
            GeneratedLink {
                url: path.clone(),
                label: label.to_string(),
            }
        }
        AppletEntry::Record(record) => normalize_record(record, workdir),
    }
}

fn normalize_record(record: &AppletRecord, workdir: &Workdir) -> GeneratedLink {
    let file = non_empty(record.file.as_ref());
    let url = match (non_empty(record.url.as_ref()), file) {
        (Some(url), _) => url.to_string(),
        (None, Some(file)) => webtemplate_file_path(workdir, file),
        (None, None) => String::new(),
    };
    let label = file
        .or_else(|| non_empty(record.safe.as_ref()))
        .unwrap_or(FALLBACK_APPLET_LABEL);

    GeneratedLink {
        url,
        label: label.to_string(),
    }
}

/// Links for the generated-files list: the view template first, then every applet entry
/// with a usable URL, in manifest order.
pub fn render_manifest(files: &GeneratedFiles, workdir: &Workdir) -> Vec<GeneratedLink> {
    let view = non_empty(files.view.as_ref()).map(|url| GeneratedLink {
        url: url.to_string(),
        label: VIEW_TEMPLATE_LABEL.to_string(),
    });

    view.into_iter()
        .chain(
            files
                .applets
                .iter()
                .map(|entry| normalize_applet(entry, workdir))
                .filter(|link| !link.url.is_empty()),
        )
        .collect()
}

/// URL of the first applet entry, used for the inline code preview.
pub fn first_applet_url(files: &GeneratedFiles, workdir: &Workdir) -> Option<String> {
    let first = files.applets.first()?;
    let link = normalize_applet(first, workdir);
    (!link.url.is_empty()).then_some(link.url)
}

#[cfg(test)]
#[path = "tests/manifest_tests.rs"]
mod tests;
