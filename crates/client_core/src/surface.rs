//! Page element seams and the notification surface (banner, busy indicator, toast).
//!
//! Element methods are infallible: a host that cannot apply an update drops it.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tracing::debug;

use crate::{assistant::ChatMessage, manifest::GeneratedLink};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2200);

pub trait Panel: Send + Sync {
    fn set_visible(&self, visible: bool);
}

/// Element whose content is replaced with literal text, never interpreted as markup.
pub trait TextElement: Panel {
    fn set_text(&self, text: &str);
}

/// Navigable target: an embedded frame source or an anchor href.
pub trait TargetElement: Send + Sync {
    fn set_target(&self, target: &str);
}

pub trait LinkListElement: Send + Sync {
    /// Replaces every previously rendered link.
    fn replace_links(&self, links: &[GeneratedLink]);
}

pub trait InputElement: Send + Sync {
    fn value(&self) -> String;
    fn clear(&self);
}

pub trait TranscriptElement: Send + Sync {
    fn append(&self, message: &ChatMessage);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

#[derive(Clone, Default)]
pub struct NoticeElements {
    pub error_banner: Option<Arc<dyn TextElement>>,
    pub loading: Option<Arc<dyn Panel>>,
    pub toaster: Option<Arc<dyn TextElement>>,
}

pub struct Notifier {
    elements: NoticeElements,
    toast_duration: Duration,
    toast_generation: Arc<AtomicU64>,
}

impl Notifier {
    pub fn new(elements: NoticeElements, toast_duration: Duration) -> Self {
        Self {
            elements,
            toast_duration,
            toast_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Notifier for a page without any notice elements.
    pub fn detached() -> Self {
        Self::new(NoticeElements::default(), DEFAULT_TOAST_DURATION)
    }

    pub fn show_error(&self, message: &str) {
        let Some(banner) = &self.elements.error_banner else {
            debug!(message, "error banner absent; dropping error");
            return;
        };
        banner.set_text(message);
        banner.set_visible(true);
    }

    pub fn clear_error(&self) {
        if let Some(banner) = &self.elements.error_banner {
            banner.set_visible(false);
        }
    }

    pub fn show_loading(&self, on: bool) {
        if let Some(loading) = &self.elements.loading {
            loading.set_visible(on);
        }
    }

    /// Turns the busy indicator on until the returned guard is dropped.
    pub fn loading(&self) -> LoadingGuard<'_> {
        self.show_loading(true);
        LoadingGuard { notifier: self }
    }

    pub fn toast(&self, message: &str) {
        self.toast_for(message, self.toast_duration);
    }

    /// Shows `message` and hides it after `duration`. A later toast overwrites the text and
    /// restarts the timer; an older timer never hides a newer toast.
    pub fn toast_for(&self, message: &str, duration: Duration) {
        let Some(toaster) = &self.elements.toaster else {
            return;
        };
        toaster.set_text(message);
        toaster.set_visible(true);

        let generation = self.toast_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime available; toast stays visible");
            return;
        };

        let toaster = Arc::clone(toaster);
        let current = Arc::clone(&self.toast_generation);
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if current.load(Ordering::SeqCst) == generation {
                toaster.set_visible(false);
            }
        });
    }
}

pub struct LoadingGuard<'a> {
    notifier: &'a Notifier,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.notifier.show_loading(false);
    }
}

#[cfg(test)]
#[path = "tests/surface_tests.rs"]
mod tests;
