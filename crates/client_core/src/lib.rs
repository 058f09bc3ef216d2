//! Client-side controller for the image → HTML preview → Siebel WebTemplate workflow.

pub mod assistant;
pub mod backend;
pub mod coordinator;
pub mod endpoints;
pub mod manifest;
pub mod page;
pub mod pmpr;
pub mod session;
pub mod surface;

pub use assistant::{AssistantHandler, ChatElements, ChatMessage};
pub use backend::{BackendError, HttpBackend, ImageUpload, WorkflowBackend};
pub use coordinator::{
    GenerateTrigger, GenerationReport, WorkflowCoordinator, WorkflowElements, WorkflowOptions,
};
pub use manifest::GeneratedLink;
pub use page::{mount, ChatSlots, Controllers, Page, PmPrSlots};
pub use pmpr::{GeneratedScaffold, PmPrElements, PmPrSection};
pub use session::{Session, SessionState};
pub use surface::{
    InputElement, LinkListElement, Navigator, NoticeElements, Notifier, Panel, TargetElement,
    TextElement, TranscriptElement,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
