use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Stage;

pub const INVALID_RESPONSE_MESSAGE: &str = "Server returned an invalid response.";
pub const MISSING_IMAGE_MESSAGE: &str = "Please select an image to upload.";
pub const INVALID_PMPR_MESSAGE: &str = "Choose PM/PR and enter a name.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Detected locally; no request was issued.
    Validation,
    /// The request never produced a usable reply.
    Transport,
    /// The reply body could not be decoded.
    Protocol,
    /// Well-formed reply carrying a failure flag.
    Application,
}

/// Failure of a single workflow operation. `Display` yields the text shown on the banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{}", MISSING_IMAGE_MESSAGE)]
    MissingImage,
    #[error("{}", INVALID_PMPR_MESSAGE)]
    InvalidPmPrRequest,
    #[error("{}", transport_message(*.stage))]
    Transport { stage: Stage },
    #[error("{}", INVALID_RESPONSE_MESSAGE)]
    InvalidResponse { stage: Stage },
    #[error("{message}")]
    Application { stage: Stage, message: String },
}

impl WorkflowError {
    /// Application failure with the server text, or the stage fallback when it is absent
    /// or empty.
    pub fn application(stage: Stage, message: Option<&str>) -> Self {
        let message = message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| application_fallback(stage))
            .to_string();
        Self::Application { stage, message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::MissingImage | WorkflowError::InvalidPmPrRequest => {
                ErrorKind::Validation
            }
            WorkflowError::Transport { .. } => ErrorKind::Transport,
            WorkflowError::InvalidResponse { .. } => ErrorKind::Protocol,
            WorkflowError::Application { .. } => ErrorKind::Application,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::MissingImage => Stage::Convert,
            WorkflowError::InvalidPmPrRequest => Stage::PmPr,
            WorkflowError::Transport { stage }
            | WorkflowError::InvalidResponse { stage }
            | WorkflowError::Application { stage, .. } => *stage,
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

pub fn transport_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Convert => "Network error during conversion.",
        Stage::Retry => "Network error during retry.",
        Stage::Generate => "Network error during generation.",
        Stage::Assist => "Network error",
        Stage::PmPr => "Network error during PM/PR generation.",
    }
}

pub fn application_fallback(stage: Stage) -> &'static str {
    match stage {
        Stage::Convert => "Conversion failed.",
        Stage::Retry => "Retry failed.",
        Stage::Generate => "Generation failed.",
        Stage::Assist => "Error",
        Stage::PmPr => "PM/PR generation failed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_falls_back_per_stage() {
        assert_eq!(
            WorkflowError::application(Stage::Convert, None).to_string(),
            "Conversion failed."
        );
        assert_eq!(
            WorkflowError::application(Stage::Generate, Some("")).to_string(),
            "Generation failed."
        );
        assert_eq!(
            WorkflowError::application(Stage::Retry, Some("Previous session expired."))
                .to_string(),
            "Previous session expired."
        );
    }

    #[test]
    fn transport_errors_hide_detail_behind_fixed_text() {
        let err = WorkflowError::Transport {
            stage: Stage::Convert,
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.user_message(), "Network error during conversion.");
    }

    #[test]
    fn protocol_error_is_distinct_from_application_error() {
        let err = WorkflowError::InvalidResponse {
            stage: Stage::Generate,
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), INVALID_RESPONSE_MESSAGE);
        assert_eq!(
            WorkflowError::MissingImage.kind(),
            ErrorKind::Validation
        );
    }
}
