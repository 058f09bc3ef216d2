use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned name of the working directory that backs one conversion session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workdir(pub String);

impl Workdir {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Workdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Workdir {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Workflow step a request or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Convert,
    Retry,
    Generate,
    Assist,
    PmPr,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Convert => "convert",
            Stage::Retry => "retry",
            Stage::Generate => "generate",
            Stage::Assist => "assist",
            Stage::PmPr => "pmpr",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatRole {
    User,
    Bot,
    BotHtml,
}

impl ChatRole {
    pub fn as_class(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Bot => "bot",
            ChatRole::BotHtml => "bot-html",
        }
    }

    /// Only `bot-html` bubbles may be interpreted as markup.
    pub fn is_markup(self) -> bool {
        matches!(self, ChatRole::BotHtml)
    }
}

/// Presentation-model or physical-renderer scaffold requested from the PM/PR generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmPrKind {
    Pm,
    Pr,
}

impl PmPrKind {
    /// Case-insensitive parse of the form value; anything but `pm`/`pr` is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pm" => Some(PmPrKind::Pm),
            "pr" => Some(PmPrKind::Pr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PmPrKind::Pm => "pm",
            PmPrKind::Pr => "pr",
        }
    }
}
