use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{HttpResult, KvResult, TimerOutput};
use crate::config::ClientConfig;
use crate::model::InputMode;

/// Where a candidate file came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileSource {
    Picker,
    Drop,
}

/// A file the user picked or dropped, before validation.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }
}

// File bodies are user content and can be megabytes long.
impl fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.content.len())
            .finish()
    }
}

// --- Event enum: large payloads boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Configured(Box<ClientConfig>),
    Started,

    // Input
    ModeSelected(InputMode),
    TextChanged(String),
    FileSelected {
        file: Box<FileCandidate>,
        source: FileSource,
    },
    FileCleared,
    DragEntered,
    DragLeft,

    // Classification
    ClassifyRequested,
    ClearAllRequested,
    ClearAllDecided {
        confirmed: bool,
    },
    CardToggled {
        index: usize,
    },
    NotificationDismissed {
        id: u64,
    },
    HealthCheckRequested,

    // Capability responses
    #[serde(skip)]
    ClassifyResponded(Box<HttpResult>),
    #[serde(skip)]
    HealthChecked(Box<HttpResult>),
    #[serde(skip)]
    SnapshotLoaded(Box<KvResult>),
    #[serde(skip)]
    SnapshotSaved(Box<KvResult>),
    #[serde(skip)]
    NotificationTimer(TimerOutput),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Configured(_) => "configured",
            Event::Started => "started",
            Event::ModeSelected(_) => "mode_selected",
            Event::TextChanged(_) => "text_changed",
            Event::FileSelected { .. } => "file_selected",
            Event::FileCleared => "file_cleared",
            Event::DragEntered => "drag_entered",
            Event::DragLeft => "drag_left",
            Event::ClassifyRequested => "classify_requested",
            Event::ClearAllRequested => "clear_all_requested",
            Event::ClearAllDecided { .. } => "clear_all_decided",
            Event::CardToggled { .. } => "card_toggled",
            Event::NotificationDismissed { .. } => "notification_dismissed",
            Event::HealthCheckRequested => "health_check_requested",
            Event::ClassifyResponded(_) => "classify_responded",
            Event::HealthChecked(_) => "health_checked",
            Event::SnapshotLoaded(_) => "snapshot_loaded",
            Event::SnapshotSaved(_) => "snapshot_saved",
            Event::NotificationTimer(_) => "notification_timer",
        }
    }

    pub fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Event::ModeSelected(_)
                | Event::TextChanged(_)
                | Event::FileSelected { .. }
                | Event::FileCleared
                | Event::DragEntered
                | Event::DragLeft
                | Event::ClassifyRequested
                | Event::ClearAllRequested
                | Event::ClearAllDecided { .. }
                | Event::CardToggled { .. }
                | Event::NotificationDismissed { .. }
        )
    }
}
