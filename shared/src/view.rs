use serde::{Deserialize, Serialize};

use crate::model::{InputMode, Label, Model, PendingConfirmation, ResultStats, ServiceStatus};
use crate::notification::{Phase, Severity};
use crate::staging::format_file_size;

pub const ELLIPSIS: &str = "...";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub input_mode: InputMode,
    pub text_input: String,
    pub staged_file: Option<StagedFileView>,
    pub drag_over: bool,
    pub is_loading: bool,
    pub classify_enabled: bool,
    pub show_results: bool,
    pub stats: ResultStats,
    pub cards: Vec<ResultCardView>,
    pub confirm: Option<ConfirmView>,
    pub notifications: Vec<NotificationView>,
    pub service_status: ServiceStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StagedFileView {
    pub name: String,
    pub size_label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResultCardView {
    pub index: usize,
    pub label: Label,
    pub badge: String,
    pub preview: String,
    pub expanded: bool,
    pub body: String,
    pub suggested_reply: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfirmView {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub leaving: bool,
}

/// First `max_chars` characters, with an ellipsis only if some were cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

fn confirm_view(pending: PendingConfirmation) -> ConfirmView {
    match pending {
        PendingConfirmation::ClearAll => ConfirmView {
            title: "Clear history".to_string(),
            message: "Are you sure you want to remove all classified emails?".to_string(),
            confirm_label: "Remove all".to_string(),
            cancel_label: "Cancel".to_string(),
        },
    }
}

pub fn build_view(model: &Model) -> ViewModel {
    let preview_chars = model.config.preview_chars;

    let cards = model
        .results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let label = result.label();
            ResultCardView {
                index,
                label,
                badge: label.badge().to_string(),
                preview: preview(&result.cleaned_text, preview_chars),
                expanded: model.expanded_cards.contains(&index),
                body: result.cleaned_text.clone(),
                suggested_reply: result.suggested_reply.clone(),
                keywords: result.keywords.clone(),
            }
        })
        .collect();

    ViewModel {
        input_mode: model.input_mode,
        text_input: model.text_input.clone(),
        staged_file: model.staged_file.as_ref().map(|file| StagedFileView {
            name: file.name.clone(),
            size_label: format_file_size(file.size_bytes),
        }),
        drag_over: model.drag_over,
        is_loading: model.is_loading,
        classify_enabled: !model.is_loading,
        show_results: !model.results.is_empty(),
        stats: model.results.stats(),
        cards,
        confirm: model.pending_confirmation.map(confirm_view),
        notifications: model
            .notifications
            .iter()
            .map(|n| NotificationView {
                id: n.id,
                message: n.message.clone(),
                severity: n.severity,
                leaving: n.phase == Phase::Leaving,
            })
            .collect(),
        service_status: model.service_status,
    }
}
