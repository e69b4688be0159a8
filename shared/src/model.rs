use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::notification::NotificationCenter;

pub const LABEL_IMPORTANT: &str = "Importante";
pub const LABEL_DISMISSIBLE: &str = "Despresível";

#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputMode {
    #[default]
    Text,
    File,
}

/// A file that passed staging validation. Replaced wholesale, never edited.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content: Vec<u8>,
}

impl fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Important,
    Dismissible,
}

impl Label {
    /// Anything the service sends other than the "important" marker is
    /// treated as dismissible.
    pub fn from_wire(value: &str) -> Self {
        match value {
            LABEL_IMPORTANT | "Important" => Label::Important,
            _ => Label::Dismissible,
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Label::Important => "Important",
            Label::Dismissible => "Dismissible",
        }
    }
}

/// One classified email as returned by the service and stored in the
/// snapshot. Field names follow the service's JSON.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    #[serde(rename = "email_limpo")]
    pub cleaned_text: String,
    #[serde(rename = "classificacao")]
    pub classification: String,
    #[serde(
        rename = "resposta_sugerida",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_reply: Option<String>,
    #[serde(
        rename = "palavras_chave",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub keywords: Vec<String>,
}

impl ClassificationResult {
    pub fn label(&self) -> Label {
        Label::from_wire(&self.classification)
    }

    pub fn is_important(&self) -> bool {
        self.label() == Label::Important
    }
}

impl fmt::Debug for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationResult")
            .field("classification", &self.classification)
            .field("cleaned_text_chars", &self.cleaned_text.chars().count())
            .field("suggested_reply_present", &self.suggested_reply.is_some())
            .field("keywords", &self.keywords.len())
            .finish()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("failed to serialize results: {0}")]
    Serialize(String),
    #[error("failed to parse snapshot: {0}")]
    Parse(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResultStats {
    pub total: usize,
    pub important: usize,
    pub dismissible: usize,
}

/// Newest-first history of classified emails. This is what gets persisted.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResultCollection(Vec<ClassificationResult>);

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ClassificationResult] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&ClassificationResult> {
        self.0.get(index)
    }

    /// Puts a whole batch, in received order, ahead of everything already held.
    pub fn merge_batch(&mut self, batch: Vec<ClassificationResult>) {
        if batch.is_empty() {
            return;
        }
        let older = std::mem::replace(&mut self.0, batch);
        self.0.extend(older);
    }

    /// Appends entries that are older than everything already held.
    pub fn append_older(&mut self, older: ResultCollection) {
        self.0.extend(older.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn stats(&self) -> ResultStats {
        let total = self.0.len();
        let important = self.0.iter().filter(|r| r.is_important()).count();
        ResultStats {
            total,
            important,
            dismissible: total - important,
        }
    }

    pub fn to_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(&self.0).map_err(|e| SnapshotError::Serialize(e.to_string()))
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::Parse(e.to_string()))
    }
}

impl From<Vec<ClassificationResult>> for ResultCollection {
    fn from(results: Vec<ClassificationResult>) -> Self {
        Self(results)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Healthy,
    Unreachable,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingConfirmation {
    ClearAll,
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: ClientConfig,

    // Input
    pub input_mode: InputMode,
    pub text_input: String,
    pub staged_file: Option<StagedFile>,
    pub drag_over: bool,

    // Results
    pub results: ResultCollection,
    pub expanded_cards: BTreeSet<usize>,

    // Generic UI state
    pub is_loading: bool,
    pub pending_confirmation: Option<PendingConfirmation>,
    pub notifications: NotificationCenter,
    pub service_status: ServiceStatus,

    // Startup bookkeeping
    pub started: bool,
    pub snapshot_loaded: bool,
    pub merged_before_load: bool,
}

impl Model {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Clears both input surfaces, whichever mode was used.
    pub fn reset_inputs(&mut self) {
        self.text_input.clear();
        self.staged_file = None;
    }

    pub fn collection_changed(&mut self) {
        self.expanded_cards.clear();
    }

    pub fn toggle_card(&mut self, index: usize) -> bool {
        if index >= self.results.len() {
            return false;
        }
        if !self.expanded_cards.remove(&index) {
            self.expanded_cards.insert(index);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, text: &str) -> ClassificationResult {
        ClassificationResult {
            cleaned_text: text.to_string(),
            classification: label.to_string(),
            suggested_reply: None,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn parses_service_shape() {
        let json = br#"{
            "classificacao": "Importante",
            "email_limpo": "Hello boss",
            "resposta_sugerida": "On it",
            "palavras_chave": ["urgent"]
        }"#;
        let parsed: ClassificationResult = serde_json::from_slice(json).unwrap();
        assert_eq!(parsed.cleaned_text, "Hello boss");
        assert_eq!(parsed.label(), Label::Important);
        assert_eq!(parsed.suggested_reply.as_deref(), Some("On it"));
        assert_eq!(parsed.keywords, vec!["urgent".to_string()]);
    }

    #[test]
    fn optional_fields_tolerate_absence_and_null() {
        let parsed: ClassificationResult = serde_json::from_str(
            r#"{ "classificacao": "Despresível", "email_limpo": "x", "palavras_chave": null }"#,
        )
        .unwrap();
        assert!(parsed.keywords.is_empty());
        assert!(parsed.suggested_reply.is_none());
        assert_eq!(parsed.label(), Label::Dismissible);
    }

    #[test]
    fn unknown_label_is_dismissible() {
        assert_eq!(Label::from_wire("Spam"), Label::Dismissible);
        assert_eq!(Label::from_wire("Important"), Label::Important);
        assert_eq!(Label::from_wire(LABEL_DISMISSIBLE), Label::Dismissible);
    }

    #[test]
    fn merge_prepends_batch_in_order() {
        let mut results = ResultCollection::new();
        results.merge_batch(vec![result(LABEL_IMPORTANT, "a")]);
        results.merge_batch(vec![
            result(LABEL_DISMISSIBLE, "b1"),
            result(LABEL_IMPORTANT, "b2"),
        ]);

        let texts: Vec<_> = results.iter().map(|r| r.cleaned_text.as_str()).collect();
        assert_eq!(texts, ["b1", "b2", "a"]);
        assert_eq!(
            results.stats(),
            ResultStats {
                total: 3,
                important: 2,
                dismissible: 1
            }
        );
    }

    #[test]
    fn clear_zeroes_stats() {
        let mut results = ResultCollection::from(vec![result(LABEL_IMPORTANT, "a")]);
        results.clear();
        assert_eq!(results.stats(), ResultStats::default());
    }

    #[test]
    fn snapshot_keeps_wire_names() {
        let results = ResultCollection::from(vec![result(LABEL_IMPORTANT, "a")]);
        let bytes = results.to_snapshot().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json[0]["classificacao"], "Importante");
        assert_eq!(json[0]["email_limpo"], "a");
        assert!(json[0].get("resposta_sugerida").is_none());

        assert_eq!(ResultCollection::from_snapshot(&bytes).unwrap(), results);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        assert!(matches!(
            ResultCollection::from_snapshot(b"{oops"),
            Err(SnapshotError::Parse(_))
        ));
        assert!(ResultCollection::from_snapshot(b"{}").is_err());
    }

    #[test]
    fn debug_hides_email_text() {
        let printed = format!("{:?}", result(LABEL_IMPORTANT, "secret body"));
        assert!(!printed.contains("secret body"));
    }

    #[test]
    fn toggle_card_ignores_out_of_range() {
        let mut model = Model::default();
        model.results = ResultCollection::from(vec![result(LABEL_IMPORTANT, "a")]);
        assert!(model.toggle_card(0));
        assert!(model.expanded_cards.contains(&0));
        assert!(model.toggle_card(0));
        assert!(model.expanded_cards.is_empty());
        assert!(!model.toggle_card(5));
    }
}
