#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod model;
pub mod notification;
pub mod staging;
pub mod store;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ClientConfig;
pub use crux_core::{render::Render, Core};
pub use event::{Event, FileCandidate, FileSource};
pub use model::Model;
pub use view::ViewModel;

use crate::capabilities::{CapabilityError, HttpError, KeyValueError, KvError};
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::model::SnapshotError;
use crate::staging::StagingError;

pub const DEFAULT_CLASSIFY_PATH: &str = "/api/classify";
pub const DEFAULT_HEALTH_PATH: &str = "/api/health";
pub const DEFAULT_STORAGE_KEY: &str = "classifiedEmails";
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;
pub const NOTIFICATION_VISIBLE_MS: u64 = 4000;
pub const NOTIFICATION_EXIT_MS: u64 = 300;
pub const PREVIEW_CHARS: usize = 150;

pub const MSG_CLEARED: &str = "All emails were removed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    Server,
    Application,
    MalformedResponse,
    Storage,
    Serialization,
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Application => "APPLICATION_ERROR",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
        }
    }

    /// Whether errors of this kind reach the user as a notification.
    /// Persistence and configuration problems are only logged.
    #[must_use]
    pub const fn is_user_visible(self) -> bool {
        !matches!(
            self,
            Self::Storage | Self::Serialization | Self::Configuration
        )
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server | Self::Storage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation
            | ErrorKind::Network
            | ErrorKind::Server
            | ErrorKind::Application
            | ErrorKind::MalformedResponse => self.message.clone(),
            ErrorKind::Storage => "Unable to save data locally.".into(),
            ErrorKind::Serialization => "A data error occurred.".into(),
            ErrorKind::Configuration => "The app is misconfigured.".into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<StagingError> for AppError {
    fn from(e: StagingError) -> Self {
        let max = match &e {
            StagingError::TooLarge { max, .. } => *max,
            StagingError::UnsupportedType { .. } => MAX_UPLOAD_BYTES,
        };
        AppError::new(ErrorKind::Validation, e.user_message(max)).with_internal(e.to_string())
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        let kind = match &e {
            DispatchError::EmptyText | DispatchError::NoFileStaged => ErrorKind::Validation,
            DispatchError::Request(_) => ErrorKind::Configuration,
            DispatchError::Transport(_) => ErrorKind::Network,
            DispatchError::HttpStatus { .. } => ErrorKind::Server,
            DispatchError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            DispatchError::Application(_) => ErrorKind::Application,
        };
        let mut error = AppError::new(kind, e.user_message()).with_internal(e.to_string());
        if let DispatchError::HttpStatus { status, .. } = &e {
            error = error.with_context("http_status", status.to_string());
        }
        error
    }
}

impl From<SnapshotError> for AppError {
    fn from(e: SnapshotError) -> Self {
        let kind = match &e {
            SnapshotError::Serialize(_) => ErrorKind::Serialization,
            SnapshotError::Parse(_) => ErrorKind::Storage,
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        let kind = if e.is_transport() {
            ErrorKind::Network
        } else {
            ErrorKind::Configuration
        };
        let mut error = AppError::new(kind, dispatch::MSG_CONNECTION).with_internal(e.to_string());
        if let Some(request_id) = e.request_id() {
            error = error.with_context("request_id", request_id);
        }
        error
    }
}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        AppError::new(ErrorKind::Storage, e.to_string())
    }
}

impl From<KeyValueError> for AppError {
    fn from(e: KeyValueError) -> Self {
        KvError::from(e).into()
    }
}

impl From<CapabilityError> for AppError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Http(e) => e.into(),
            CapabilityError::Kv(e) => e.into(),
        }
    }
}

pub mod app {
    use tracing::{debug, error, info, warn};

    use crate::capabilities::{check_value_size, Capabilities, KvResult};
    use crate::dispatch::{self, ClassifyBatch};
    use crate::event::{Event, FileSource};
    use crate::model::{Model, PendingConfirmation, ResultCollection, ServiceStatus};
    use crate::notification::{Severity, TimerRequest};
    use crate::staging;
    use crate::view::{build_view, ViewModel};
    use crate::{AppError, MSG_CLEARED};

    #[derive(Default)]
    pub struct App;

    impl App {
        /// Writes the whole collection under the configured key.
        fn persist(model: &Model, caps: &Capabilities) {
            let bytes = match model.results.to_snapshot() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %AppError::from(e), "snapshot serialization failed");
                    return;
                }
            };

            let key = match model.config.storage_key() {
                Ok(key) => key,
                Err(e) => {
                    error!(error = %AppError::from(e), "snapshot not written");
                    return;
                }
            };
            if let Err(e) = check_value_size(&bytes) {
                error!(error = %AppError::from(e), "snapshot not written");
                return;
            }

            debug!(entries = model.results.len(), "persisting history");
            caps.key_value.set(key.into_string(), bytes, |result| {
                Event::SnapshotSaved(Box::new(result))
            });
        }

        fn notify(model: &mut Model, caps: &Capabilities, message: String, severity: Severity) {
            let visible_ms = model.config.notification_visible_ms;
            let (_, timer) = model.notifications.notify(message, severity, visible_ms);
            Self::schedule(timer, caps);
        }

        fn notify_error(model: &mut Model, caps: &Capabilities, error: &AppError) {
            if !error.kind.is_user_visible() {
                error!(code = error.code(), error = %error, "error kept from the user");
                return;
            }
            Self::notify(model, caps, error.user_facing_message(), Severity::Error);
        }

        fn schedule(request: TimerRequest, caps: &Capabilities) {
            match request {
                TimerRequest::Start { id, millis } => {
                    caps.timer.start(id, millis, Event::NotificationTimer);
                }
                TimerRequest::Cancel { id } => caps.timer.cancel(id),
            }
        }

        fn apply_batch(batch: ClassifyBatch, model: &mut Model, caps: &Capabilities) {
            let ClassifyBatch { emails, total } = batch;
            info!(received = emails.len(), total, "classification succeeded");

            if !model.snapshot_loaded {
                model.merged_before_load = true;
            }
            model.results.merge_batch(emails);
            model.collection_changed();
            Self::persist(model, caps);

            model.reset_inputs();
            Self::notify(
                model,
                caps,
                format!("{total} email(s) classified successfully!"),
                Severity::Success,
            );
        }

        fn apply_snapshot(result: KvResult, model: &mut Model, caps: &Capabilities) {
            if model.snapshot_loaded {
                debug!("snapshot already applied");
                return;
            }
            model.snapshot_loaded = true;

            let bytes = match result {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!("no stored history");
                    return;
                }
                Err(e) => {
                    warn!(error = %AppError::from(e), "could not read stored history");
                    return;
                }
            };

            let restored = match ResultCollection::from_snapshot(&bytes) {
                Ok(restored) => restored,
                Err(e) => {
                    warn!(error = %AppError::from(e), bytes = bytes.len(), "discarding unreadable history");
                    return;
                }
            };

            if model.merged_before_load {
                model.results.append_older(restored);
                Self::persist(model, caps);
            } else {
                model.results = restored;
            }
            model.collection_changed();
            info!(entries = model.results.len(), "history restored");
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(
                event = event.name(),
                user = event.is_user_initiated(),
                "update"
            );

            match event {
                Event::Configured(config) => {
                    match config.validate() {
                        Ok(()) => {
                            info!(
                                base_url = config.api_base_url.as_deref().unwrap_or("same-origin"),
                                "configuration applied"
                            );
                            model.config = *config;
                        }
                        Err(e) => {
                            warn!(error = %AppError::from(e), "ignoring invalid configuration");
                        }
                    }
                    caps.render.render();
                }

                Event::Started => {
                    if model.started {
                        debug!("already started");
                        return;
                    }
                    model.started = true;

                    match model.config.storage_key() {
                        Ok(key) => caps.key_value.get(key.into_string(), |result| {
                            Event::SnapshotLoaded(Box::new(result))
                        }),
                        Err(e) => {
                            model.snapshot_loaded = true;
                            warn!(error = %AppError::from(e), "history not loaded");
                        }
                    }
                    caps.render.render();
                }

                Event::SnapshotLoaded(result) => {
                    Self::apply_snapshot(*result, model, caps);
                    caps.render.render();
                }

                Event::SnapshotSaved(result) => match *result {
                    Ok(_) => debug!("history persisted"),
                    Err(e) => error!(error = %AppError::from(e), "history write failed"),
                },

                Event::ModeSelected(mode) => {
                    model.input_mode = mode;
                    caps.render.render();
                }

                Event::TextChanged(text) => {
                    model.text_input = text;
                    caps.render.render();
                }

                Event::FileSelected { file, source } => {
                    if source == FileSource::Drop {
                        model.drag_over = false;
                    }

                    match staging::validate(*file, model.config.max_upload_bytes) {
                        Ok(staged) => {
                            info!(
                                name = %staged.name,
                                mime_type = %staged.mime_type,
                                size_bytes = staged.size_bytes,
                                ?source,
                                "file staged"
                            );
                            model.staged_file = Some(staged);
                        }
                        Err(e) => {
                            debug!(error = %e, "file rejected");
                            let message = e.user_message(model.config.max_upload_bytes);
                            Self::notify(model, caps, message, Severity::Error);
                        }
                    }
                    caps.render.render();
                }

                Event::FileCleared => {
                    model.staged_file = None;
                    caps.render.render();
                }

                Event::DragEntered => {
                    model.drag_over = true;
                    caps.render.render();
                }

                Event::DragLeft => {
                    model.drag_over = false;
                    caps.render.render();
                }

                Event::ClassifyRequested => {
                    if model.is_loading {
                        debug!("classification already in flight");
                        return;
                    }

                    match dispatch::build_request(model) {
                        Ok(request) => {
                            debug!(request_id = request.request_id(), "dispatching classification");
                            model.is_loading = true;
                            caps.http.send(request, |result| {
                                Event::ClassifyResponded(Box::new(result))
                            });
                        }
                        Err(e) => {
                            if e.is_validation() {
                                debug!(error = %e, "nothing to classify");
                            } else {
                                warn!(error = %e, "classification request not built");
                            }
                            Self::notify_error(model, caps, &AppError::from(e));
                        }
                    }
                    caps.render.render();
                }

                Event::ClassifyResponded(result) => {
                    model.is_loading = false;

                    match dispatch::interpret_response(*result) {
                        Ok(batch) => Self::apply_batch(batch, model, caps),
                        Err(e) => {
                            let error = AppError::from(e);
                            warn!(code = error.code(), error = %error, "classification failed");
                            Self::notify_error(model, caps, &error);
                        }
                    }
                    caps.render.render();
                }

                Event::ClearAllRequested => {
                    model.pending_confirmation = Some(PendingConfirmation::ClearAll);
                    caps.render.render();
                }

                Event::ClearAllDecided { confirmed } => {
                    if model.pending_confirmation.take().is_none() {
                        debug!("no confirmation pending");
                        return;
                    }

                    if confirmed {
                        info!(removed = model.results.len(), "history cleared");
                        model.results.clear();
                        model.collection_changed();
                        Self::persist(model, caps);
                        Self::notify(model, caps, MSG_CLEARED.to_string(), Severity::Success);
                    }
                    caps.render.render();
                }

                Event::CardToggled { index } => {
                    if model.toggle_card(index) {
                        caps.render.render();
                    } else {
                        debug!(index, "toggle for unknown card");
                    }
                }

                Event::NotificationTimer(output) => {
                    let exit_ms = model.config.notification_exit_ms;
                    if let Some(next) = model.notifications.on_timer(output, exit_ms) {
                        Self::schedule(next, caps);
                    }
                    caps.render.render();
                }

                Event::NotificationDismissed { id } => {
                    let exit_ms = model.config.notification_exit_ms;
                    for request in model.notifications.dismiss(id, exit_ms) {
                        Self::schedule(request, caps);
                    }
                    caps.render.render();
                }

                Event::HealthCheckRequested => {
                    match dispatch::build_health_request(&model.config) {
                        Ok(request) => caps.http.send(request, |result| {
                            Event::HealthChecked(Box::new(result))
                        }),
                        Err(e) => {
                            warn!(error = %AppError::from(e), "health check not sent");
                            model.service_status = ServiceStatus::Unreachable;
                            caps.render.render();
                        }
                    }
                }

                Event::HealthChecked(result) => {
                    model.service_status = dispatch::interpret_health(&result);
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            build_view(model)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod error_tests {
        use super::*;

        #[test]
        fn validation_errors_keep_their_message() {
            let error = AppError::from(DispatchError::EmptyText);
            assert_eq!(error.kind, ErrorKind::Validation);
            assert_eq!(error.user_facing_message(), "Please enter the email text");
            assert!(error.kind.is_user_visible());
        }

        #[test]
        fn staging_errors_are_validation() {
            let error = AppError::from(StagingError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                max: MAX_UPLOAD_BYTES,
            });
            assert_eq!(error.kind, ErrorKind::Validation);
            assert_eq!(error.user_facing_message(), "File too large. Maximum: 16MB");
        }

        #[test]
        fn http_status_carries_context() {
            let error = AppError::from(DispatchError::HttpStatus {
                status: 500,
                message: None,
            });
            assert_eq!(error.kind, ErrorKind::Server);
            assert_eq!(error.context.get("http_status").map(String::as_str), Some("500"));
            assert_eq!(error.user_facing_message(), "Error connecting to the server");
        }

        #[test]
        fn persistence_errors_are_not_user_visible() {
            let error = AppError::from(SnapshotError::Parse("eof".into()));
            assert_eq!(error.kind, ErrorKind::Storage);
            assert!(!error.kind.is_user_visible());

            let error = AppError::from(CapabilityError::Kv(KvError::ValueTooLarge {
                size: 10,
                max: 5,
            }));
            assert_eq!(error.kind, ErrorKind::Storage);

            let error = AppError::from(KeyValueError::Timeout);
            assert_eq!(error.kind, ErrorKind::Storage);
        }

        #[test]
        fn transport_errors_are_network() {
            let error = AppError::from(HttpError::Timeout {
                timeout_ms: 5,
                request_id: "r-9".into(),
            });
            assert_eq!(error.kind, ErrorKind::Network);
            assert!(error.kind.is_retryable());
            assert_eq!(error.context.get("request_id").map(String::as_str), Some("r-9"));
        }

        #[test]
        fn display_includes_code_and_internal() {
            let error = AppError::new(ErrorKind::Application, "nope").with_internal("detail");
            assert_eq!(error.to_string(), "[APPLICATION_ERROR] nope (internal: detail)");
        }
    }

    mod app_tests {
        use crux_core::testing::AppTester;

        use super::*;
        use crate::capabilities::{HttpResponse, KeyValueOperation, TimerOperation};
        use crate::model::InputMode;

        fn tester() -> AppTester<App, Effect> {
            AppTester::default()
        }

        #[test]
        fn mode_switch_keeps_other_inputs() {
            let app = tester();
            let mut model = Model::default();

            app.update(Event::TextChanged("draft".into()), &mut model);
            app.update(Event::ModeSelected(InputMode::File), &mut model);
            app.update(Event::ModeSelected(InputMode::Text), &mut model);

            assert_eq!(model.text_input, "draft");
            assert_eq!(app.view(&model).input_mode, InputMode::Text);
        }

        #[test]
        fn started_is_honoured_once() {
            let app = tester();
            let mut model = Model::default();

            let first = app.update(Event::Started, &mut model);
            let gets = first
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::KeyValue(r) if matches!(r.operation, KeyValueOperation::Get { .. })))
                .count();
            assert_eq!(gets, 1);

            let second = app.update(Event::Started, &mut model);
            assert!(second.effects.is_empty());
        }

        #[test]
        fn unusable_timeout_is_rejected_and_never_shown() {
            let app = tester();
            let mut model = Model::default();

            let config = ClientConfig {
                request_timeout_ms: Some(0),
                ..ClientConfig::default()
            };
            app.update(Event::Configured(Box::new(config)), &mut model);
            assert_eq!(model.config.request_timeout_ms, None);

            // A model built around the check still never reaches the user.
            model.config.request_timeout_ms = Some(0);
            app.update(Event::TextChanged("Hello boss".into()), &mut model);
            let update = app.update(Event::ClassifyRequested, &mut model);

            assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
            assert!(!model.is_loading);
            assert!(model.notifications.is_empty());
        }

        #[test]
        fn drag_flags_and_drop_reset() {
            let app = tester();
            let mut model = Model::default();

            app.update(Event::DragEntered, &mut model);
            assert!(app.view(&model).drag_over);

            app.update(
                Event::FileSelected {
                    file: Box::new(FileCandidate::new("a.txt", "text/plain", b"hi".to_vec())),
                    source: FileSource::Drop,
                },
                &mut model,
            );
            assert!(!model.drag_over);
            assert!(model.staged_file.is_some());
        }

        #[test]
        fn health_check_updates_status_without_notifying() {
            let app = tester();
            let mut model = Model::default();

            let mut update = app.update(Event::HealthCheckRequested, &mut model);
            let mut request = update
                .effects
                .drain(..)
                .find_map(|e| match e {
                    Effect::Http(r) => Some(r),
                    _ => None,
                })
                .expect("health request");

            let response =
                HttpResponse::ok_json(&serde_json::json!({ "status": "healthy", "service": "x" }));
            let resolved = app.resolve(&mut request, Ok(response)).expect("resolves");
            for event in resolved.events {
                app.update(event, &mut model);
            }

            assert_eq!(model.service_status, crate::model::ServiceStatus::Healthy);
            assert!(model.notifications.is_empty());
        }

        #[test]
        fn dismissing_notification_cancels_its_timer() {
            let app = tester();
            let mut model = Model::default();

            app.update(Event::ClassifyRequested, &mut model);
            let id = model.notifications.iter().next().expect("validation notice").id;

            let update = app.update(Event::NotificationDismissed { id }, &mut model);
            let ops: Vec<TimerOperation> = update
                .effects
                .into_iter()
                .filter_map(|e| match e {
                    Effect::Timer(r) => Some(r.operation),
                    _ => None,
                })
                .collect();

            assert!(ops.iter().any(|op| matches!(op, TimerOperation::Cancel { .. })));
            assert!(ops
                .iter()
                .any(|op| matches!(op, TimerOperation::Start { millis: 300, .. })));
            assert!(app.view(&model).notifications[0].leaving);
        }
    }
}
