use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::capabilities::{ContentType, FormPart, HttpError, HttpRequest, HttpResult};
use crate::config::ClientConfig;
use crate::model::{ClassificationResult, InputMode, Model, ServiceStatus};

pub const FILE_FIELD: &str = "file";

pub const MSG_EMPTY_TEXT: &str = "Please enter the email text";
pub const MSG_NO_FILE: &str = "Please select a file";
pub const MSG_CONNECTION: &str = "Error connecting to the server";
pub const MSG_CLASSIFY_FAILED: &str = "Error classifying emails";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no text to classify")]
    EmptyText,
    #[error("no file staged")]
    NoFileStaged,
    #[error("could not build request: {0}")]
    Request(HttpError),
    #[error("transport failed: {0}")]
    Transport(HttpError),
    #[error("server answered with status {status}")]
    HttpStatus { status: u16, message: Option<String> },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("service reported failure")]
    Application(Option<String>),
}

impl DispatchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DispatchError::EmptyText | DispatchError::NoFileStaged)
    }

    pub fn user_message(&self) -> String {
        match self {
            DispatchError::EmptyText => MSG_EMPTY_TEXT.to_string(),
            DispatchError::NoFileStaged => MSG_NO_FILE.to_string(),
            DispatchError::HttpStatus {
                message: Some(message),
                ..
            }
            | DispatchError::Application(Some(message)) => message.clone(),
            DispatchError::Application(None) => MSG_CLASSIFY_FAILED.to_string(),
            DispatchError::Request(_)
            | DispatchError::Transport(_)
            | DispatchError::HttpStatus { message: None, .. }
            | DispatchError::MalformedResponse(_) => MSG_CONNECTION.to_string(),
        }
    }
}

#[derive(Serialize)]
struct TextPayload<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    emails: Option<Vec<ClassificationResult>>,
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// The entries from one successful call, plus the count to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyBatch {
    pub emails: Vec<ClassificationResult>,
    pub total: usize,
}

/// Builds the classify call for the active input mode. Fails without
/// touching the network when that mode has nothing to send.
#[instrument(skip_all, fields(mode = ?model.input_mode))]
pub fn build_request(model: &Model) -> Result<HttpRequest, DispatchError> {
    let config = &model.config;

    let request = match model.input_mode {
        InputMode::Text => {
            let text = model.text_input.trim();
            if text.is_empty() {
                return Err(DispatchError::EmptyText);
            }
            debug!(chars = text.chars().count(), "classifying pasted text");
            HttpRequest::post(config.classify_url().map_err(DispatchError::Request)?)
                .with_json(&TextPayload { text })
                .map_err(DispatchError::Request)?
        }
        InputMode::File => {
            let file = model
                .staged_file
                .as_ref()
                .ok_or(DispatchError::NoFileStaged)?;
            debug!(
                name = %file.name,
                mime_type = %file.mime_type,
                size_bytes = file.size_bytes,
                "classifying staged file"
            );
            let part = FormPart::file(
                FILE_FIELD,
                file.name.as_str(),
                file.mime_type.as_str(),
                file.content.clone(),
            );
            HttpRequest::post(config.classify_url().map_err(DispatchError::Request)?)
                .with_multipart(vec![part])
                .map_err(DispatchError::Request)?
        }
    };

    finish_request(request, config).map_err(DispatchError::Request)
}

pub fn build_health_request(config: &ClientConfig) -> Result<HttpRequest, HttpError> {
    finish_request(HttpRequest::get(config.health_url()?), config)
}

fn finish_request(request: HttpRequest, config: &ClientConfig) -> Result<HttpRequest, HttpError> {
    let request = request.with_header("Accept", ContentType::Json.as_str())?;
    match config.request_timeout_ms {
        Some(ms) => request.with_timeout_ms(ms),
        None => Ok(request),
    }
}

/// Turns the service reply into a batch, or the single error to show.
///
/// The body is read whatever the status, so a non-2xx reply carrying
/// `{ "error": ... }` surfaces the service's own message.
pub fn interpret_response(result: HttpResult) -> Result<ClassifyBatch, DispatchError> {
    let response = result.map_err(DispatchError::Transport)?;
    let parsed = serde_json::from_slice::<ClassifyResponse>(response.body());

    if !response.is_success() {
        let message = parsed.ok().and_then(|body| body.error);
        return Err(DispatchError::HttpStatus {
            status: response.status(),
            message,
        });
    }

    let body = parsed.map_err(|e| {
        let content_type = response.content_type();
        warn!(
            status = response.status(),
            content_type = content_type.as_ref().map_or("none", ContentType::as_str),
            "classification reply is not the expected JSON"
        );
        DispatchError::MalformedResponse(e.to_string())
    })?;
    if !body.success {
        return Err(DispatchError::Application(body.error));
    }

    let emails = body.emails.unwrap_or_default();
    let total = body.total.unwrap_or(emails.len());
    Ok(ClassifyBatch { emails, total })
}

pub fn interpret_health(result: &HttpResult) -> ServiceStatus {
    match result {
        Ok(response) if response.is_success() => {
            match response.json::<HealthResponse>() {
                Ok(body) if body.status == "healthy" => ServiceStatus::Healthy,
                Ok(body) => {
                    warn!(status = %body.status, "service reports unhealthy status");
                    ServiceStatus::Unreachable
                }
                Err(e) => {
                    warn!(error = %e, "health response unreadable");
                    ServiceStatus::Unreachable
                }
            }
        }
        Ok(response) => {
            warn!(status = response.status(), "health check failed");
            ServiceStatus::Unreachable
        }
        Err(e) => {
            warn!(error = %e, "health check transport error");
            ServiceStatus::Unreachable
        }
    }
}
