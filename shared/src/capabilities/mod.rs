mod http;
mod kv;
mod timer;

pub use self::http::{
    encode_multipart, ContentType, FormPart, Http, HttpError, HttpHeaders, HttpMethod,
    HttpOperation, HttpOutput, HttpRequest, HttpResponse, HttpResult, RequestBody, ValidatedUrl,
    MAX_TIMEOUT_MS,
};
pub use self::kv::{
    check_value_size, KeyValue, KeyValueError, KeyValueOperation, KeyValueResponse,
    KeyValueResult, KvError, KvKey, KvResult, Value,
};
pub use self::timer::{Timer, TimerOperation, TimerOutput};

// Render is Crux's own capability; the shell just redraws from `view`.
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Storage error: {0}")]
    Kv(#[from] KvError),
}

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub timer: Timer<Event>,
}
