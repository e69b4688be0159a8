#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use shared::capabilities::{
    HttpOperation, HttpRequest, HttpResponse, KeyValueOperation, KeyValueResponse,
    KeyValueResult, TimerOperation, Value,
};
use shared::{App, Effect, Event, Model};

pub type Tester = AppTester<App, Effect>;

#[derive(Default)]
pub struct Effects {
    pub http: Vec<Request<HttpOperation>>,
    pub kv: Vec<Request<KeyValueOperation>>,
    pub timers: Vec<Request<TimerOperation>>,
    pub renders: usize,
}

impl Effects {
    pub fn absorb(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Http(request) => self.http.push(request),
                Effect::KeyValue(request) => self.kv.push(request),
                Effect::Timer(request) => self.timers.push(request),
                Effect::Render(_) => self.renders += 1,
            }
        }
    }

    pub fn kv_writes(&self) -> Vec<(String, Vec<u8>)> {
        self.kv
            .iter()
            .filter_map(|r| match &r.operation {
                KeyValueOperation::Set { key, value } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn timer_starts(&self) -> Vec<(u64, u64)> {
        self.timers
            .iter()
            .filter_map(|r| match r.operation {
                TimerOperation::Start { id, millis } => Some((id, millis)),
                TimerOperation::Cancel { .. } => None,
            })
            .collect()
    }
}

/// Sends an event and, recursively, every event produced by it.
pub fn send(app: &Tester, event: Event, model: &mut Model) -> Effects {
    let mut effects = Effects::default();
    let update = app.update(event, model);
    effects.absorb(update.effects);
    for event in update.events {
        let nested = send(app, event, model);
        effects.merge(nested);
    }
    effects
}

impl Effects {
    fn merge(&mut self, other: Effects) {
        self.http.extend(other.http);
        self.kv.extend(other.kv);
        self.timers.extend(other.timers);
        self.renders += other.renders;
    }
}

/// Resolves a request and feeds the resulting events back into the app.
pub fn resolve<Op>(
    app: &Tester,
    request: &mut Request<Op>,
    output: Op::Output,
    model: &mut Model,
) -> Effects
where
    Op: crux_core::capability::Operation,
{
    let update = app.resolve(request, output).expect("request should resolve");
    let mut effects = Effects::default();
    effects.absorb(update.effects);
    for event in update.events {
        effects.merge(send(app, event, model));
    }
    effects
}

pub fn http_request(request: &Request<HttpOperation>) -> &HttpRequest {
    match &request.operation {
        HttpOperation::Execute(request) => request,
    }
}

pub fn ok(body: serde_json::Value) -> shared::capabilities::HttpResult {
    Ok(HttpResponse::ok_json(&body))
}

/// What the shell answers to a read: `None` when nothing is stored.
pub fn stored(bytes: Option<Vec<u8>>) -> KeyValueResult {
    let value = match bytes {
        Some(bytes) => Value::Bytes(bytes),
        None => Value::None,
    };
    KeyValueResult::Ok {
        response: KeyValueResponse::Get { value },
    }
}

pub fn single_result(label: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "emails": [{ "classificacao": label, "email_limpo": text, "palavras_chave": ["urgent"] }],
        "total": 1
    })
}

/// Types `text`, submits it and answers with `response`.
pub fn classify_text(
    app: &Tester,
    model: &mut Model,
    text: &str,
    response: serde_json::Value,
) -> Effects {
    send(app, Event::TextChanged(text.to_string()), model);
    let mut effects = send(app, Event::ClassifyRequested, model);
    let mut request = effects.http.pop().expect("classification request");
    resolve(app, &mut request, ok(response), model)
}
