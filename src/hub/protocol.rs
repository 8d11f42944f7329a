//! The only place that looks at client payload shapes.
//!
//! Client frames are JSON envelopes `{"event": "join" | "message", "data": ...}`.
//! Field names differ between clients (`nickname`/`user`, `text`/`message`),
//! payloads may be bare strings, and some frames are not JSON at all. All of
//! it is folded into [`ClientEvent`] with total defaults: a missing nickname
//! stays `None` for the hub to resolve, missing text becomes empty.

use serde::Serialize;
use serde_json::{Value, json};

use crate::chat::{ChatEvent, Color};

const NICKNAME_FIELDS: &[&str] = &["nickname", "user"];
const TEXT_FIELDS: &[&str] = &["text", "message"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Join { nickname: Option<String> },
    Message { nickname: Option<String>, text: String },
    Unknown(String),
}

pub trait GetField {
    /// First of `names` holding a non-empty scalar, as a string.
    fn get_str_field(&self, names: &[&str]) -> Option<String>;
}

impl GetField for Value {
    fn get_str_field(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| scalar_text(self.get(*name)?))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ClientEvent {
    pub fn parse(frame: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(frame) else {
            return Self::Message {
                nickname: None,
                text: frame.to_owned(),
            };
        };

        match value.get("event").and_then(Value::as_str) {
            Some("join") => Self::join(value.get("data").unwrap_or(&Value::Null)),
            Some("message") => Self::message(value.get("data").unwrap_or(&Value::Null)),
            Some(other) => Self::Unknown(other.to_owned()),
            // no envelope, the frame itself is the message payload
            None => Self::message(&value),
        }
    }

    fn join(data: &Value) -> Self {
        let nickname = match data {
            Value::Object(_) => data.get_str_field(&["nickname"]),
            other => scalar_text(other),
        };
        Self::Join { nickname }
    }

    fn message(data: &Value) -> Self {
        match data {
            Value::Object(_) => Self::Message {
                nickname: data.get_str_field(NICKNAME_FIELDS),
                text: data.get_str_field(TEXT_FIELDS).unwrap_or_default(),
            },
            other => Self::Message {
                nickname: None,
                text: scalar_text(other).unwrap_or_default(),
            },
        }
    }
}

/// `{nickname, message, color}` as clients see it.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub nickname: &'a str,
    pub message: &'a str,
    pub color: &'a Color,
}

impl<'a> From<&'a ChatEvent> for WireMessage<'a> {
    fn from(event: &'a ChatEvent) -> Self {
        Self {
            nickname: &event.nickname,
            message: &event.text,
            color: &event.color,
        }
    }
}

pub fn wire_messages(events: &[ChatEvent]) -> Vec<WireMessage<'_>> {
    events.iter().map(WireMessage::from).collect()
}

pub fn message_frame(event: &ChatEvent) -> String {
    json!({ "event": "message", "data": WireMessage::from(event) }).to_string()
}

pub fn history_frame(events: &[ChatEvent]) -> String {
    json!({ "event": "history", "data": { "messages": wire_messages(events) } }).to_string()
}
