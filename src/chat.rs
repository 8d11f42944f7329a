//! Sanitized chat values and the event that flows through history and broadcast.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ANONYMOUS: &str = "Anonyme";
pub const SYSTEM_COLOR: &str = "#aaaaaa";

fn escape(raw: &str) -> String {
    html_escape::encode_safe(raw).into_owned()
}

/// A nickname that has been escaped exactly once. Only [`Nickname::sanitize`]
/// and deserialization of stored documents produce one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Trims and escapes; `None` when nothing is left.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(escape(trimmed)))
    }

    pub fn sanitize_or_anonymous(raw: Option<&str>) -> Self {
        raw.and_then(Self::sanitize).unwrap_or_else(Self::anonymous)
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message text escaped exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeText(String);

impl SafeText {
    pub fn sanitize(raw: &str) -> Self {
        Self(escape(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `#rrggbb`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    pub fn system() -> Self {
        Self(SYSTEM_COLOR.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Message,
    Joined,
    Left,
}

/// What gets appended to the history and sent to every client. System
/// notices carry an empty nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    #[serde(default)]
    pub kind: EventKind,
    pub nickname: String,
    #[serde(rename = "message")]
    pub text: String,
    pub color: Color,
}

impl ChatEvent {
    pub fn message(nickname: &Nickname, text: &SafeText, color: Color) -> Self {
        Self {
            kind: EventKind::Message,
            nickname: nickname.as_str().to_owned(),
            text: text.as_str().to_owned(),
            color,
        }
    }

    pub fn joined(nickname: &Nickname) -> Self {
        Self::system(EventKind::Joined, format!("{nickname} a rejoint le chat."))
    }

    pub fn left(nickname: &Nickname) -> Self {
        Self::system(EventKind::Left, format!("{nickname} a quitté le chat."))
    }

    fn system(kind: EventKind, text: String) -> Self {
        Self {
            kind,
            nickname: String::new(),
            text,
            color: Color::system(),
        }
    }
}
