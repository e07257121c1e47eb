//! Lobby chat
//!
//! Chat text is trimmed and HTML-escaped before it is stored or relayed, so
//! clients can render it verbatim.

use serde::Serialize;
use thiserror::Error;
use web_time::SystemTime;

/// Errors that can occur when posting a chat message
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The message is empty or contains only whitespace
    #[error("message cannot be empty")]
    Empty,
    /// The message exceeds the maximum allowed length
    #[error("message is too long")]
    TooLong,
}

/// One message in a lobby's chat log
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Display name of the author
    pub from: String,
    /// Trimmed, HTML-escaped text
    pub text: String,
    /// When the server accepted the message
    #[serde(rename = "ts")]
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl ChatMessage {
    /// Builds a chat message from raw client text
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - Text exceeds the chat length limit
    /// * `Error::Empty` - Text is empty after trimming whitespace
    pub fn new(from: &str, text: &str) -> Result<Self, Error> {
        if text.len() > crate::constants::chat::MAX_LENGTH {
            return Err(Error::TooLong);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Empty);
        }

        Ok(Self {
            from: from.to_owned(),
            text: escape_html(text),
            timestamp: SystemTime::now(),
        })
    }
}

/// Escapes the characters that are significant in HTML text and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
