use crate::model::LiveSample;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Client → Server control messages for the push channel.
///
/// Wire shape: `{"action":"subscribe","names":[...]}` and
/// `{"action":"unsubscribe","names":[...]}`. Best-effort, fire-and-forget:
/// no acknowledgement is awaited.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    Subscribe { names: Vec<String> },
    Unsubscribe { names: Vec<String> },
}

impl ControlMessage {
    pub fn subscribe(names: &HashSet<String>) -> Self {
        Self::Subscribe {
            names: names.iter().cloned().collect(),
        }
    }

    pub fn unsubscribe(names: &HashSet<String>) -> Self {
        Self::Unsubscribe {
            names: names.iter().cloned().collect(),
        }
    }
}

/// Inbound frame rejection reasons
#[derive(Debug, Clone, PartialEq)]
pub enum InboundError {
    /// Malformed JSON
    Decode(String),
    /// Well-formed but semantically invalid (missing/empty name)
    Protocol(String),
}

impl fmt::Display for InboundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundError::Decode(e) => write!(f, "malformed push message: {}", e),
            InboundError::Protocol(e) => write!(f, "invalid push message: {}", e),
        }
    }
}

impl std::error::Error for InboundError {}

/// Decode one inbound text frame into a LiveSample.
///
/// One entity per message; the name field becomes the store key and must
/// be non-empty.
pub fn decode_sample(text: &str) -> Result<LiveSample, InboundError> {
    let sample: LiveSample =
        serde_json::from_str(text).map_err(|e| InboundError::Decode(e.to_string()))?;

    if sample.name.is_empty() {
        return Err(InboundError::Protocol("name is required".to_string()));
    }

    Ok(sample)
}
