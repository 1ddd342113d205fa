//! Intents read from stdin in headless mode

use serde::Deserialize;
use serde_json::Value;

use tvlink_core::prelude::*;
use tvlink_core::SourceId;

/// What the accessory layer asks for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Power { on: bool },
    Source { id: SourceId },
    /// Reconcile now and emit a status event
    Status,
    Quit,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Power { .. } => "power",
            Intent::Source { .. } => "source",
            Intent::Status => "status",
            Intent::Quit => "quit",
        }
    }
}

/// An intent plus the device it is addressed to (name or address)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLine {
    pub device: Option<String>,
    pub intent: Intent,
}

/// Parse one stdin line
///
/// Blank lines yield `None`. `q` and `quit` are accepted as shorthand.
pub fn parse_intent_line(line: &str) -> Result<Option<IntentLine>> {
    let trimmed = line.trim();
    match trimmed {
        "" => return Ok(None),
        "q" | "quit" => {
            return Ok(Some(IntentLine {
                device: None,
                intent: Intent::Quit,
            }))
        }
        _ => {}
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let device = value
        .get("device")
        .and_then(Value::as_str)
        .map(str::to_string);
    let intent: Intent = serde_json::from_value(value)?;

    Ok(Some(IntentLine { device, intent }))
}
