//! tvlink Library
//!
//! Headless bridge between Android TVs reachable over ADB and a smart-home
//! accessory layer.

pub mod headless;

// Re-export main entry points
pub use headless::intent::{parse_intent_line, Intent, IntentLine};
pub use headless::runner::{apply_intent, print_status, run_headless, serve_intents};
pub use headless::HeadlessEvent;
