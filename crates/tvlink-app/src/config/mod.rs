//! Configuration file parsing for tvlink
//!
//! Supports:
//! - `<config dir>/tvlink/config.toml` - Global `[adb]` settings and `[[accessories]]`

pub mod settings;
pub mod types;

pub use settings::{
    default_config_path, effective_interval, init_config, load_config, validate_accessory,
    validate_all,
};
pub use types::*;
