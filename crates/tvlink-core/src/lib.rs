//! # tvlink-core - Core Domain Types
//!
//! Foundation crate for tvlink. Provides domain types, error handling and
//! logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DeviceIdentity`], [`MacAddress`] - Who a session talks to
//! - [`SourceDefinition`], [`AppDefinition`] - Configured inputs and apps
//! - [`DeviceState`], [`PowerState`] - Observed/commanded device state
//! - [`SessionPhase`], [`ConnectionState`] - Session and transport lifecycle
//! - [`ProductIdentity`] - Model/manufacturer/serial read from the device
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use tvlink_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::{
    AppDefinition, ConnectionState, DeviceIdentity, DeviceState, MacAddress, PowerState,
    ProductIdentity, SessionPhase, SourceDefinition, SourceId, DEFAULT_DEVICE_NAME,
};
