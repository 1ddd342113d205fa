//! Per-device session state and its actor task

mod handle;
#[allow(clippy::module_inception)]
mod session;


pub use handle::{spawn_session, SessionHandle};
pub use session::{DeviceSession, SessionSnapshot};
