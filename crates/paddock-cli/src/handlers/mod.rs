pub mod aggregate;
pub mod cache;
pub mod calendar;
pub mod compare;
pub mod drivers;
pub mod init;
pub mod session;

use anyhow::{Context, Result};
use paddock_types::{DriverCode, SessionKey};

pub(crate) fn parse_key(raw: &str) -> Result<SessionKey> {
    raw.parse()
        .with_context(|| format!("'{}' is not a session key (try 2024-monaco-race)", raw))
}

pub(crate) fn parse_driver(raw: &str) -> Result<DriverCode> {
    DriverCode::new(raw).with_context(|| format!("'{}' is not a driver code", raw))
}
