pub mod event;
pub mod log;

pub use event::{now_rfc3339_utc, Actor, AuditEvent, ZERO_HASH_64};
pub use log::AuditLog;
