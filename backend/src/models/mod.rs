//! Data models shared across database access and API handlers.

pub mod attendance;
pub mod attendance_session;
pub mod subject;
pub mod user;
