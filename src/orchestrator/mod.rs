//! Child session orchestration.
//!
//! Covers lazy child start and idempotent stop, per-child status tracking,
//! and the guarded, time-bounded dispatch path with output truncation.

pub mod dispatch;
pub mod session_manager;
pub mod status_tracker;
pub mod truncate;
