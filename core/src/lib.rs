//! Interview Room Core Library
//!
//! This crate provides the live session core for the Interview Room client:
//! the session phase controller, the realtime transport adapter and the
//! transcript and coaching suggestion aggregator, plus the backend client
//! and telemetry they rely on.

pub mod backend;
pub mod config;
pub mod interview;
pub mod telemetry;
pub mod transport;

mod dirs_compat;

pub use config::{ClientConfig, SessionConfig};
pub use interview::{SessionController, SessionError, SessionEvent, SessionPhase};
