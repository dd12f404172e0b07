//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod audit_log;
pub mod scheduled_upload;
pub mod user;
pub mod warning;

pub use audit_log::*;
pub use scheduled_upload::*;
pub use user::*;
pub use warning::*;
