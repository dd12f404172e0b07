//! Utility functions

pub mod crypto;
pub mod time;
pub mod validation;

pub use crypto::sha256_hex;
pub use time::{format_time_remaining, parse_datetime, Clock, ManualClock, SystemClock};
pub use validation::{attachment_file_name, validate_file_path, validate_role};
