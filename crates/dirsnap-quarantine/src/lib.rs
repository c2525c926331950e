//! Suspicious-name classification and quarantine moves for dirsnap.
//!
//! A file whose name starts with one of a fixed set of keywords, or contains
//! a 32-character hexadecimal run, is considered suspicious. Suspicious files
//! can be renamed into a safe directory; without one they are only reported.

mod classifier;
mod conflict;
mod error;
mod mover;

pub use classifier::{is_suspicious, SuspicionRule, SUSPICIOUS_NAME_PATTERN};
pub use conflict::{numbered_path, resolve_destination, Destination};
pub use error::QuarantineError;
pub use mover::{MoveOutcome, Quarantine};
