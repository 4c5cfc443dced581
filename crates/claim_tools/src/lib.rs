//! # Claim Development Tools
//!
//! Command-line tools for development:
//! - Building catalog validation
//! - Replaying recorded fix files through a capture

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod trace;
pub mod validate;
