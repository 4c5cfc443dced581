//! # Claim Test Utilities
//!
//! Shared testing utilities for all crates:
//! - GPS walk builders in a local metric frame
//! - Sample building catalog
//! - Manually driven clock
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
