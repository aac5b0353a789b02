//! Comparing the direct and proxied paths of one target.

pub mod detector;
pub mod summary;

pub use detector::{detect, finding_for, Verdict};
