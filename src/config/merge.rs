//! Layer ordering for configuration sources.

pub mod merge_policy;
