//! apkforge: Android project generation and remote builds
//!
//! Turns an [`model::AppModel`] into a complete Android project ([`generator`]), pushes it to a
//! GitHub repository and drives the Actions build that compiles it ([`repository`], [`build`]).

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod model;
pub mod repository;
