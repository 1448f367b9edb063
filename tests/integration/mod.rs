//! Integration tests for project generation, the repository client and build sessions

mod orchestrator;
mod support;
