//! Integration tests for analytics-athena.
//!
//! Everything runs against the scripted backend; no AWS credentials needed.

mod config;
mod executor;
mod result;
