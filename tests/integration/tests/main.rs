//! End-to-End Integration Tests
//!
//! These tests drive the service provider core through its public API with
//! an in-process identity provider built from the `test-support` fixtures.

mod common;
mod bindings;
mod conditions;
mod key_rollover;
mod web_sso;
