//! Integration test suite for bundle-updater
//!
//! End-to-end tests that drive the public API against a local HTTP server
//! (`wiremock`) serving the release feed and assets. Archive extraction,
//! signing identities and process control go through the fakes in
//! `bundle_updater::test_utils`, so the suite runs on any platform.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: full check-and-update cycles (selection, download, install)
//! - **failures**: download, checksum, identity and bundle failures
//! - **single_instance**: registry and guard behaviour
//! - **cli**: command-line smoke tests

mod cli;
mod common;
mod failures;
mod scenarios;
mod single_instance;
