//! End-to-end integration tests for AppRoute
//!
//! These tests exercise the file store against a real filesystem and real
//! OS change notifications. See the `tests/` directory.
