//! # Dashboard Test Suite
//!
//! End-to-end checks that drive the public library API the way the binary
//! does: config, waste module, renderer, sink and the supervised loops.

mod dashboard_tests;
