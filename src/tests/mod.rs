//! Consolidated test modules.
//!
//! End-to-end tests that drive the full router against an in-memory store.
