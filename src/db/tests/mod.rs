//! Shared database repository test infrastructure
//!
//! The same test functions run against SQLite (in-memory, on every
//! `cargo test`) and PostgreSQL (testcontainers, `#[ignore]`d).
//!
//! ```bash
//! cargo test                       # SQLite only
//! cargo test -- --ignored          # PostgreSQL (requires Docker)
//! cargo test -- --include-ignored  # Everything
//! ```
