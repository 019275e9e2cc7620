//! Catalog E2E test suite.
//!
//! Drives the HTTP API end-to-end against a throwaway SQLite database and
//! upload directory per test.
//!
//! Run with: cargo test --test catalog_e2e

mod test_helpers;

mod test_images;
