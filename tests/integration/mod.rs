//! Integration test suite for keepup
//!
//! End-to-end tests against a mock release endpoint (`mockito`), through the
//! library API and through the `keepup` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **update_flow**: Transactions driven through the library
//! - **cli**: The `keepup` binary's output and exit status
//! - **concurrency**: Mutual exclusion between transactions

mod common;

mod cli;
mod concurrency;
mod update_flow;
