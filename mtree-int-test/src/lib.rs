//! Shared fixtures for the M-Tree integration tests.

pub mod test_util;
