//! Common test utilities and fixtures for loop-convert integration tests
//!
//! - `TestRepo` builder for temp directories of C++ sources
//! - Assertions over rewritten sources and report output

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod test_repo;

pub use assertions::*;
pub use test_repo::TestRepo;
