//! Whole-file conversions through the library API

pub mod array_tests;
pub mod scenario_tests;
