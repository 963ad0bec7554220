//! Tests driving the built `loop-convert` binary

pub mod convert_tests;
