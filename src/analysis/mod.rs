//! Loop analysis pipeline
//!
//! For each matched candidate:
//!
//! ```text
//! classify (usage) -> check (checker) -> resolve_name (naming) -> emit
//! ```
//!
//! Every stage is a pure function of the translation unit plus the per-file
//! [`GeneratedNames`] ledger threaded through by the driver.

pub mod checker;
pub mod emit;
pub mod naming;
pub mod profile;
pub mod usage;

pub use checker::{check, Conversion, RejectReason};
pub use emit::{emit, DEFAULT_ELEMENT_TYPE};
pub use naming::{resolve_name, GeneratedNames, NameScope};
pub use profile::ExprProfile;
pub use usage::{classify, ClassificationResult, ContainerReference, UsageSite};
