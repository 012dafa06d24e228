//! solgate core: tenant-scoped credential and routing primitives.
//!
//! This crate holds everything that needs no I/O:
//! - domain models and the shared error type
//! - repository and collaborator traits implemented by other crates
//! - the solution registry (name validation, store-id derivation)
//! - the request context carrier and operation classification
//! - the database router and its isolation rule

pub mod audit;
pub mod clock;
pub mod context;
pub mod error;
pub mod models;
pub mod registry;
pub mod repository;
pub mod router;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{OperationClass, OperationDescriptor, RequestContext};
pub use error::{ErrorClass, SolgateError, SolgateResult};
pub use registry::{SYSTEM_STORE_ID, SolutionName, StoreId, StoreIds};
