//! solgate tenancy: services that route tenant operations and manage the
//! lifetime of tenant stores.
//!
//! - [`TenantRouter`]: store resolution backed by the solution registry
//! - [`SchemaFallbackStore`]: ERP writes that never drop unknown fields
//! - [`SolutionLifecycleManager`]: all-or-nothing provisioning

pub mod config;
pub mod error;
pub mod fallback;
pub mod lifecycle;
pub mod router;

pub use config::TenancyConfig;
pub use error::{DeprovisionError, ProvisionError, WriteError};
pub use fallback::{SchemaFallbackStore, WriteOutcome};
pub use lifecycle::{RecoveryReport, SolutionLifecycleManager};
pub use router::TenantRouter;
