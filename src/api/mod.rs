//! Azure resource-management API surface
//!
//! Defines the `ResourceManager` capability, the models it operates on, its error type and
//! the authentication resilience layer that decorates any implementation of it.

pub mod error;
pub mod manager;
pub mod models;
pub mod resilience;

pub use error::{ErrorClass, ManagementError};
pub use manager::{ManagementResult, ProgressFn, ResourceManager};
pub use models::*;
pub use resilience::{AuthRetryManager, CredentialRefresh, RetryOutcome, run_with_retry};
