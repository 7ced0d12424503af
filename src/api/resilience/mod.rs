//! Authentication resilience for resource-management calls
//!
//! Provides the refresh-and-retry-once policy and the `ResourceManager` decorator that
//! applies it to every operation.

pub mod auth_retry;
pub mod retry;

pub use auth_retry::AuthRetryManager;
pub use retry::{CredentialRefresh, RetryOutcome, run_with_retry};
