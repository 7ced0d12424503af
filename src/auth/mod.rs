//! Credentials: token storage, the identity provider, interactive login and the refresher
//! that ties them together for the retry layer.

pub mod aad;
pub mod device_code;
pub mod models;
pub mod refresher;
pub mod store;

pub use aad::{AadIdentityProvider, IdentityError, IdentityProvider};
pub use device_code::{DeviceCode, DeviceCodeLogin, InteractiveLogin, LoginError};
pub use models::TokenInfo;
pub use refresher::{RefreshError, RefreshPath, TokenRefresher};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
