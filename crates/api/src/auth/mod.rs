//! Authentication module for GymCRM

pub mod attempts;
pub mod blacklist;
pub mod context;
pub mod credentials;
#[cfg(test)]
mod edge_case_tests;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod password;
#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

/// Longest lockout, blacklist retention or token lifetime honoured; longer
/// settings are clamped to this.
pub const MAX_TIME_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub use attempts::LoginAttemptTracker;
pub use blacklist::TokenBlacklist;
pub use context::{assert_acting_as, AuthContext};
pub use credentials::{random_password, unique_username};
pub use gateway::{AuthenticationGateway, LoginOutcome, LoginRejection};
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError};
pub use middleware::{authenticate, bearer_token, RequestAuthenticator};
pub use password::{Argon2Hasher, PasswordError, PasswordHasher};
