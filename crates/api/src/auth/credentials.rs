//! Username and initial password generation for new identities

use rand::{distr::Alphanumeric, Rng};

use crate::store::{IdentityStore, StoreResult};

pub const PASSWORD_LENGTH: usize = 10;

/// `first.last`, then `first.last1`, `first.last2`, ... until unused.
///
/// Best effort only: two concurrent registrations can pick the same candidate,
/// in which case the store's uniqueness constraint rejects the second insert.
pub async fn unique_username(
    store: &dyn IdentityStore,
    first_name: &str,
    last_name: &str,
) -> StoreResult<String> {
    let base = format!("{first_name}.{last_name}");
    if !store.exists_by_username(&base).await? {
        return Ok(base);
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}{suffix}");
        if !store.exists_by_username(&candidate).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// Ten alphanumeric characters from the thread-local CSPRNG.
pub fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}
