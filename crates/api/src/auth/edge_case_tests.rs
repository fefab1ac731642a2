//! Edge case tests for the authentication gateway
//!
//! Covers:
//! - Lockout threshold boundaries and reset on success
//! - Lockout short-circuiting password verification
//! - Username enumeration resistance
//! - Password change ownership and validation rules
//! - Identity provisioning

#[cfg(test)]
mod login_tests {
    use super::super::gateway::{ACCOUNT_LOCKED, INVALID_CREDENTIALS};
    use super::super::test_support::TestAuth;
    use crate::error::ApiError;
    use crate::metrics::MetricsSnapshot;

    #[tokio::test]
    async fn test_login_returns_valid_token() {
        let auth = TestAuth::new(3);
        let identity = auth.seed("alice", "s3cret", true).await;

        let outcome = auth.gateway.login("alice", "s3cret").await.unwrap();

        assert_eq!(outcome.username, "alice");
        assert!(auth.codec.validate(&outcome.token));
        assert_eq!(auth.codec.username_of(&outcome.token).unwrap(), "alice");
        assert_eq!(auth.codec.subject_id_of(&outcome.token).unwrap(), identity.id);
    }

    #[tokio::test]
    async fn test_wrong_password_counts_exactly_once() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;

        let err = auth.gateway.login("alice", "nope").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(INVALID_CREDENTIALS)));
        assert_eq!(auth.attempts.failure_count("alice"), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_looks_like_wrong_password() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;

        let unknown = auth.gateway.login("mallory", "s3cret").await.unwrap_err();
        let wrong = auth.gateway.login("alice", "wrong").await.unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), wrong.status());
        // Both paths pay for one verification
        assert_eq!(auth.hasher.verifications(), 2);
        assert_eq!(auth.attempts.failure_count("mallory"), 1);
    }

    #[tokio::test]
    async fn test_three_failures_then_locked_even_with_correct_password() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;

        for attempt in 1..=3 {
            let err = auth.gateway.login("alice", "wrong").await.unwrap_err();
            assert!(
                matches!(err, ApiError::Unauthorized(INVALID_CREDENTIALS)),
                "attempt {attempt} should be a bad-credential rejection"
            );
        }

        let err = auth.gateway.login("alice", "s3cret").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ACCOUNT_LOCKED)));
    }

    #[tokio::test]
    async fn test_locked_login_skips_password_verification() {
        let auth = TestAuth::new(2);
        auth.seed("alice", "s3cret", true).await;
        auth.attempts.record_failure("alice");
        auth.attempts.record_failure("alice");

        let before = auth.hasher.verifications();
        let err = auth.gateway.login("alice", "s3cret").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(ACCOUNT_LOCKED)));
        assert_eq!(auth.hasher.verifications(), before);
        assert_eq!(auth.attempts.failure_count("alice"), 2);
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;
        auth.gateway.login("alice", "wrong").await.unwrap_err();
        auth.gateway.login("alice", "wrong").await.unwrap_err();

        auth.gateway.login("alice", "s3cret").await.unwrap();

        assert_eq!(auth.attempts.failure_count("alice"), 0);
    }

    #[tokio::test]
    async fn test_inactive_identity_rejected_without_counting() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", false).await;

        let err = auth.gateway.login("alice", "s3cret").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(INVALID_CREDENTIALS)));
        assert_eq!(auth.attempts.failure_count("alice"), 0);
    }

    #[tokio::test]
    async fn test_metrics_record_each_outcome_once() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;

        auth.gateway.login("alice", "s3cret").await.unwrap();
        auth.gateway.login("alice", "wrong").await.unwrap_err();
        auth.gateway.login("ghost", "wrong").await.unwrap_err();

        assert_eq!(
            auth.metrics.snapshot(),
            MetricsSnapshot {
                login_success: 1,
                login_failure: 2
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_failures_all_counted() {
        let auth = std::sync::Arc::new(TestAuth::new(1_000));
        auth.seed("alice", "s3cret", true).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let auth = auth.clone();
            handles.push(tokio::spawn(async move {
                auth.gateway.login("alice", "wrong").await.unwrap_err();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(auth.attempts.failure_count("alice"), 20);
    }
}

#[cfg(test)]
mod logout_tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::super::test_support::TestAuth;
    use super::super::TokenCodec;

    #[tokio::test]
    async fn test_logout_blacklists_token() {
        let auth = TestAuth::new(3);
        auth.seed("alice", "s3cret", true).await;
        let outcome = auth.gateway.login("alice", "s3cret").await.unwrap();

        auth.gateway.logout(Some(&outcome.token));

        assert!(auth.blacklist.is_blacklisted(Some(&outcome.token)));
    }

    #[tokio::test]
    async fn test_logout_without_token_is_noop() {
        let auth = TestAuth::new(3);
        auth.gateway.logout(None);
        auth.gateway.logout(Some(""));
        assert!(auth.blacklist.is_empty());
    }

    #[tokio::test]
    async fn test_logout_ignores_unsigned_strings() {
        let auth = TestAuth::new(3);
        auth.gateway.logout(Some("not-a-jwt"));
        auth.gateway.logout(Some("invalid.token.here"));
        assert!(auth.blacklist.is_empty());
    }

    #[tokio::test]
    async fn test_logout_ignores_tokens_signed_elsewhere() {
        let auth = TestAuth::new(3);
        let forger = TokenCodec::new("another-secret-another-secret-12", Duration::from_secs(60));
        let forged = forger.issue(1, "alice", OffsetDateTime::now_utc()).unwrap();

        auth.gateway.logout(Some(&forged.token));
        assert!(auth.blacklist.is_empty());
    }
}

#[cfg(test)]
mod password_change_tests {
    use super::super::test_support::TestAuth;
    use super::super::AuthContext;
    use crate::error::ApiError;

    fn acting(identity_id: i64, username: &str) -> AuthContext {
        AuthContext {
            identity_id,
            username: username.to_string(),
            token: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_change_password_rotates_hash() {
        let auth = TestAuth::new(3);
        let alice = auth.seed("alice", "old-pass", true).await;

        auth.gateway
            .change_password(&acting(alice.id, "alice"), "alice", "old-pass", "new-pass")
            .await
            .unwrap();

        assert_eq!(auth.stored("alice").await.password_hash, "plain:new-pass");
        auth.gateway.login("alice", "new-pass").await.unwrap();
        assert!(auth.gateway.login("alice", "old-pass").await.is_err());
    }

    #[tokio::test]
    async fn test_other_identity_forbidden_regardless_of_password() {
        let auth = TestAuth::new(3);
        let alice = auth.seed("alice", "a-pass", true).await;
        auth.seed("bob", "b-pass", true).await;

        for old in ["b-pass", "wrong"] {
            let err = auth
                .gateway
                .change_password(&acting(alice.id, "alice"), "bob", old, "new-pass")
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Forbidden));
        }
        assert_eq!(auth.stored("bob").await.password_hash, "plain:b-pass");
    }

    #[tokio::test]
    async fn test_wrong_old_password_unauthorized() {
        let auth = TestAuth::new(3);
        let alice = auth.seed("alice", "old-pass", true).await;

        let err = auth
            .gateway
            .change_password(&acting(alice.id, "alice"), "alice", "guess", "new-pass")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_missing_target_unauthorized() {
        let auth = TestAuth::new(3);

        let err = auth
            .gateway
            .change_password(&acting(9, "ghost"), "ghost", "x", "y")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_same_new_password_invalid_argument() {
        let auth = TestAuth::new(3);
        let alice = auth.seed("alice", "old-pass", true).await;

        let err = auth
            .gateway
            .change_password(&acting(alice.id, "alice"), "alice", "old-pass", "old-pass")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }
}

#[cfg(test)]
mod provisioning_tests {
    use super::super::credentials::PASSWORD_LENGTH;
    use super::super::test_support::TestAuth;
    use crate::error::ApiError;
    use crate::store::IdentityKind;

    #[tokio::test]
    async fn test_provision_returns_plaintext_once_and_stores_hash() {
        let auth = TestAuth::new(3);

        let (identity, password) = auth
            .gateway
            .provision_identity("John", "Doe", IdentityKind::Trainer)
            .await
            .unwrap();

        assert_eq!(identity.username, "John.Doe");
        assert!(identity.is_active);
        assert_eq!(identity.kind, IdentityKind::Trainer);
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert_ne!(identity.password_hash, password);

        let outcome = auth.gateway.login("John.Doe", &password).await.unwrap();
        assert_eq!(outcome.username, "John.Doe");
    }

    #[tokio::test]
    async fn test_provision_picks_next_free_username() {
        let auth = TestAuth::new(3);
        auth.seed("John.Doe", "x", true).await;
        auth.seed("John.Doe1", "x", true).await;

        let (identity, _) = auth
            .gateway
            .provision_identity("John", "Doe", IdentityKind::Trainee)
            .await
            .unwrap();

        assert_eq!(identity.username, "John.Doe2");
    }

    #[tokio::test]
    async fn test_provision_requires_names() {
        let auth = TestAuth::new(3);
        let err = auth
            .gateway
            .provision_identity("  ", "Doe", IdentityKind::Trainee)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
