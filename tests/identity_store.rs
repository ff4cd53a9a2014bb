mod common;

use betting_ledger::crypto::SecretKey;
use betting_ledger::{Conflict, Entity, Identity, LedgerError, Profile};
use common::{harness, harness_with, Backend, CollidingIndex, BACKENDS};
use std::sync::Arc;

#[tokio::test]
async fn colliding_index_hit_is_rejected_by_verification() {
    for backend in BACKENDS {
        let crypto = Arc::new(CollidingIndex::new(&SecretKey::generate()));
        let h = harness_with(backend, crypto).await;

        let owner = h
            .ctx
            .users
            .create_user(&Identity::new("discord", "real-owner"))
            .await
            .unwrap();

        // Same index value, different plaintext: must not resolve to the owner.
        let err = h
            .ctx
            .users
            .get_user_by_external_id(&Identity::new("discord", "impostor"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::NotFound(Entity::User)),
            "{:?}: {:?}",
            backend,
            err
        );

        let found = h
            .ctx
            .users
            .get_user_by_external_id(&Identity::new("discord", "real-owner"))
            .await
            .unwrap();
        assert_eq!(found.id(), owner.id());

        // The colliding identity cannot be stored beside the first one either.
        let err = h
            .ctx
            .users
            .create_user(&Identity::new("discord", "impostor"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(Conflict::IdentityClaimed)));
        assert_eq!(h.ctx.users.count_users().await.unwrap(), 1);
    }
}

#[tokio::test]
async fn stored_rows_hold_no_plaintext() {
    let h = harness(Backend::Sqlite).await;
    let pool = h.pool.as_ref().unwrap();
    h.ctx
        .users
        .create_user_with_profile(
            &Identity::new("discord", "81234"),
            Profile::new("ana", "Ana Example"),
        )
        .await
        .unwrap();

    let (username, display_name): (String, String) = sqlx::query_as(
        "SELECT username_ciphertext, display_name_ciphertext FROM users",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_ne!(username, "ana");
    assert_ne!(display_name, "Ana Example");

    let (ciphertext, hash): (String, String) = sqlx::query_as(
        "SELECT external_id_ciphertext, external_id_hash FROM user_identities",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert!(!ciphertext.contains("81234"));
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn tampered_profile_ciphertext_fails_the_read() {
    let h = harness(Backend::Sqlite).await;
    let pool = h.pool.as_ref().unwrap();
    let identity = Identity::new("discord", "81234");
    let user = h
        .ctx
        .users
        .create_user_with_profile(&identity, Profile::new("ana", "Ana"))
        .await
        .unwrap();

    let token: String = sqlx::query_scalar("SELECT display_name_ciphertext FROM users")
        .fetch_one(pool)
        .await
        .unwrap();
    // Flip one base64 character well inside the ciphertext body.
    let mut chars: Vec<char> = token.chars().collect();
    let at = chars.len() / 2;
    chars[at] = if chars[at] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();
    sqlx::query("UPDATE users SET display_name_ciphertext = ? WHERE id = ?")
        .bind(&tampered)
        .bind(user.id())
        .execute(pool)
        .await
        .unwrap();

    assert!(matches!(
        h.ctx.users.get_user(user.id()).await,
        Err(LedgerError::Crypto(_))
    ));
    assert!(matches!(
        h.ctx.users.get_user_by_external_id(&identity).await,
        Err(LedgerError::Crypto(_))
    ));
}

#[tokio::test]
async fn another_key_cannot_read_existing_users() {
    let h = harness(Backend::Sqlite).await;
    let pool = h.pool.clone().unwrap();
    let identity = Identity::new("discord", "81234");
    let user = h.ctx.users.create_user(&identity).await.unwrap();

    let stranger = betting_ledger::AppContext::with_pool(
        pool,
        Arc::new(betting_ledger::CipherService::new(&SecretKey::generate())),
    );
    // A different key gives a different index, so the lookup misses entirely.
    assert!(stranger
        .users
        .get_user_by_external_id(&identity)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        stranger.users.get_user(user.id()).await,
        Err(LedgerError::Crypto(_))
    ));
}
