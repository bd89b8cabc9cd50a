mod common;

use chopin_accounts::prelude::*;
use common::{alice, bob, memory_service, sqlite_backend, sqlite_service};

async fn check_reset_scenario(service: &UserService) {
    let account = bob();
    service.save(&account).await.unwrap();

    let t2 = service.create_password_reset(&account).await.unwrap();

    let fetched = service.fetch_for_password_reset("bob", &t2).await.unwrap();
    assert_eq!(fetched.map(|a| a.id), Some(account.id.clone()));

    // Fetching does not disable the token.
    assert!(
        service
            .fetch_for_password_reset("bob", &t2)
            .await
            .unwrap()
            .is_some()
    );

    assert!(service.disable_reset_code("bob", &t2).await.unwrap());
    assert!(
        service
            .fetch_for_password_reset("bob", &t2)
            .await
            .unwrap()
            .is_none()
    );
}

async fn check_reset_token_is_scoped_to_username(service: &UserService) {
    service.save(&alice()).await.unwrap();
    service.save(&bob()).await.unwrap();
    let token = service.create_password_reset(&bob()).await.unwrap();

    assert!(
        service
            .fetch_for_password_reset("alice", &token)
            .await
            .unwrap()
            .is_none()
    );

    // Disabling under the wrong username leaves the token active.
    assert!(!service.disable_reset_code("alice", &token).await.unwrap());
    assert!(
        service
            .fetch_for_password_reset("bob", &token)
            .await
            .unwrap()
            .is_some()
    );
}

async fn check_disable_is_a_noop_for_unknown_pairs(service: &UserService) {
    let disabled = service
        .disable_reset_code("ghost", "no-such-token")
        .await
        .expect("unknown pair is not an error");
    assert!(!disabled);

    service.save(&bob()).await.unwrap();
    let token = service.create_password_reset(&bob()).await.unwrap();
    assert!(service.disable_reset_code("bob", &token).await.unwrap());
    let again = service
        .disable_reset_code("bob", &token)
        .await
        .expect("already disabled is not an error");
    assert!(!again, "only the first disable reports a transition");
}

async fn check_purge_keeps_redeemable_tokens(service: &UserService) {
    service.save(&bob()).await.unwrap();

    let consumed = service.create_activation(&bob()).await.unwrap();
    assert!(service.activate(&consumed).await.unwrap());
    let pending = service.create_activation(&bob()).await.unwrap();
    let disabled = service.create_password_reset(&bob()).await.unwrap();
    assert!(service.disable_reset_code("bob", &disabled).await.unwrap());
    let active = service.create_password_reset(&bob()).await.unwrap();

    assert_eq!(service.purge_spent_tokens().await.unwrap(), 2);
    assert_eq!(service.purge_spent_tokens().await.unwrap(), 0);

    assert!(
        service
            .fetch_for_password_reset("bob", &active)
            .await
            .unwrap()
            .is_some()
    );
    assert!(!service.activate(&consumed).await.unwrap());
    assert!(service.activate(&pending).await.unwrap());
}

async fn check_reset_returns_current_account_state(service: &UserService) {
    let mut account = bob();
    service.save(&account).await.unwrap();
    let token = service.create_password_reset(&account).await.unwrap();

    account.display_name = "Robert".to_string();
    service.save(&account).await.unwrap();

    let fetched = service
        .fetch_for_password_reset("bob", &token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.display_name, "Robert");
}

async fn check_reset_tokens_do_not_activate(service: &UserService) {
    service.save(&bob()).await.unwrap();
    let token = service.create_password_reset(&bob()).await.unwrap();
    assert!(!service.activate(&token).await.unwrap());

    let activation = service.create_activation(&bob()).await.unwrap();
    assert!(
        service
            .fetch_for_password_reset("bob", &activation)
            .await
            .unwrap()
            .is_none()
    );
}

async fn check_expired_token_is_absent(service: &UserService) {
    service.save(&bob()).await.unwrap();
    let token = service.create_password_reset(&bob()).await.unwrap();
    assert!(
        service
            .fetch_for_password_reset("bob", &token)
            .await
            .unwrap()
            .is_none()
    );
}

macro_rules! both_backends {
    ($($check:ident => $mem:ident, $sql:ident;)*) => {
        $(
            #[tokio::test]
            async fn $mem() {
                let service = memory_service();
                $check(&service).await;
            }

            #[tokio::test]
            async fn $sql() {
                let (service, _db) = sqlite_service().await;
                $check(&service).await;
            }
        )*
    };
}

both_backends! {
    check_reset_scenario => test_memory_reset_scenario, test_sqlite_reset_scenario;
    check_reset_token_is_scoped_to_username => test_memory_reset_scoped, test_sqlite_reset_scoped;
    check_disable_is_a_noop_for_unknown_pairs => test_memory_disable_noop, test_sqlite_disable_noop;
    check_reset_returns_current_account_state => test_memory_reset_current_state, test_sqlite_reset_current_state;
    check_reset_tokens_do_not_activate => test_memory_token_classes_separate, test_sqlite_token_classes_separate;
    check_purge_keeps_redeemable_tokens => test_memory_purge_keeps_redeemable, test_sqlite_purge_keeps_redeemable;
}

#[tokio::test]
async fn test_memory_expired_token_is_absent() {
    let service = UserService::with_backend(InMemoryUserBackend::with_ttls(
        chrono::Duration::hours(24),
        chrono::Duration::zero(),
    ));
    check_expired_token_is_absent(&service).await;
}

#[tokio::test]
async fn test_sqlite_expired_token_is_absent() {
    let (backend, _db) =
        sqlite_backend(chrono::Duration::hours(24), chrono::Duration::zero()).await;
    check_expired_token_is_absent(&UserService::with_backend(backend)).await;
}

async fn check_purge_drops_expired_resets(service: &UserService) {
    service.save(&bob()).await.unwrap();
    service.create_password_reset(&bob()).await.unwrap();
    assert_eq!(service.purge_spent_tokens().await.unwrap(), 1);
}

#[tokio::test]
async fn test_memory_purge_drops_expired_resets() {
    let service = UserService::with_backend(InMemoryUserBackend::with_ttls(
        chrono::Duration::hours(24),
        chrono::Duration::zero(),
    ));
    check_purge_drops_expired_resets(&service).await;
}

#[tokio::test]
async fn test_sqlite_purge_drops_expired_resets() {
    let (backend, _db) =
        sqlite_backend(chrono::Duration::hours(24), chrono::Duration::zero()).await;
    check_purge_drops_expired_resets(&UserService::with_backend(backend)).await;
}
