mod common;

use chopin_accounts::prelude::*;
use common::{alice, memory_service};
use std::sync::Arc;

fn assert_not_configured<T: std::fmt::Debug>(result: Result<T, AccountError>) {
    match result {
        Err(AccountError::NotConfigured) => {}
        other => panic!("expected NotConfigured, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unbound_service_fails_every_operation() {
    let service = UserService::new();
    let account = alice();
    assert!(!service.is_bound());

    assert_not_configured(service.find(&account.id).await);
    assert_not_configured(service.find_by_email("alice@example.com").await);
    assert_not_configured(service.save(&account).await);
    assert_not_configured(service.create_activation(&account).await);
    assert_not_configured(service.activate("token").await);
    assert_not_configured(service.create_password_reset(&account).await);
    assert_not_configured(service.fetch_for_password_reset("alice", "token").await);
    assert_not_configured(service.disable_reset_code("alice", "token").await);
    assert_not_configured(service.delete_pending_activations().await);
    assert_not_configured(service.purge_spent_tokens().await);
}

#[tokio::test]
async fn test_not_configured_is_a_configuration_error() {
    let err = UserService::new().activate("t").await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.error_code(), "NOT_CONFIGURED");
}

#[tokio::test]
async fn test_bind_once_then_use() {
    let service = UserService::new();
    service.bind(InMemoryUserBackend::new()).unwrap();
    assert!(service.is_bound());

    service.save(&alice()).await.unwrap();
    assert!(service.find(&alice().id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_second_bind_is_rejected_and_keeps_first_backend() {
    let service = memory_service();
    service.save(&alice()).await.unwrap();

    let err = service.bind(InMemoryUserBackend::new()).unwrap_err();
    assert!(matches!(err, AccountError::AlreadyConfigured));

    // Still talking to the original backend.
    assert!(service.find(&alice().id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clones_share_the_binding() {
    let service = UserService::new();
    let handle = service.clone();

    service.bind(InMemoryUserBackend::new()).unwrap();
    assert!(handle.is_bound());

    handle.save(&alice()).await.unwrap();
    assert!(service.find(&alice().id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_bind_shared_backend() {
    let backend = Arc::new(InMemoryUserBackend::new());
    let service = UserService::new();
    service.bind_arc(backend.clone()).unwrap();

    service.save(&alice()).await.unwrap();
    assert_eq!(backend.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_binds_exactly_one_wins() {
    let service = UserService::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.bind(InMemoryUserBackend::new()).is_ok() })
        })
        .collect();

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}
