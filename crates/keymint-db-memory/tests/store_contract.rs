//! Persistence contract checks for the in-memory backend.

use std::sync::Arc;

use futures_util::TryStreamExt;
use keymint_db_memory::InMemoryAuthStore;
use keymint_storage::{AuthStore, Client, ClientStore, Code, CodeStore, Token, TokenStore};

#[tokio::test]
async fn put_is_an_idempotent_upsert() {
    let store = InMemoryAuthStore::new();
    store.put_client(&Client::new("c", "s1")).await.unwrap();
    store.put_client(&Client::new("c", "s2")).await.unwrap();

    let client = store.get_client("c").await.unwrap();
    assert_eq!(client.client_secret, "s2");

    let all: Vec<Client> = store.list_clients().try_collect().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn get_missing_entities_is_not_found() {
    let store = InMemoryAuthStore::new();
    assert!(store.get_client("nope").await.unwrap_err().is_not_found());
    assert!(store.get_code("nope").await.unwrap_err().is_not_found());
    assert!(store.get_token("nope").await.unwrap_err().is_not_found());
    assert!(
        store
            .get_token_by_refresh_token("nope")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn delete_reports_whether_a_row_was_removed() {
    let store = InMemoryAuthStore::new();
    store.put_client(&Client::new("c", "s")).await.unwrap();
    store
        .put_code(&Code::new("code", "c", "https://cb", "read"))
        .await
        .unwrap();

    assert!(store.delete_code("code").await.unwrap());
    assert!(!store.delete_code("code").await.unwrap());
    assert!(!store.delete_token("missing").await.unwrap());
}

#[tokio::test]
async fn code_requires_existing_client() {
    let store = InMemoryAuthStore::new();
    let err = store
        .put_code(&Code::new("code", "ghost", "https://cb", "read"))
        .await
        .unwrap_err();
    assert!(err.is_constraint());
}

#[tokio::test]
async fn deleting_client_removes_its_codes() {
    let store = InMemoryAuthStore::new();
    store.put_client(&Client::new("a", "s")).await.unwrap();
    store.put_client(&Client::new("b", "s")).await.unwrap();
    store
        .put_code(&Code::new("code-a", "a", "https://cb", "read"))
        .await
        .unwrap();
    store
        .put_code(&Code::new("code-b", "b", "https://cb", "read"))
        .await
        .unwrap();

    assert!(store.delete_client("a").await.unwrap());

    let codes: Vec<Code> = store.list_codes().try_collect().await.unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code_id, "code-b");
}

#[tokio::test]
async fn token_lookup_by_refresh_token() {
    let store = InMemoryAuthStore::new();
    let token = Token::bearer("at", "rt", "read");
    store.put_token(&token).await.unwrap();

    assert_eq!(store.get_token("at").await.unwrap(), token);
    assert_eq!(store.get_token_by_refresh_token("rt").await.unwrap(), token);

    assert!(store.delete_token("at").await.unwrap());
    assert!(
        store
            .get_token_by_refresh_token("rt")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn refresh_token_must_be_unique() {
    let store = InMemoryAuthStore::new();
    store.put_token(&Token::bearer("at-1", "rt", "read")).await.unwrap();

    let err = store
        .put_token(&Token::bearer("at-2", "rt", "read"))
        .await
        .unwrap_err();
    assert!(err.is_constraint());
    assert!(store.get_token("at-2").await.unwrap_err().is_not_found());

    // Re-putting the owner of the refresh token is still an upsert.
    store.put_token(&Token::bearer("at-1", "rt", "write")).await.unwrap();
    assert_eq!(store.get_token_by_refresh_token("rt").await.unwrap().scope, "write");
}

#[tokio::test]
async fn list_starts_a_fresh_query_per_call() {
    let store = InMemoryAuthStore::new();
    store.put_token(&Token::bearer("a", "ra", "x")).await.unwrap();

    let first: Vec<Token> = store.list_tokens().try_collect().await.unwrap();
    store.put_token(&Token::bearer("b", "rb", "x")).await.unwrap();
    let second: Vec<Token> = store.list_tokens().try_collect().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn concurrent_deletes_have_a_single_winner() {
    let store = Arc::new(InMemoryAuthStore::new());
    store.put_client(&Client::new("c", "s")).await.unwrap();
    store
        .put_code(&Code::new("code", "c", "https://cb", "read"))
        .await
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.delete_code("code").await.unwrap() })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(store.backend_name(), "memory");
}

#[tokio::test]
async fn redeem_code_swaps_code_for_token_once() {
    let store = InMemoryAuthStore::new();
    store.put_client(&Client::new("c", "s")).await.unwrap();
    let code = Code::new("code", "c", "https://cb", "read");
    store.put_code(&code).await.unwrap();

    let token = Token::bearer("at", "rt", "read");
    assert!(store.redeem_code(&code, &token).await.unwrap());
    assert!(store.get_code("code").await.unwrap_err().is_not_found());
    assert_eq!(store.get_token("at").await.unwrap(), token);

    let again = Token::bearer("at-2", "rt-2", "read");
    assert!(!store.redeem_code(&code, &again).await.unwrap());
    assert!(store.get_token("at-2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn failed_token_write_keeps_code_and_old_token() {
    let store = InMemoryAuthStore::new();
    store.put_client(&Client::new("c", "s")).await.unwrap();
    let code = Code::new("code", "c", "https://cb", "read");
    store.put_code(&code).await.unwrap();
    let taken = Token::bearer("taken", "rt-taken", "read");
    store.put_token(&taken).await.unwrap();

    // The replacement reuses a bound refresh token, so its write fails.
    let clash = Token::bearer("at", "rt-taken", "read");
    let err = store.redeem_code(&code, &clash).await.unwrap_err();
    assert!(err.is_constraint());
    assert_eq!(store.get_code("code").await.unwrap(), code);

    let old = Token::bearer("old", "rt-old", "read");
    store.put_token(&old).await.unwrap();
    let err = store.rotate_token(&old, &clash).await.unwrap_err();
    assert!(err.is_constraint());
    assert_eq!(store.get_token_by_refresh_token("rt-old").await.unwrap(), old);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_code_write_and_client_delete_leave_no_orphans() {
    let store = Arc::new(InMemoryAuthStore::new());

    for i in 0..200 {
        let client_id = format!("client-{i}");
        store.put_client(&Client::new(&client_id, "s")).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            let code = Code::new(format!("code-{i}"), &client_id, "https://cb", "read");
            tokio::spawn(async move { store.put_code(&code).await })
        };
        let deleter = {
            let store = Arc::clone(&store);
            let client_id = client_id.clone();
            tokio::spawn(async move { store.delete_client(&client_id).await })
        };

        // A failed write is fine; a stored code outliving its client is not.
        let _ = writer.await.unwrap();
        assert!(deleter.await.unwrap().unwrap());
    }

    let codes: Vec<Code> = store.list_codes().try_collect().await.unwrap();
    assert!(codes.is_empty(), "orphaned codes: {codes:?}");
}
