//! Tests for the user account service.

use std::sync::Arc;
use std::time::Duration;

use mockall::predicate::eq;
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{MockTokenIssuer, MockUserStore, StoredUser, TokenIssuerError};
use crate::domain::{AuthToken, ErrorCode};

type Service = UserAccountService<MockUserStore, MockTokenIssuer>;

fn make_service(store: MockUserStore, tokens: MockTokenIssuer) -> Service {
    UserAccountService::new(Arc::new(store), Arc::new(tokens))
}

fn username(raw: &str) -> Username {
    Username::new(raw).expect("valid username")
}

#[fixture]
fn alice() -> UserRecord {
    UserRecord::new(username("alice"), "p1")
        .expect("valid record")
        .with_first_name("Alice")
        .with_last_name("Liddell")
}

fn stored(record: UserRecord) -> StoredUser {
    StoredUser {
        id: Uuid::from_u128(1),
        record,
    }
}

#[rstest]
#[tokio::test]
async fn add_inserts_when_username_is_free(alice: UserRecord) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_username()
        .with(eq(username("alice")))
        .times(1)
        .return_once(|_| Ok(None));
    let expected = alice.clone();
    store
        .expect_insert()
        .withf(move |record| record == &expected)
        .times(1)
        .return_once(|_| Ok(Uuid::from_u128(1)));

    let added = make_service(store, MockTokenIssuer::new())
        .add_user(alice)
        .await
        .expect("add succeeds");

    assert_eq!(added, username("alice"));
}

#[rstest]
#[tokio::test]
async fn add_rejects_existing_username_without_writing(alice: UserRecord) {
    let mut store = MockUserStore::new();
    let existing = stored(alice.clone());
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    store.expect_insert().never();

    let err = make_service(store, MockTokenIssuer::new())
        .add_user(alice)
        .await
        .expect_err("duplicate");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn add_maps_unique_violation_to_conflict(alice: UserRecord) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_username()
        .times(1)
        .return_once(|_| Ok(None));
    store
        .expect_insert()
        .times(1)
        .return_once(|_| Err(UserStoreError::duplicate("alice")));

    let err = make_service(store, MockTokenIssuer::new())
        .add_user(alice)
        .await
        .expect_err("lost insert race");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn add_does_not_insert_after_a_failed_lookup(alice: UserRecord) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_username()
        .times(1)
        .return_once(|_| Err(UserStoreError::query("cursor closed")));
    store.expect_insert().never();

    let err = make_service(store, MockTokenIssuer::new())
        .add_user(alice)
        .await
        .expect_err("lookup failed");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[case(UserStoreError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserStoreError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn retrieve_surfaces_store_failures(
    #[case] failure: UserStoreError,
    #[case] expected: ErrorCode,
) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Err(failure));

    let err = make_service(store, MockTokenIssuer::new())
        .retrieve_user(&username("alice"))
        .await
        .expect_err("store failure");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn retrieve_distinguishes_absence(alice: UserRecord) {
    let mut store = MockUserStore::new();
    let existing = stored(alice.clone());
    store
        .expect_find_by_username()
        .with(eq(username("alice")))
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    store
        .expect_find_by_username()
        .with(eq(username("bob")))
        .times(1)
        .return_once(|_| Ok(None));
    let service = make_service(store, MockTokenIssuer::new());

    let found = service
        .retrieve_user(&username("alice"))
        .await
        .expect("alice exists");
    let missing = service
        .retrieve_user(&username("bob"))
        .await
        .expect_err("bob is absent");

    assert_eq!(found, alice);
    assert_eq!(missing.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn update_overwrites_fields_and_keeps_username_and_id(alice: UserRecord) {
    let mut store = MockUserStore::new();
    let existing = stored(alice);
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    store
        .expect_update_by_id()
        .withf(|id, record| {
            *id == Uuid::from_u128(1)
                && record.username().as_str() == "alice"
                && record.password() == "p2"
                && record.email() == Some("alice@example.com")
                && record.first_name().is_none()
        })
        .times(1)
        .return_once(|_, _| Ok(()));
    let replacement = UserRecord::new(username("someone-else"), "p2")
        .expect("valid record")
        .with_email("alice@example.com");

    let updated = make_service(store, MockTokenIssuer::new())
        .update_user(&username("alice"), replacement)
        .await
        .expect("update succeeds");

    assert_eq!(updated, username("alice"));
}

#[rstest]
#[tokio::test]
async fn update_of_absent_user_is_not_found(alice: UserRecord) {
    let mut store = MockUserStore::new();
    store
        .expect_find_by_username()
        .times(1)
        .return_once(|_| Ok(None));
    store.expect_update_by_id().never();

    let err = make_service(store, MockTokenIssuer::new())
        .update_user(&username("alice"), alice)
        .await
        .expect_err("absent user");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(Ok(1))]
#[case(Ok(0))]
#[tokio::test]
async fn delete_succeeds_whether_or_not_a_record_matched(
    #[case] outcome: Result<u64, UserStoreError>,
) {
    let mut store = MockUserStore::new();
    store
        .expect_delete_by_username()
        .with(eq(username("alice")))
        .times(1)
        .return_once(move |_| outcome);

    make_service(store, MockTokenIssuer::new())
        .delete_user(&username("alice"))
        .await
        .expect("delete succeeds");
}

#[rstest]
#[tokio::test]
async fn delete_surfaces_store_failure() {
    let mut store = MockUserStore::new();
    store
        .expect_delete_by_username()
        .times(1)
        .return_once(|_| Err(UserStoreError::query("write concern")));

    let err = make_service(store, MockTokenIssuer::new())
        .delete_user(&username("alice"))
        .await
        .expect_err("store failure");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn login_issues_token_with_identity_claims(alice: UserRecord) {
    let mut store = MockUserStore::new();
    let existing = stored(alice.clone());
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    let mut tokens = MockTokenIssuer::new();
    tokens
        .expect_issue()
        .with(eq(TokenClaims {
            sub: "alice".to_owned(),
            first_name: Some("Alice".to_owned()),
            last_name: Some("Liddell".to_owned()),
        }))
        .times(1)
        .return_once(|_| Ok(AuthToken::new("signed.token.value")));
    let credentials = LoginCredentials::try_from_parts("alice", "p1").expect("credentials");

    let authenticated = make_service(store, tokens)
        .login_user(&credentials)
        .await
        .expect("login succeeds");

    assert_eq!(authenticated.record, alice);
    assert_eq!(authenticated.token.as_str(), "signed.token.value");
}

#[rstest]
#[case::wrong_password(true, "wrong")]
#[case::unknown_user(false, "p1")]
#[tokio::test]
async fn login_failures_are_indistinguishable(
    alice: UserRecord,
    #[case] exists: bool,
    #[case] password: &str,
) {
    let mut store = MockUserStore::new();
    let existing = exists.then(|| stored(alice));
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Ok(existing));
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_issue().never();
    let credentials = LoginCredentials::try_from_parts("alice", password).expect("credentials");

    let err = make_service(store, tokens)
        .login_user(&credentials)
        .await
        .expect_err("login rejected");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(err.message(), "invalid credentials");
}

#[rstest]
#[tokio::test]
async fn login_reports_signing_failure_as_internal(alice: UserRecord) {
    let mut store = MockUserStore::new();
    let existing = stored(alice);
    store
        .expect_find_by_username()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    let mut tokens = MockTokenIssuer::new();
    tokens
        .expect_issue()
        .times(1)
        .return_once(|_| Err(TokenIssuerError::signing("bad key")));
    let credentials = LoginCredentials::try_from_parts("alice", "p1").expect("credentials");

    let err = make_service(store, tokens)
        .login_user(&credentials)
        .await
        .expect_err("signing failed");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn logout_always_succeeds() {
    make_service(MockUserStore::new(), MockTokenIssuer::new())
        .logout_user()
        .await
        .expect("logout is a no-op");
}

#[rstest]
#[tokio::test]
async fn slow_store_calls_time_out() {
    struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn find_by_username(
            &self,
            _username: &Username,
        ) -> Result<Option<StoredUser>, UserStoreError> {
            std::future::pending().await
        }

        async fn insert(&self, _record: &UserRecord) -> Result<Uuid, UserStoreError> {
            std::future::pending().await
        }

        async fn update_by_id(
            &self,
            _id: &Uuid,
            _record: &UserRecord,
        ) -> Result<(), UserStoreError> {
            std::future::pending().await
        }

        async fn delete_by_username(&self, _username: &Username) -> Result<u64, UserStoreError> {
            std::future::pending().await
        }
    }

    let service = UserAccountService::new(Arc::new(StalledStore), Arc::new(MockTokenIssuer::new()))
        .with_request_timeout(Duration::from_millis(20));

    let err = service
        .retrieve_user(&username("alice"))
        .await
        .expect_err("store stalled");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}
