//! End-to-end behaviour of the user endpoints over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};

use user_service::Trace;
use user_service::domain::{TRACE_ID_HEADER, UserAccountService};
use user_service::inbound::http::error::json_error_handler;
use user_service::inbound::http::state::HttpState;
use user_service::inbound::http::users;
use user_service::outbound::persistence::InMemoryUserStore;
use user_service::outbound::token::JwtTokenIssuer;

fn http_state() -> web::Data<HttpState> {
    let tokens = JwtTokenIssuer::new(
        b"integration-secret",
        Duration::from_secs(60),
        Arc::new(DefaultClock),
    )
    .expect("token issuer");
    let accounts = UserAccountService::new(Arc::new(InMemoryUserStore::new()), Arc::new(tokens));
    web::Data::new(HttpState::new(Arc::new(accounts)))
}

macro_rules! user_app {
    () => {
        test::init_service(
            App::new()
                .wrap(Trace)
                .app_data(http_state())
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .configure(users::configure),
        )
        .await
    };
}

#[rstest]
#[actix_web::test]
async fn user_can_be_added_read_and_deleted() {
    let app = user_app!();

    let added = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .set_json(json!({"username": "alice", "password": "p1", "firstName": "Alice"}))
            .to_request(),
    )
    .await;
    assert_eq!(added.status(), StatusCode::OK);
    let body: Value = test::read_body_json(added).await;
    assert_eq!(
        body,
        json!({"message": "user added successfully", "username": "alice"})
    );

    let fetched =
        test::call_service(&app, test::TestRequest::get().uri("/user/alice").to_request()).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let body: Value = test::read_body_json(fetched).await;
    assert_eq!(
        body,
        json!({"username": "alice", "password": "p1", "firstName": "Alice"})
    );

    let deleted = test::call_service(
        &app,
        test::TestRequest::delete().uri("/user/alice").to_request(),
    )
    .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing =
        test::call_service(&app, test::TestRequest::get().uri("/user/alice").to_request()).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(missing).await;
    assert_eq!(body, json!({"message": "not_found"}));
}

#[rstest]
#[actix_web::test]
async fn duplicate_username_conflicts() {
    let app = user_app!();
    let payload = json!({"username": "bob", "password": "p1"});

    let first = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(second.headers().contains_key(TRACE_ID_HEADER));
    let body: Value = test::read_body_json(second).await;
    assert!(body["error"].as_str().is_some_and(|msg| msg.contains("bob")));
}

#[rstest]
#[actix_web::test]
async fn update_replaces_profile_fields() {
    let app = user_app!();
    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .set_json(json!({"username": "carol", "password": "p1", "phone": "555"}))
            .to_request(),
    )
    .await;

    let updated = test::call_service(
        &app,
        test::TestRequest::put()
            .uri("/user/carol")
            .set_json(json!({"username": "carol", "password": "p2", "email": "c@example.com"}))
            .to_request(),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let body: Value = test::read_body_json(updated).await;
    assert_eq!(body, json!({"message": "user update", "username": "carol"}));

    let fetched =
        test::call_service(&app, test::TestRequest::get().uri("/user/carol").to_request()).await;
    let body: Value = test::read_body_json(fetched).await;
    assert_eq!(
        body,
        json!({"username": "carol", "password": "p2", "email": "c@example.com"})
    );
}

#[rstest]
#[actix_web::test]
async fn updating_unknown_user_is_not_found() {
    let app = user_app!();

    let res = test::call_service(
        &app,
        test::TestRequest::put()
            .uri("/user/ghost")
            .set_json(json!({"username": "ghost", "password": "p1"}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[case("p1", StatusCode::OK)]
#[case("wrong", StatusCode::UNAUTHORIZED)]
#[actix_web::test]
async fn login_checks_the_stored_password(#[case] password: &str, #[case] expected: StatusCode) {
    let app = user_app!();
    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .set_json(json!({"username": "dave", "password": "p1"}))
            .to_request(),
    )
    .await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user/login")
            .set_json(json!({"username": "dave", "password": password}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), expected);
    let body: Value = test::read_body_json(res).await;
    if expected == StatusCode::OK {
        assert_eq!(body["username"], "dave");
        assert!(
            body["Authorization"]
                .as_str()
                .is_some_and(|token| !token.is_empty())
        );
    } else {
        assert!(body["error"].is_string());
    }
}

#[rstest]
#[actix_web::test]
async fn logout_always_succeeds() {
    let app = user_app!();

    let res = test::call_service(
        &app,
        test::TestRequest::post().uri("/user/logout").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let app = user_app!();

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/user")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert!(body["error"].is_string());
}
