//! HostedBackend against a mocked auth/table API.

use carebridge_auth::{
    AccessToken, AuthError, HostedBackend, HostedConfig, PageGuard, ProfileDirectory,
    ProfileResolver, ResolutionError, Role, RoleRouter, RoleSet, SessionFactory, SignUpAttributes,
    UserId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "anon-test-key";

fn backend(server: &MockServer) -> HostedBackend {
    HostedBackend::new(HostedConfig::new(server.uri(), API_KEY)).unwrap()
}

async fn mock_user(server: &MockServer, token: &str, id: UserId) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id.to_string(),
            "email": "user@hospital.org",
            "aud": "authenticated"
        })))
        .mount(server)
        .await;
}

/// Rows are only served to the signed-in user's token, as under row-level
/// security.
async fn mock_profile(server: &MockServer, token: &str, id: UserId, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{id}").as_str()))
        .and(header("apikey", API_KEY))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sign_in_success_sets_session() {
    let server = MockServer::start().await;
    let id = UserId::new();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_partial_json(json!({ "email": "nurse@hospital.org" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": id.to_string(), "email": "nurse@hospital.org" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_user(&server, "tok-123", id).await;

    let store = backend(&server).open(None);
    let session = store
        .sign_in_with_password("nurse@hospital.org", "pw123456")
        .await
        .unwrap();
    assert_eq!(session.user_id, id);
    assert_eq!(session.access_token.as_str(), "tok-123");

    let current = store.get_session().await.unwrap().unwrap();
    assert_eq!(current.user_id, id);
}

#[tokio::test]
async fn sign_in_failure_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .open(None)
        .sign_in_with_password("x@y.org", "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected { status: 400, .. }));
    assert_eq!(err.to_string(), "Invalid login credentials");
}

#[tokio::test]
async fn sign_up_duplicate_is_rejected_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({ "data": { "user_type": "patient" } })))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "error_code": "user_already_exists",
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let attributes = SignUpAttributes {
        full_name: "Kemi".into(),
        phone: None,
        user_type: Role::Patient,
    };
    let err = backend(&server)
        .open(None)
        .sign_up("kemi@x.org", "secret12", &attributes)
        .await
        .unwrap_err();
    assert!(err.is_duplicate_account());
    assert_eq!(err.to_string(), "User already registered");
}

#[tokio::test]
async fn sign_up_weak_password_is_not_a_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "error_code": "weak_password",
            "msg": "Password should be at least 8 characters."
        })))
        .mount(&server)
        .await;

    let attributes = SignUpAttributes {
        full_name: "Kemi".into(),
        phone: None,
        user_type: Role::Patient,
    };
    let err = backend(&server)
        .open(None)
        .sign_up("kemi@x.org", "secret1", &attributes)
        .await
        .unwrap_err();
    assert!(!err.is_duplicate_account());
    match err {
        AuthError::Rejected { status, code, message } => {
            assert_eq!(status, 422);
            assert_eq!(code.as_deref(), Some("weak_password"));
            assert_eq!(message, "Password should be at least 8 characters.");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn sign_up_without_session_needs_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": UserId::new().to_string(),
            "email": "kemi@x.org",
            "confirmation_sent_at": "2026-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let attributes = SignUpAttributes {
        full_name: "Kemi".into(),
        phone: None,
        user_type: Role::Patient,
    };
    let err = backend(&server)
        .open(None)
        .sign_up("kemi@x.org", "secret12", &attributes)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ConfirmationPending));
}

#[tokio::test]
async fn rejected_token_means_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;

    let store = backend(&server).open(Some(AccessToken::new("stale")));
    assert!(store.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_out_calls_logout_and_forgets_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer tok-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = backend(&server).open(Some(AccessToken::new("tok-9")));
    store.sign_out().await.unwrap();
    // Second sign-out has no token left and makes no request.
    store.sign_out().await.unwrap();
    assert!(store.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_profile_zero_and_one_rows() {
    let server = MockServer::start().await;
    let present = UserId::new();
    let absent = UserId::new();
    mock_profile(
        &server,
        "tok",
        present,
        json!([{ "id": present.to_string(), "full_name": "Ola", "user_type": "police" }]),
    )
    .await;
    mock_profile(&server, "tok", absent, json!([])).await;

    let backend = backend(&server);
    let token = AccessToken::new("tok");
    let row = backend.fetch_profile_by_id(&token, &present).await.unwrap().unwrap();
    assert_eq!(row.user_type.as_deref(), Some("police"));
    assert!(backend.fetch_profile_by_id(&token, &absent).await.unwrap().is_none());
}

#[tokio::test]
async fn insert_profile_posts_row() {
    let server = MockServer::start().await;
    let id = UserId::new();
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(header("prefer", "return=minimal"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer new-user-jwt"))
        .and(body_partial_json(json!({ "id": id.to_string(), "user_type": "patient" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let row = carebridge_auth::ProfileRow::new(id, "Ify", None, None, Role::Patient);
    backend(&server)
        .insert_profile(&AccessToken::new("new-user-jwt"), &row)
        .await
        .unwrap();
}

#[tokio::test]
async fn guard_scenarios_over_http() {
    let server = MockServer::start().await;
    let police = UserId::new();
    mock_user(&server, "police-token", police).await;
    mock_profile(
        &server,
        "police-token",
        police,
        json!([{ "id": police.to_string(), "full_name": "Sgt. Bala", "user_type": "police" }]),
    )
    .await;

    let backend = backend(&server);
    let resolver = ProfileResolver::new(Arc::new(backend.clone()));
    let store = backend.open(Some(AccessToken::new("police-token")));

    let outcome = PageGuard::new("admin", RoleSet::ADMINISTRATORS)
        .run(&resolver, &RoleRouter::default(), store.as_ref())
        .await;
    assert_eq!(outcome.decision, carebridge_auth::Decision::DenyWrongRole(Role::Police));
    assert_eq!(
        outcome.navigation.location().as_deref(),
        Some("/police/dashboard?notice=permission_denied")
    );
}

#[tokio::test]
async fn profile_fetch_is_made_as_the_signed_in_user() {
    let server = MockServer::start().await;
    let nurse = UserId::new();
    mock_user(&server, "user-jwt", nurse).await;
    mock_profile(
        &server,
        "user-jwt",
        nurse,
        json!([{ "id": nurse.to_string(), "full_name": "Nurse Ada", "user_type": "hospital_staff" }]),
    )
    .await;
    // Anything authorized with the project key sees no rows.
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let resolver = ProfileResolver::new(Arc::new(backend.clone()));
    let store = backend.open(Some(AccessToken::new("user-jwt")));

    let profile = resolver.resolve_current_profile(store.as_ref()).await.unwrap();
    assert_eq!(profile.id, nurse);
    assert_eq!(profile.role, Role::HospitalStaff);
}

#[tokio::test]
async fn profile_for_another_subject_is_missing() {
    let server = MockServer::start().await;
    let subject = UserId::new();
    let stranger = UserId::new();
    mock_user(&server, "tok", subject).await;
    mock_profile(
        &server,
        "tok",
        subject,
        json!([{ "id": stranger.to_string(), "user_type": "admin" }]),
    )
    .await;

    let backend = backend(&server);
    let resolver = ProfileResolver::new(Arc::new(backend.clone()));
    let store = backend.open(Some(AccessToken::new("tok")));
    assert_eq!(
        resolver.resolve_current_profile(store.as_ref()).await,
        Err(ResolutionError::ProfileMissing)
    );
}

#[tokio::test]
async fn server_error_during_profile_fetch_is_missing() {
    let server = MockServer::start().await;
    let subject = UserId::new();
    mock_user(&server, "tok", subject).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let resolver = ProfileResolver::new(Arc::new(backend.clone()));
    let store = backend.open(Some(AccessToken::new("tok")));
    assert_eq!(
        resolver.resolve_current_profile(store.as_ref()).await,
        Err(ResolutionError::ProfileMissing)
    );
}

#[tokio::test]
async fn slow_session_lookup_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({ "id": UserId::new().to_string() })),
        )
        .mount(&server)
        .await;

    let backend = backend(&server);
    let resolver =
        ProfileResolver::new(Arc::new(backend.clone())).with_timeout(Duration::from_millis(100));
    let store = backend.open(Some(AccessToken::new("tok")));
    assert_eq!(
        resolver.resolve_current_profile(store.as_ref()).await,
        Err(ResolutionError::ProfileMissing)
    );
}
