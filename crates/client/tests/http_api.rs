use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use encore_auth::{CredentialClaims, CredentialDecoder, JwtCredentialDecoder, RolesClaim, SubjectClaim};
use encore_catalog::{EventAction, EventState};
use encore_client::{ApiError, CatalogApi, ClientConfig, ErrorClass, HttpCatalogApi};
use encore_core::{ArtistId, EventId};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

/// What the stub saw: request path and `Authorization` header.
#[derive(Clone, Default)]
struct Stub {
    token: String,
    seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Stub {
    fn record(&self, path: &str, headers: &HeaderMap) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push((path.to_string(), auth));
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", self.token))
    }

    fn authorization_for(&self, path: &str) -> Option<Option<String>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, auth)| auth.clone())
    }
}

fn event_json(id: i64, state: &str, start: &str) -> Value {
    json!({
        "id": id,
        "nombre": format!("Gala {id}"),
        "descripcion": null,
        "startDate": start,
        "state": state,
        "artistIds": [7, 7]
    })
}

async fn login(State(stub): State<Stub>, headers: HeaderMap, Json(_body): Json<Value>) -> Json<Value> {
    stub.record("/api/auth/login", &headers);
    Json(json!({ "token": format!("Bearer {}", stub.token) }))
}

async fn public_events(State(stub): State<Stub>, headers: HeaderMap) -> Json<Value> {
    stub.record("/api/public/eventos", &headers);
    Json(json!([event_json(2, "CONFIRMED", "2026-12-01"), event_json(3, "CANCELED", "2026-12-02")]))
}

async fn public_event(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    stub.record("/api/public/evento", &headers);
    (StatusCode::FORBIDDEN, Json(json!({ "message": format!("event {id} is preliminary") }))).into_response()
}

async fn all_events(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record("/api/event/all", &headers);
    if !stub.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
    }
    Json(json!([event_json(1, "TENTATIVE", "2026-11-20T20:00:00")])).into_response()
}

async fn one_event(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    stub.record("/api/event/{id}", &headers);
    Json(event_json(id, "CONFIRMED", "2026-11-20")).into_response()
}

async fn confirmed(State(stub): State<Stub>, headers: HeaderMap, Path(_id): Path<i64>) -> StatusCode {
    stub.record("/api/event/{id}/confirmed", &headers);
    StatusCode::OK
}

async fn rescheduled(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    stub.record("/api/event/{id}/rescheduled", &headers);
    let date = body.as_str().unwrap_or("1970-01-01").to_string();
    stub.bodies.lock().unwrap().push(body);
    Json(event_json(id, "RESCHEDULED", &date))
}

async fn assign(State(stub): State<Stub>, headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    stub.record("/api/event/{id}/artists", &headers);
    (StatusCode::BAD_REQUEST, Json(json!({ "message": "artist already booked that day" }))).into_response()
}

async fn unfavorite(State(stub): State<Stub>, headers: HeaderMap, Path(_id): Path<i64>) -> StatusCode {
    stub.record("/api/user/me/favoritos/{id}", &headers);
    StatusCode::CONFLICT
}

async fn artists(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    stub.record("/api/artist/all", &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

struct TestServer {
    base_url: String,
    stub: Stub,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(token: &str) -> Self {
        let stub = Stub {
            token: token.to_string(),
            ..Stub::default()
        };
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/public/eventos", get(public_events))
            .route("/api/public/evento/:id", get(public_event))
            .route("/api/event/all", get(all_events))
            .route("/api/event/:id", get(one_event))
            .route("/api/event/:id/confirmed", put(confirmed))
            .route("/api/event/:id/rescheduled", put(rescheduled))
            .route("/api/event/:id/artists", post(assign))
            .route("/api/user/me/favoritos/:id", delete(unfavorite))
            .route("/api/artist/all", get(artists))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, stub, handle }
    }

    fn api(&self) -> HttpCatalogApi {
        let config = ClientConfig::default().with_api_url(format!("{}/", self.base_url));
        HttpCatalogApi::new(&config).expect("failed to build client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(username: &str, roles: &[&str]) -> String {
    let claims = CredentialClaims {
        id: Some(SubjectClaim::Number(12)),
        username: Some(username.to_string()),
        roles: Some(RolesClaim::List(roles.iter().map(|r| r.to_string()).collect())),
        exp: Some((Utc::now() + ChronoDuration::minutes(10)).timestamp()),
        ..CredentialClaims::default()
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(b"service-secret"),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn login_credential_decodes_and_is_sent_as_a_single_bearer() {
    let token = mint_jwt("marta", &["ROLE_USER", "ROLE_ADMIN"]);
    let srv = TestServer::spawn(&token).await;
    let api = srv.api();

    let credential = api.login("marta@example.com", "password1").await.unwrap();
    assert_eq!(credential.token(), token);

    let identity = JwtCredentialDecoder::new().decode(&credential, Utc::now()).unwrap();
    assert_eq!(identity.display_name, "marta");
    assert!(identity.is_admin());

    let events = api.events(&credential).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].start_date, NaiveDate::from_ymd_opt(2026, 11, 20).unwrap());
    assert_eq!(
        srv.stub.authorization_for("/api/event/all"),
        Some(Some(format!("Bearer {token}")))
    );
    assert_eq!(srv.stub.authorization_for("/api/auth/login"), Some(None));
}

#[tokio::test]
async fn public_paths_never_carry_the_credential() {
    let srv = TestServer::spawn("t").await;
    let api = srv.api();

    let events = api.public_events().await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].state, EventState::Cancelled);
    assert_eq!(events[0].assigned_artist_ids.len(), 1);
    assert_eq!(srv.stub.authorization_for("/api/public/eventos"), Some(None));
}

#[tokio::test]
async fn forbidden_public_details_do_not_force_logout() {
    let srv = TestServer::spawn("t").await;

    let err = srv.api().public_event(EventId::new(1)).await.unwrap_err();

    assert_eq!(err.status_code(), Some(403));
    assert_eq!(err.class(), ErrorClass::AuthorizationDenied);
    assert!(!err.forces_logout(false));
    assert_eq!(err, ApiError::status(403, "event 1 is preliminary"));
}

#[tokio::test]
async fn a_credential_the_service_rejects_forces_logout() {
    let srv = TestServer::spawn("expected").await;
    let credential = encore_auth::Credential::parse("something-else").unwrap();

    let err = srv.api().events(&credential).await.unwrap_err();

    assert_eq!(err.status_code(), Some(401));
    assert!(err.forces_logout(true));
    assert_eq!(err, ApiError::status(401, "Unauthorized"));
}

#[tokio::test]
async fn statuses_are_classified() {
    let srv = TestServer::spawn("t").await;
    let api = srv.api();
    let credential = encore_auth::Credential::parse("t").unwrap();

    let rejected = api
        .apply_event_action(&credential, EventId::new(1), &EventAction::AssignArtist(ArtistId::new(4)))
        .await
        .unwrap_err();
    assert_eq!(rejected.class(), ErrorClass::PreconditionFailed);
    assert_eq!(rejected.user_message(), "Request rejected: artist already booked that day");

    let conflict = api.unfavorite_event(&credential, EventId::new(2)).await.unwrap_err();
    assert_eq!(conflict.class(), ErrorClass::Conflict);

    let fault = api.artists(Some(&credential)).await.unwrap_err();
    assert_eq!(fault.class(), ErrorClass::Transient);
    assert_eq!(fault, ApiError::status(500, "boom"));
}

#[tokio::test]
async fn reschedule_sends_the_date_as_a_json_string() {
    let srv = TestServer::spawn("t").await;
    let credential = encore_auth::Credential::parse("Bearer t").unwrap();
    let date = NaiveDate::from_ymd_opt(2027, 3, 14).unwrap();

    let updated = srv
        .api()
        .apply_event_action(&credential, EventId::new(5), &EventAction::Reschedule(date))
        .await
        .unwrap();

    assert_eq!(updated.state, EventState::Rescheduled);
    assert_eq!(updated.start_date, date);
    assert_eq!(*srv.stub.bodies.lock().unwrap(), vec![json!("2027-03-14")]);
}

#[tokio::test]
async fn empty_action_responses_fall_back_to_fetching_the_event() {
    let srv = TestServer::spawn("t").await;
    let credential = encore_auth::Credential::parse("t").unwrap();

    let updated = srv
        .api()
        .apply_event_action(&credential, EventId::new(9), &EventAction::Confirm)
        .await
        .unwrap();

    assert_eq!(updated.id, EventId::new(9));
    assert_eq!(updated.state, EventState::Confirmed);
    assert!(srv.stub.authorization_for("/api/event/{id}/confirmed").is_some());
    assert!(srv.stub.authorization_for("/api/event/{id}").is_some());
}

#[tokio::test]
async fn unreachable_service_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::default().with_api_url(format!("http://{addr}"));
    let err = HttpCatalogApi::new(&config).unwrap().public_events().await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.class(), ErrorClass::Transient);
}
