//! UniFi client against an in-process mock controller
//!
//! Constraints verified:
//! - Group calls log in on demand and reuse the session cookie
//! - A missing group is reported as NotFound
//! - Create posts an address-group and returns the controller's record
//! - Update replaces the membership
//! - A rejected session maps to Authentication and forces a fresh login
//! - Bad credentials fail login with Authentication

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use threat_sync_core::config::ControllerConfig;
use threat_sync_core::traits::AddressGroupClient;
use threat_sync_core::Error;
use threat_sync_unifi::UnifiClient;

const SESSION_COOKIE: &str = "TOKEN=session-token";

#[derive(Default)]
struct MockController {
    /// (id, name, members)
    groups: Mutex<Vec<(String, String, Vec<String>)>>,
    session_valid: Mutex<bool>,
    logins: AtomicUsize,
    logouts: AtomicUsize,
}

impl MockController {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let has_cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains(SESSION_COOKIE));
        has_cookie && *self.session_valid.lock().unwrap()
    }

    fn expire_session(&self) {
        *self.session_valid.lock().unwrap() = false;
    }

    fn group_json(id: &str, name: &str, members: &[String]) -> Value {
        json!({
            "_id": id,
            "name": name,
            "group_type": "address-group",
            "group_members": members,
            "site_id": "5e1f",
        })
    }
}

type Shared = Arc<MockController>;

async fn login(State(mock): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    if body["username"] == "admin" && body["password"] == "secret" && body["remember"] == true {
        mock.logins.fetch_add(1, Ordering::SeqCst);
        *mock.session_valid.lock().unwrap() = true;
        (
            StatusCode::OK,
            [(header::SET_COOKIE, format!("{}; Path=/; HttpOnly", SESSION_COOKIE))],
            Json(json!({"username": "admin"})),
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "invalid credentials").into_response()
    }
}

async fn logout(State(mock): State<Shared>) -> StatusCode {
    mock.logouts.fetch_add(1, Ordering::SeqCst);
    mock.expire_session();
    StatusCode::OK
}

async fn list_groups(
    State(mock): State<Shared>,
    Path(site): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !mock.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"meta": {"rc": "error"}})));
    }
    assert_eq!(site, "default");

    let data: Vec<Value> = mock
        .groups
        .lock()
        .unwrap()
        .iter()
        .map(|(id, name, members)| MockController::group_json(id, name, members))
        .collect();
    (StatusCode::OK, Json(json!({"meta": {"rc": "ok"}, "data": data})))
}

async fn create_group(
    State(mock): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !mock.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    assert_eq!(body["group_type"], "address-group");
    assert!(body.get("_id").is_none());

    let name = body["name"].as_str().unwrap_or_default().to_string();
    let members: Vec<String> = serde_json::from_value(body["group_members"].clone()).unwrap();

    let mut groups = mock.groups.lock().unwrap();
    let id = format!("group-{}", groups.len() + 1);
    groups.push((id.clone(), name.clone(), members.clone()));

    (
        StatusCode::CREATED,
        Json(json!({"meta": {"rc": "ok"}, "data": [MockController::group_json(&id, &name, &members)]})),
    )
}

async fn update_group(
    State(mock): State<Shared>,
    Path((_site, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !mock.authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let members: Vec<String> = serde_json::from_value(body["group_members"].clone()).unwrap();

    let mut groups = mock.groups.lock().unwrap();
    match groups.iter_mut().find(|(gid, _, _)| *gid == id) {
        Some(group) => {
            group.2 = members;
            StatusCode::OK
        }
        None => StatusCode::BAD_REQUEST,
    }
}

async fn start(mock: Shared) -> SocketAddr {
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route(
            "/proxy/network/api/s/:site/rest/firewallgroup",
            get(list_groups).post(create_group),
        )
        .route("/proxy/network/api/s/:site/rest/firewallgroup/:id", put(update_group))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, password: &str) -> UnifiClient {
    UnifiClient::new(&ControllerConfig::new(
        format!("http://{}", addr),
        "admin",
        password,
    ))
    .unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn missing_group_is_not_found_then_created() {
    let mock = Shared::default();
    let addr = start(mock.clone()).await;
    let client = client(addr, "secret");

    let err = client.get_group("uts-block-list").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    assert!(client.is_logged_in());

    let members = strings(&["10.0.0.0/8", "192.0.2.1/32"]);
    let created = client.create_group("uts-block-list", &members).await.unwrap();
    assert_eq!(created.id, "group-1");
    assert_eq!(created.members, members);

    let fetched = client.get_group("uts-block-list").await.unwrap();
    assert_eq!(fetched, created);

    // One login served every call
    assert_eq!(mock.logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_replaces_membership() {
    let mock = Shared::default();
    mock.groups.lock().unwrap().push((
        "5f3c".to_string(),
        "uts-block-list".to_string(),
        strings(&["203.0.113.0/24"]),
    ));
    let addr = start(mock.clone()).await;
    let client = client(addr, "secret");

    let group = client.get_group("uts-block-list").await.unwrap();
    client
        .update_group(&group.id, &strings(&["198.51.100.7/32"]))
        .await
        .unwrap();

    assert_eq!(
        client.get_group("uts-block-list").await.unwrap().members,
        strings(&["198.51.100.7/32"])
    );
}

#[tokio::test]
async fn rejected_session_forces_relogin() {
    let mock = Shared::default();
    let addr = start(mock.clone()).await;
    let client = client(addr, "secret");

    client.login().await.unwrap();
    mock.expire_session();

    let err = client.get_group("uts-block-list").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
    assert!(!client.is_logged_in());

    // Next call logs in again
    let err = client.get_group("uts-block-list").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    assert_eq!(mock.logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn bad_credentials_fail_login() {
    let mock = Shared::default();
    let addr = start(mock.clone()).await;
    let client = client(addr, "wrong");

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
    assert!(!client.is_logged_in());

    // Group calls surface the same failure without touching the API
    let err = client.get_group("uts-block-list").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn logout_ends_session() {
    let mock = Shared::default();
    let addr = start(mock.clone()).await;
    let client = client(addr, "secret");

    client.login().await.unwrap();
    client.logout().await.unwrap();

    assert!(!client.is_logged_in());
    assert_eq!(mock.logouts.load(Ordering::SeqCst), 1);
}
