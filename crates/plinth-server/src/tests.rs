//! End-to-end tests: authentication, CRUD and unauthenticated routes through
//! the fully assembled router.

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use plinth_api::testing::crud_contract;
use plinth_core::{Record, RecordStore as _, TenantId};
use plinth_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, ServerConfig, accounts, router, widget::Widget};

struct Harness {
  app:   Router,
  store: Arc<SqliteStore>,
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let state = AppState {
    store:  store.clone(),
    config: Arc::new(ServerConfig {
      host:       "127.0.0.1".to_string(),
      port:       8000,
      store_path: PathBuf::from(":memory:"),
      realm:      "plinth".to_string(),
      api_prefix: "/api".to_string(),
    }),
  };
  let app = router(state).await.unwrap();
  Harness { app, store }
}

impl Harness {
  async fn user(&self, email: &str, tenant: Option<TenantId>) -> String {
    accounts::create_user(&*self.store, email, "pw", tenant).await.unwrap();
    format!("Basic {}", B64.encode(format!("{email}:pw")))
  }

  async fn call(
    &self,
    auth: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    if body.is_some() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder
      .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
      .unwrap();

    let resp = self.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }
}

#[tokio::test]
async fn widget_lifecycle_across_tenants() {
  let h = harness().await;
  let tenant = TenantId(Uuid::new_v4());
  let alice = h.user("alice@example.com", Some(tenant)).await;
  let mallory = h.user("mallory@example.com", Some(TenantId(Uuid::new_v4()))).await;

  let (status, _, created) =
    h.call(Some(&alice), "POST", "/api/widget", Some(json!({ "name": "foo" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(created["name"], "foo");
  let id = created["id"].as_str().unwrap().to_owned();

  let (status, _, list) = h.call(Some(&alice), "GET", "/api/widget", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["id"], id.as_str());

  let item = format!("/api/widget/{id}");
  let (status, _, _) = h.call(Some(&mallory), "GET", &item, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _, body) = h.call(Some(&alice), "DELETE", &item, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "msg": "success" }));

  let (status, _, _) = h.call(Some(&alice), "GET", &item, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let stored: Record<Widget> = h
    .store
    .list(&plinth_core::RecordQuery::new().include_deleted())
    .await
    .unwrap()
    .remove(0);
  assert!(stored.is_deleted);
  assert_eq!(stored.tenant_id, Some(tenant));
}

#[tokio::test]
async fn duplicate_widget_name_is_rejected() {
  let h = harness().await;
  let alice = h.user("alice@example.com", None).await;

  let (status, _, _) =
    h.call(Some(&alice), "POST", "/api/widget", Some(json!({ "name": "foo" }))).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _, body) =
    h.call(Some(&alice), "POST", "/api/widget", Some(json!({ "name": "foo" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Widget already exists");
}

#[tokio::test]
async fn crud_routes_require_credentials() {
  let h = harness().await;
  h.user("alice@example.com", None).await;

  let (status, headers, _) = h.call(None, "GET", "/api/widget", None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Basic realm=\"plinth\"");

  let wrong = format!("Basic {}", B64.encode("alice@example.com:nope"));
  let (status, _, _) = h.call(Some(&wrong), "GET", "/api/widget", None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_through_put() {
  let h = harness().await;
  let alice = h.user("alice@example.com", None).await;

  let (_, _, created) =
    h.call(Some(&alice), "POST", "/api/widget", Some(json!({ "name": "foo" }))).await;
  let item = format!("/api/widget/{}", created["id"].as_str().unwrap());

  let (status, _, body) =
    h.call(Some(&alice), "PUT", &item, Some(json!({ "description": "shiny" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "msg": "success" }));

  let (_, _, fetched) = h.call(Some(&alice), "GET", &item, None).await;
  assert_eq!(fetched["name"], "foo");
  assert_eq!(fetched["description"], "shiny");

  let (status, _, _) = h.call(Some(&alice), "PUT", &item, Some(json!({ "name": "" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn open_routes_skip_authentication() {
  let h = harness().await;

  for uri in ["/api", "/api/health_check/", "/api/bot/"] {
    let (status, _, body) = h.call(None, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    assert_eq!(body["status"], "healthy");
  }

  let (status, _, body) = h
    .call(None, "POST", "/api/bot/conversation?user_id=u&conversation_id=c", None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["conversation_id"], "c");
}

#[tokio::test]
async fn widget_controller_satisfies_crud_contract() {
  let h = harness().await;
  let alice = h.user("alice@example.com", Some(TenantId(Uuid::new_v4()))).await;

  crud_contract::<Widget, _, _>(
    &h.app,
    &*h.store,
    |req: &mut Request<Body>| {
      req.headers_mut().insert(header::AUTHORIZATION, alice.parse().unwrap());
    },
    "/api/widget",
    json!({ "name": "test", "description": "test" }),
    json!({ "name": "upload", "description": "upload" }),
  )
  .await;
}
