//! A reusable HTTP contract for mounted CRUD controllers.
//!
//! [`crud_contract`] drives the five routes of one controller end to end:
//! create, list, get, update and delete. Any crate that mounts a model can run
//! it from its own tests (enable the `test-util` feature).

use std::time::Duration;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use plinth_core::{Record, RecordQuery, RecordStore, Schemas};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

/// Send one request through `app`, letting `authorize` attach credentials.
/// Returns the status and the JSON body (`Null` when the body is empty).
pub async fn send<A>(
  app: &Router,
  authorize: &A,
  method: &str,
  uri: &str,
  body: Option<&Value>,
) -> (StatusCode, Value)
where
  A: Fn(&mut Request<Body>),
{
  let mut builder = Request::builder().method(method).uri(uri);
  if body.is_some() {
    builder = builder.header(header::CONTENT_TYPE, "application/json");
  }
  let mut req = builder
    .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
    .expect("valid request");
  authorize(&mut req);

  let resp = app.clone().oneshot(req).await.expect("infallible router");
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .expect("readable body");
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn fields(body: &Value) -> &serde_json::Map<String, Value> {
  body.as_object().expect("contract bodies must be JSON objects")
}

/// Exercise every route of the controller for `M` mounted at `prefix`.
///
/// The caller that `authorize` identifies must not own any live `M` records
/// yet. `create` must be a valid create body whose fields are echoed by the
/// response schema; `update` must be a valid update body whose fields exist on
/// the stored model.
pub async fn crud_contract<M, S, A>(
  app: &Router,
  store: &S,
  authorize: A,
  prefix: &str,
  create: Value,
  update: Value,
) where
  M: Schemas,
  S: RecordStore,
  A: Fn(&mut Request<Body>),
{
  // Create: 200 with the submitted fields echoed back.
  let (status, created) = send(app, &authorize, "POST", prefix, Some(&create)).await;
  assert_eq!(status, StatusCode::OK, "create failed: {created}");
  for (name, value) in fields(&create) {
    assert_eq!(&created[name], value, "create did not echo {name}");
  }
  let id: Uuid = created["id"]
    .as_str()
    .and_then(|s| s.parse().ok())
    .expect("created record carries an id");
  let item = format!("{prefix}/{id}");

  // List: exactly the new record.
  let (status, list) = send(app, &authorize, "GET", prefix, None).await;
  assert_eq!(status, StatusCode::OK);
  let list = list.as_array().expect("list returns an array");
  assert_eq!(list.len(), 1, "list should hold only the new record");
  assert_eq!(list[0]["id"], id.to_string());

  // Get by id.
  let (status, fetched) = send(app, &authorize, "GET", &item, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["id"], id.to_string());

  // Update, then re-read from the store.
  let before: Record<M> = store.get(id).await.expect("created record is stored");
  tokio::time::sleep(Duration::from_millis(5)).await;

  let (status, body) = send(app, &authorize, "PUT", &item, Some(&update)).await;
  assert_eq!(status, StatusCode::OK, "update failed: {body}");
  assert_eq!(body, json!({ "msg": "success" }));

  let after: Record<M> = store.get(id).await.expect("updated record is stored");
  let data = serde_json::to_value(&after.data).expect("model serialises");
  for (name, value) in fields(&update) {
    assert_eq!(&data[name], value, "update did not write {name}");
  }
  assert!(after.updated_at > before.updated_at, "update must refresh updated_at");
  assert_eq!(after.created_at, before.created_at);

  // Delete: soft, so the row stays but leaves every live read.
  let (status, body) = send(app, &authorize, "DELETE", &item, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "msg": "success" }));

  let (status, list) = send(app, &authorize, "GET", prefix, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list, json!([]));

  let (status, _) = send(app, &authorize, "GET", &item, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let live: Vec<Record<M>> = store.list(&RecordQuery::new()).await.expect("list");
  assert!(live.iter().all(|r| r.id != id));
  let all: Vec<Record<M>> = store
    .list(&RecordQuery::new().include_deleted())
    .await
    .expect("list");
  assert!(all.iter().any(|r| r.id == id && r.is_deleted));
}
