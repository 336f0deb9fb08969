//! Per-request timing log.

use std::{net::SocketAddr, time::Instant};

use axum::{
  extract::{ConnectInfo, Request},
  middleware::Next,
  response::Response,
};

/// Log path, elapsed seconds and peer address of every request.
///
/// The peer address is only known when the server is started with
/// `into_make_service_with_connect_info`; otherwise it is logged as
/// `Unknown`.
pub async fn log_request(req: Request, next: Next) -> Response {
  let path = req.uri().path().to_owned();
  let ip = req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string())
    .unwrap_or_else(|| "Unknown".to_owned());

  let started = Instant::now();
  let response = next.run(req).await;
  let response_time = format!("{:.2}", started.elapsed().as_secs_f64());

  tracing::info!(
    path = %path,
    response_time = %response_time,
    ip = %ip,
    status = response.status().as_u16(),
    "Request to API"
  );
  response
}
