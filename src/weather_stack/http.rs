// weather_stack - Instrumented demo weather, recommendation, and alert services
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::error::{AppError, ErrorResponse};
use axum::body::{Bytes, Full};
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Response as HttpResponse, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io;
use tokio::signal::unix::{self, SignalKind};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Content type of the OpenMetrics text exposition format.
pub const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Message returned to callers when a handler fails in an unexpected way.
pub const INTERNAL_ERROR: &str = "internal server error";

/// Body of a health check response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn healthy() -> Self {
        Health {
            status: "healthy".to_owned(),
        }
    }
}

/// Query string parameters in the order given. Names may repeat.
pub type QueryPairs = Vec<(String, String)>;

/// Unpack query string parameters, reporting a query that can't be parsed
/// as a JSON error rather than the default plain text rejection.
pub fn query_pairs(query: Result<Query<QueryPairs>, QueryRejection>) -> Result<QueryPairs, AppError> {
    match query {
        Ok(Query(pairs)) => Ok(pairs),
        Err(e) => {
            tracing::warn!(message = "unable to parse query string", error = %e);
            Err(AppError::InvalidQuery(e.body_text()))
        }
    }
}

/// Value of the last occurrence of `name` among `pairs`.
pub fn last_param(pairs: &[(String, String)], name: &str) -> Option<String> {
    pairs.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

/// Render every metric in `registry` using the text exposition format.
pub fn text_metrics(registry: &Registry) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            (StatusCode::OK, [(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Wrap a service router with request tracing and a handler that turns any
/// panic into a generic JSON error instead of a dropped connection.
pub fn instrument(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> HttpResponse<Full<Bytes>> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };

    tracing::error!(message = "unexpected error handling request", error = %detail);

    let body = serde_json::to_vec(&ErrorResponse::new(INTERNAL_ERROR)).unwrap_or_default();
    let mut res = HttpResponse::new(Full::from(body));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    res
}

/// Return after the first SIGTERM or SIGINT signal received by this process
pub async fn shutdown_signal() {
    tokio::select! {
        _ = sigterm() => {}
        _ = sigint() => {}
    }
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
