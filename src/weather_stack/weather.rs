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

use crate::error::AppError;
use crate::http::{instrument, last_param, query_pairs, text_metrics, Health, QueryPairs};
use crate::metrics::{RequestMetrics, WeatherMetrics};
use crate::predictor::{WeatherPredictor, WeatherReading};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub const SERVICE_NAME: &str = "Weather Prediction Service";

/// Everything the weather service handlers share, built once at startup.
#[derive(Debug)]
pub struct WeatherState {
    predictor: WeatherPredictor,
    registry: Registry,
    requests: RequestMetrics,
    metrics: WeatherMetrics,
}

impl WeatherState {
    pub fn new(predictor: WeatherPredictor) -> Self {
        let mut registry = Registry::default();
        let requests = RequestMetrics::new(&mut registry);
        let metrics = WeatherMetrics::new(&mut registry);

        WeatherState {
            predictor,
            registry,
            requests,
            metrics,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Locations {
    pub locations: Vec<String>,
}

/// Build the router for the weather service.
pub fn router(state: Arc<WeatherState>) -> Router {
    instrument(
        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/locations", get(locations))
            .route("/prediction", get(prediction))
            .route("/metrics", get(metrics))
            .with_state(state),
    )
}

async fn root(State(state): State<Arc<WeatherState>>) -> Json<ServiceInfo> {
    state.requests.request("/", "GET");

    let endpoints = [
        ("prediction", "/prediction"),
        ("prediction_by_location", "/prediction?location=<location>"),
        ("locations", "/locations"),
        ("metrics", "/metrics"),
        ("health", "/health"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();

    Json(ServiceInfo {
        service: SERVICE_NAME.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        endpoints,
    })
}

async fn health(State(state): State<Arc<WeatherState>>) -> Json<Health> {
    state.requests.request("/health", "GET");
    Json(Health::healthy())
}

async fn locations(State(state): State<Arc<WeatherState>>) -> Json<Locations> {
    state.requests.request("/locations", "GET");
    Json(Locations {
        locations: state.predictor.locations().iter().map(|l| l.to_string()).collect(),
    })
}

async fn prediction(
    State(state): State<Arc<WeatherState>>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<WeatherReading>, AppError> {
    let start = Instant::now();
    state.requests.request("/prediction", "GET");

    let location = last_param(&query_pairs(query)?, "location");
    let reading = state.predictor.predict(location.as_deref());
    state.metrics.reading(&reading);
    state.metrics.latency(start.elapsed());

    tracing::info!(
        message = "generated prediction",
        location = %reading.location,
        condition = %reading.condition,
        temperature_celsius = reading.temperature_celsius,
        humidity_percent = reading.humidity_percent,
        pressure_hpa = reading.pressure_hpa,
        wind_speed_kmh = reading.wind_speed_kmh,
        precipitation_mm = reading.precipitation_mm,
    );

    Ok(Json(reading))
}

async fn metrics(State(state): State<Arc<WeatherState>>) -> Response {
    text_metrics(&state.registry)
}
