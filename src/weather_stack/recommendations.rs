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

use crate::client::{RecommendationResponse, WeatherClient};
use crate::error::AppError;
use crate::http::{instrument, last_param, query_pairs, text_metrics, Health, QueryPairs};
use crate::metrics::{RecommendationMetrics, RequestMetrics};
use crate::rules::RuleTable;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Instant;
use tracing::field::Empty;
use tracing::Instrument;

/// Number of recommendations returned to callers.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Everything the recommendation service handlers share, built once at startup.
#[derive(Debug)]
pub struct RecommendationState {
    weather: WeatherClient,
    rules: RuleTable,
    registry: Registry,
    requests: RequestMetrics,
    metrics: RecommendationMetrics,
}

impl RecommendationState {
    pub fn new(weather: WeatherClient, rules: RuleTable) -> Self {
        let mut registry = Registry::default();
        let requests = RequestMetrics::new(&mut registry);
        let metrics = RecommendationMetrics::new(&mut registry);

        RecommendationState {
            weather,
            rules,
            registry,
            requests,
            metrics,
        }
    }

    /// Fetch the weather for `location` and turn it into ranked recommendations.
    ///
    /// The outcome and latency of the weather call are recorded whether it
    /// succeeds or not. A failed call is never replaced by made up weather.
    #[tracing::instrument(
        name = "get_recommendations",
        skip_all,
        fields(location = %location, weather.condition = Empty, weather.temperature = Empty)
    )]
    pub async fn recommend(&self, location: &str) -> Result<RecommendationResponse, AppError> {
        let start = Instant::now();
        tracing::info!(message = "getting recommendations", location = %location);

        let weather_start = Instant::now();
        let res = self
            .weather
            .prediction(Some(location))
            .instrument(tracing::info_span!("call_weather_service"))
            .await;
        self.metrics.weather_call(res.is_ok(), weather_start.elapsed());

        let prediction = res.map_err(|e| {
            tracing::error!(message = "error calling weather service", location = %location, error = %e);
            AppError::UpstreamUnavailable(e)
        })?;

        let condition = prediction.condition().to_lowercase();
        let temperature = prediction.temperature_celsius();

        let span = tracing::Span::current();
        span.record("weather.condition", condition.as_str());
        span.record("weather.temperature", temperature);

        let recommendations = self.rules.top(&condition, temperature, MAX_RECOMMENDATIONS);
        let best_activity = recommendations.first().map(|r| r.activity.clone());

        self.metrics.recommendation(location, &condition, start.elapsed());

        tracing::info!(
            message = "recommendations generated",
            location = %location,
            condition = %condition,
            temperature = %format!("{:.2}", temperature),
            top_activity = best_activity.as_deref().unwrap_or("none"),
        );

        Ok(RecommendationResponse {
            location: location.to_owned(),
            weather_condition: condition,
            temperature_celsius: temperature,
            recommendations,
            best_activity,
        })
    }
}

/// Build the router for the recommendation service.
pub fn router(state: Arc<RecommendationState>) -> Router {
    instrument(
        Router::new()
            .route("/health", get(health))
            .route("/recommendations", get(recommendations))
            .route("/metrics", get(metrics))
            .with_state(state),
    )
}

async fn health(State(state): State<Arc<RecommendationState>>) -> Json<Health> {
    state.requests.request("/health", "GET");
    Json(Health::healthy())
}

async fn recommendations(
    State(state): State<Arc<RecommendationState>>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<RecommendationResponse>, AppError> {
    state.requests.request("/recommendations", "GET");

    let location = last_param(&query_pairs(query)?, "location").ok_or(AppError::MissingParameter("location"))?;
    Ok(Json(state.recommend(&location).await?))
}

async fn metrics(State(state): State<Arc<RecommendationState>>) -> Response {
    text_metrics(&state.registry)
}

#[cfg(test)]
mod tests {
    use super::{router, RecommendationState};
    use crate::client::WeatherClient;
    use crate::rules::RuleTable;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use reqwest::Client;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn state(weather_url: &str) -> RecommendationState {
        let http = Client::builder().timeout(Duration::from_millis(500)).build().unwrap();
        let weather = WeatherClient::new(http, weather_url).unwrap();
        RecommendationState::new(weather, RuleTable::new())
    }

    fn app(weather_url: &str) -> Router {
        router(Arc::new(state(weather_url)))
    }

    /// Collects the `location` field of every `get_recommendations` span.
    #[derive(Clone, Default)]
    struct SpanLocations(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for SpanLocations {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            if attrs.metadata().name() == "get_recommendations" {
                let mut visitor = LocationVisitor(None);
                attrs.record(&mut visitor);
                if let Some(location) = visitor.0 {
                    self.0.lock().unwrap().push(location);
                }
            }
        }
    }

    struct LocationVisitor(Option<String>);

    impl Visit for LocationVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "location" {
                self.0 = Some(value.to_owned());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "location" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get(app("http://127.0.0.1:9"), "/health").await;

        assert_eq!(StatusCode::OK, status);
        assert_eq!(serde_json::json!({"status": "healthy"}), json);
    }

    #[tokio::test]
    async fn test_missing_location() {
        let (status, json) = get(app("http://127.0.0.1:9"), "/recommendations").await;

        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!("missing required query parameter: location", json["error"]);
    }

    #[tokio::test]
    async fn test_repeated_location_is_json() {
        let (status, json) = get(app("http://127.0.0.1:9"), "/recommendations?location=a&location=b").await;

        // Parsed fine, then fails calling the weather service
        assert_eq!(StatusCode::SERVICE_UNAVAILABLE, status);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_span_location_unquoted() {
        let locations = SpanLocations::default();
        let subscriber = tracing_subscriber::registry().with(locations.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let res = state("http://127.0.0.1:9").recommend("Paris").await;

        assert!(res.is_err());
        assert_eq!(vec!["Paris".to_owned()], *locations.0.lock().unwrap());
    }

    #[tokio::test]
    async fn test_weather_unreachable() {
        // Nothing listens on the discard port
        let (status, json) = get(app("http://127.0.0.1:9"), "/recommendations?location=Paris").await;

        assert_eq!(StatusCode::SERVICE_UNAVAILABLE, status);
        assert!(json["error"].as_str().unwrap().starts_with("Failed to get weather data"));
        assert!(json.get("recommendations").is_none());
    }
}
