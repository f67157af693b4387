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

use opentelemetry::global;
use opentelemetry::propagation::TextMapPropagator;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::rules::ActivityRecommendation;

/// Condition reported when a prediction response doesn't include one.
pub const DEFAULT_CONDITION: &str = "unknown";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("request to {1} timed out: {0}")]
    Timeout(#[source] reqwest::Error, Url),
    #[error("unexpected status {0} for {1}")]
    Unexpected(StatusCode, Url),
    #[error(transparent)]
    Internal(#[from] reqwest::Error),
}

impl ClientError {
    fn from_send(e: reqwest::Error, url: Url) -> Self {
        if e.is_timeout() {
            Self::Timeout(e, url)
        } else {
            Self::Internal(e)
        }
    }
}

/// Body of a `/prediction` response as seen by a consumer.
///
/// Only the fields recommendations depend on are read and each is optional
/// so that a partial response degrades to documented defaults instead of
/// failing: a missing condition is [`DEFAULT_CONDITION`] and a missing
/// temperature is `0.0`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PredictionResponse {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub temperature_celsius: Option<f64>,
}

impl PredictionResponse {
    pub fn condition(&self) -> &str {
        self.condition.as_deref().unwrap_or(DEFAULT_CONDITION)
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius.unwrap_or(0.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationsResponse {
    pub locations: Vec<String>,
}

/// Body of a successful `/recommendations` response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecommendationResponse {
    pub location: String,
    pub weather_condition: String,
    pub temperature_celsius: f64,
    pub recommendations: Vec<ActivityRecommendation>,
    pub best_activity: Option<String>,
}

/// Shared plumbing for talking to one of the JSON services.
#[derive(Debug, Clone)]
struct JsonService {
    client: Client,
    base_url: Url,
}

impl JsonService {
    const JSON_RESPONSE: &'static str = "application/json";

    fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(base_url.to_owned(), e.to_string()))?;
        Ok(JsonService { client, base_url })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut p) = url.path_segments_mut() {
            p.pop_if_empty().push(path);
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        url
    }

    async fn get<T: DeserializeOwned>(&self, user_agent: &str, url: Url) -> Result<T, ClientError> {
        let res = self.make_request(user_agent, url).await?;
        Ok(res.json::<T>().await?)
    }

    async fn make_request(&self, user_agent: &str, url: Url) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .headers(trace_headers())
            .send()
            .await
            .map_err(|e| ClientError::from_send(e, url.clone()))?;

        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }
}

/// W3C trace context headers for the current span, if a propagator is installed.
fn trace_headers() -> HeaderMap {
    let cx = tracing::Span::current().context();
    let mut carrier: HashMap<String, String> = HashMap::new();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&cx, &mut carrier));

    let mut headers = HeaderMap::new();
    for (k, v) in carrier {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(k), HeaderValue::try_from(v)) {
            headers.insert(name, value);
        }
    }

    headers
}

/// Client for the weather prediction service.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    inner: JsonService,
}

impl WeatherClient {
    const USER_AGENT: &'static str = "weather_stack weather client";

    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        Ok(WeatherClient {
            inner: JsonService::new(client, base_url)?,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.inner.url("health", &[]);
        tracing::debug!(message = "making weather health request", url = %url);
        self.inner.get(Self::USER_AGENT, url).await
    }

    pub async fn locations(&self) -> Result<LocationsResponse, ClientError> {
        let url = self.inner.url("locations", &[]);
        tracing::debug!(message = "making locations request", url = %url);
        self.inner.get(Self::USER_AGENT, url).await
    }

    pub async fn prediction(&self, location: Option<&str>) -> Result<PredictionResponse, ClientError> {
        let url = match location {
            Some(l) => self.inner.url("prediction", &[("location", l)]),
            None => self.inner.url("prediction", &[]),
        };

        tracing::debug!(message = "making prediction request", url = %url);
        self.inner.get(Self::USER_AGENT, url).await
    }
}

/// Client for the activity recommendations service.
#[derive(Debug, Clone)]
pub struct RecommendationsClient {
    inner: JsonService,
}

impl RecommendationsClient {
    const USER_AGENT: &'static str = "weather_stack recommendations client";

    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        Ok(RecommendationsClient {
            inner: JsonService::new(client, base_url)?,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.inner.url("health", &[]);
        tracing::debug!(message = "making recommendations health request", url = %url);
        self.inner.get(Self::USER_AGENT, url).await
    }

    pub async fn recommendations(&self, location: &str) -> Result<RecommendationResponse, ClientError> {
        let url = self.inner.url("recommendations", &[("location", location)]);
        tracing::debug!(message = "making recommendations request", url = %url);
        self.inner.get(Self::USER_AGENT, url).await
    }
}
