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

//! Instrumented demo weather services
//!
//! ## Features
//!
//! `weather_stack` is a set of small HTTP services that exist to produce metrics, logs, and
//! traces for an observability dashboard. None of them do anything genuinely useful: weather
//! "predictions" are uniformly random numbers and recommendations come from a static table.
//!
//! * `weather_service` - Random weather predictions for a named or random location.
//! * `recommendations_service` - Activity recommendations based on the weather, fetched from
//!   `weather_service` over HTTP.
//! * `alert_notifier` - Webhook receiver that logs alerts sent to it by an alert manager.
//! * `traffic_gen` - Sends requests to the weather and recommendation services.
//!
//! The weather and recommendation services emit the following metrics at `/metrics`.
//!
//! * `api_requests_total{endpoint=$ENDPOINT, method=$METHOD}` - Requests by endpoint.
//! * `weather_predictions_total{location=$LOCATION, condition=$CONDITION}` - Predictions made.
//! * `weather_prediction_latency_seconds` - Time to make a prediction.
//! * `weather_temperature_celsius{location=$LOCATION}` - Temperature, in degrees celsius.
//! * `weather_humidity_percent{location=$LOCATION}` - Relative humidity (0-100).
//! * `weather_pressure_hpa{location=$LOCATION}` - Atmospheric pressure, in hectopascals.
//! * `weather_wind_speed_kmh{location=$LOCATION}` - Wind speed, in km/h.
//! * `weather_precipitation_mm{location=$LOCATION}` - Precipitation, in mm.
//! * `recommendations_generated_total{location=$LOCATION, weather_condition=$CONDITION}` -
//!   Recommendations made.
//! * `recommendation_latency_seconds` - Time to make a recommendation, including the weather call.
//! * `weather_service_calls_total{status=$STATUS}` - Calls to the weather service by outcome.
//! * `weather_service_call_latency_seconds` - Time spent calling the weather service.
//!
//! ## Build
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Run
//!
//! Start the weather service and then the recommendation service, pointing it at the weather
//! service. Spans from the recommendation service are exported to an OTLP collector at
//! `http://localhost:4317` unless `--no-trace-export` is given.
//!
//! ```text
//! ./weather_service --bind 0.0.0.0:8000
//! ./recommendations_service --bind 0.0.0.0:8001 --weather-url http://localhost:8000
//! ./alert_notifier --bind 0.0.0.0:8080
//! ```
//!
//! ### Generate traffic
//!
//! ```text
//! ./traffic_gen --service both --location London -n 10 -i 1
//! ```
//!
//! ### Prometheus
//!
//! ```yaml
//! scrape_configs:
//! - job_name: weather
//!   static_configs:
//!   - targets: ['localhost:8000', 'localhost:8001']
//! ```
//!

pub mod alerts;
pub mod client;
pub mod error;
pub mod http;
pub mod metrics;
pub mod predictor;
pub mod recommendations;
pub mod rules;
pub mod telemetry;
pub mod traffic;
pub mod weather;
