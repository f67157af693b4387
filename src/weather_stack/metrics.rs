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

use crate::predictor::WeatherReading;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

/// Latency buckets, in seconds, shared by every histogram.
pub const LATENCY_BUCKETS: [f64; 11] = [0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0];

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

type FloatGauge = Gauge<f64, AtomicU64>;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct EndpointLabels {
    endpoint: String,
    method: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct LocationLabels {
    location: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct PredictionLabels {
    location: String,
    condition: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RecommendationLabels {
    location: String,
    weather_condition: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct StatusLabels {
    status: String,
}

fn latency_histogram() -> Histogram {
    Histogram::new(LATENCY_BUCKETS.into_iter())
}

/// Count of API requests by endpoint and HTTP method.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    requests: Family<EndpointLabels, Counter>,
}

impl RequestMetrics {
    /// Create a new `RequestMetrics` and register it with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let requests = Family::<EndpointLabels, Counter>::default();
        reg.register("api_requests", "Total number of API requests", requests.clone());

        Self { requests }
    }

    pub fn request(&self, endpoint: &str, method: &str) {
        self.requests
            .get_or_create(&EndpointLabels {
                endpoint: endpoint.to_owned(),
                method: method.to_owned(),
            })
            .inc();
    }
}

/// Holder for metrics that are set from each generated `WeatherReading`.
///
/// All metrics are created and registered upon call to `WeatherMetrics::new()`. Metrics
/// all share the prefix "weather_" and have a "location" label set to the location
/// the prediction was made for.
#[derive(Debug, Clone)]
pub struct WeatherMetrics {
    predictions: Family<PredictionLabels, Counter>,
    latency: Histogram,
    temperature: Family<LocationLabels, FloatGauge>,
    humidity: Family<LocationLabels, FloatGauge>,
    pressure: Family<LocationLabels, FloatGauge>,
    wind_speed: Family<LocationLabels, FloatGauge>,
    precipitation: Family<LocationLabels, FloatGauge>,
}

impl WeatherMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let predictions = Family::<PredictionLabels, Counter>::default();
        let latency = latency_histogram();
        let temperature = Family::<LocationLabels, FloatGauge>::default();
        let humidity = Family::<LocationLabels, FloatGauge>::default();
        let pressure = Family::<LocationLabels, FloatGauge>::default();
        let wind_speed = Family::<LocationLabels, FloatGauge>::default();
        let precipitation = Family::<LocationLabels, FloatGauge>::default();

        reg.register(
            "weather_predictions",
            "Total number of weather predictions generated",
            predictions.clone(),
        );
        reg.register(
            "weather_prediction_latency_seconds",
            "Latency of weather prediction requests in seconds",
            latency.clone(),
        );
        reg.register(
            "weather_temperature_celsius",
            "Current temperature in Celsius",
            temperature.clone(),
        );
        reg.register(
            "weather_humidity_percent",
            "Current humidity percentage",
            humidity.clone(),
        );
        reg.register(
            "weather_pressure_hpa",
            "Current atmospheric pressure in hPa",
            pressure.clone(),
        );
        reg.register(
            "weather_wind_speed_kmh",
            "Current wind speed in km/h",
            wind_speed.clone(),
        );
        reg.register(
            "weather_precipitation_mm",
            "Current precipitation in mm",
            precipitation.clone(),
        );

        Self {
            predictions,
            latency,
            temperature,
            humidity,
            pressure,
            wind_speed,
            precipitation,
        }
    }

    /// Count the prediction and set each gauge for its location.
    pub fn reading(&self, reading: &WeatherReading) {
        let location = LocationLabels {
            location: reading.location.clone(),
        };

        self.predictions
            .get_or_create(&PredictionLabels {
                location: reading.location.clone(),
                condition: reading.condition.to_string(),
            })
            .inc();

        self.temperature.get_or_create(&location).set(reading.temperature_celsius);
        self.humidity.get_or_create(&location).set(reading.humidity_percent);
        self.pressure.get_or_create(&location).set(reading.pressure_hpa);
        self.wind_speed.get_or_create(&location).set(reading.wind_speed_kmh);
        self.precipitation.get_or_create(&location).set(reading.precipitation_mm);
    }

    pub fn latency(&self, elapsed: Duration) {
        self.latency.observe(elapsed.as_secs_f64());
    }
}

/// Holder for metrics about recommendations and the weather calls they depend on.
#[derive(Debug, Clone)]
pub struct RecommendationMetrics {
    recommendations: Family<RecommendationLabels, Counter>,
    latency: Histogram,
    weather_calls: Family<StatusLabels, Counter>,
    weather_latency: Histogram,
}

impl RecommendationMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let recommendations = Family::<RecommendationLabels, Counter>::default();
        let latency = latency_histogram();
        let weather_calls = Family::<StatusLabels, Counter>::default();
        let weather_latency = latency_histogram();

        reg.register(
            "recommendations_generated",
            "Total number of recommendations generated",
            recommendations.clone(),
        );
        reg.register(
            "recommendation_latency_seconds",
            "Latency of recommendation requests in seconds",
            latency.clone(),
        );
        reg.register(
            "weather_service_calls",
            "Total number of calls to weather service",
            weather_calls.clone(),
        );
        reg.register(
            "weather_service_call_latency_seconds",
            "Latency of weather service calls in seconds",
            weather_latency.clone(),
        );

        Self {
            recommendations,
            latency,
            weather_calls,
            weather_latency,
        }
    }

    pub fn recommendation(&self, location: &str, condition: &str, elapsed: Duration) {
        self.recommendations
            .get_or_create(&RecommendationLabels {
                location: location.to_owned(),
                weather_condition: condition.to_owned(),
            })
            .inc();
        self.latency.observe(elapsed.as_secs_f64());
    }

    /// Record the outcome of a call to the weather service, successful or not.
    pub fn weather_call(&self, success: bool, elapsed: Duration) {
        let status = if success { STATUS_SUCCESS } else { STATUS_ERROR };
        self.weather_calls
            .get_or_create(&StatusLabels {
                status: status.to_owned(),
            })
            .inc();
        self.weather_latency.observe(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::{RecommendationMetrics, RequestMetrics, WeatherMetrics};
    use crate::predictor::{Condition, WeatherReading};
    use chrono::Utc;
    use prometheus_client::encoding::text::encode;
    use prometheus_client::registry::Registry;
    use std::time::Duration;

    fn render(reg: &Registry) -> String {
        let mut buf = String::new();
        encode(&mut buf, reg).unwrap();
        buf
    }

    #[test]
    fn test_weather_metrics_reading() {
        let mut reg = Registry::default();
        let metrics = WeatherMetrics::new(&mut reg);

        metrics.reading(&WeatherReading {
            location: "Tokyo".to_owned(),
            timestamp: Utc::now(),
            temperature_celsius: 21.5,
            humidity_percent: 40.0,
            pressure_hpa: 1001.25,
            wind_speed_kmh: 3.0,
            precipitation_mm: 0.0,
            condition: Condition::Cloudy,
        });
        metrics.latency(Duration::from_millis(3));

        let out = render(&reg);
        assert!(out.contains("weather_predictions_total{location=\"Tokyo\",condition=\"cloudy\"} 1"));
        assert!(out.contains("weather_temperature_celsius{location=\"Tokyo\"} 21.5"));
        assert!(out.contains("weather_pressure_hpa{location=\"Tokyo\"} 1001.25"));
        assert!(out.contains("weather_prediction_latency_seconds_count 1"));
    }

    #[test]
    fn test_recommendation_metrics() {
        let mut reg = Registry::default();
        let metrics = RecommendationMetrics::new(&mut reg);

        metrics.weather_call(true, Duration::from_millis(10));
        metrics.weather_call(false, Duration::from_millis(10));
        metrics.weather_call(false, Duration::from_millis(10));
        metrics.recommendation("Paris", "rainy", Duration::from_millis(12));

        let out = render(&reg);
        assert!(out.contains("weather_service_calls_total{status=\"success\"} 1"));
        assert!(out.contains("weather_service_calls_total{status=\"error\"} 2"));
        assert!(out.contains("recommendations_generated_total{location=\"Paris\",weather_condition=\"rainy\"} 1"));
        assert!(out.contains("weather_service_call_latency_seconds_count 3"));
        assert!(out.contains("recommendation_latency_seconds_count 1"));
    }

    #[test]
    fn test_request_metrics_concurrent() {
        let mut reg = Registry::default();
        let metrics = RequestMetrics::new(&mut reg);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.request("/health", "GET");
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let out = render(&reg);
        assert!(out.contains("api_requests_total{endpoint=\"/health\",method=\"GET\"} 800"));
    }
}
