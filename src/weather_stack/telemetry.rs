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

use opentelemetry::trace::TraceError;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::{runtime, trace, Resource};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Default address of the OTLP (gRPC) trace collector.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("unable to build trace exporter: {0}")]
    Exporter(#[from] TraceError),
    #[error("unable to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Logging and trace export settings for one service process.
#[derive(Debug, Clone)]
pub struct Telemetry {
    service_name: String,
    level: Level,
    otlp_endpoint: Option<String>,
}

impl Telemetry {
    pub fn new<S: Into<String>>(service_name: S, level: Level) -> Self {
        Telemetry {
            service_name: service_name.into(),
            level,
            otlp_endpoint: None,
        }
    }

    /// Export spans to an OTLP collector at `endpoint` in addition to logging them.
    pub fn with_otlp_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Install the global tracing subscriber.
    ///
    /// Log events are always written to stdout. When an OTLP endpoint is set,
    /// spans are also batched and exported to it and outgoing requests carry
    /// W3C trace context headers.
    pub fn init(&self) -> Result<(), TelemetryError> {
        let otel = match &self.otlp_endpoint {
            Some(endpoint) => {
                opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
                let tracer = opentelemetry_otlp::new_pipeline()
                    .tracing()
                    .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
                    .with_trace_config(trace::config().with_resource(Resource::new(vec![KeyValue::new(
                        "service.name",
                        self.service_name.clone(),
                    )])))
                    .install_batch(runtime::Tokio)?;

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(LevelFilter::from_level(self.level))
            .with(tracing_subscriber::fmt::layer())
            .with(otel)
            .try_init()?;

        Ok(())
    }

    /// Flush any spans that haven't been exported yet.
    pub fn shutdown(&self) {
        if self.otlp_endpoint.is_some() {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}
