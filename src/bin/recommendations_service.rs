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

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use weather_stack::client::WeatherClient;
use weather_stack::http::shutdown_signal;
use weather_stack::recommendations::{self, RecommendationState};
use weather_stack::rules::RuleTable;
use weather_stack::telemetry::{Telemetry, DEFAULT_OTLP_ENDPOINT};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8001);
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_WEATHER_URL: &str = "http://weather-service:8000";

#[derive(Debug, Parser)]
#[clap(name = "recommendations_service", version = clap::crate_version!())]
struct RecommendationsServiceApplication {
    /// Base URL of the weather service
    #[clap(long, env = "WEATHER_SERVICE_URL", default_value_t = DEFAULT_WEATHER_URL.into())]
    weather_url: String,

    /// Timeout for fetching predictions from the weather service, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// OTLP (gRPC) endpoint to export trace spans to
    #[clap(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value_t = DEFAULT_OTLP_ENDPOINT.into())]
    otlp_endpoint: String,

    /// Don't export trace spans, only log them
    #[clap(long)]
    no_trace_export: bool,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Address to bind to.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = RecommendationsServiceApplication::parse();
    let mut telemetry = Telemetry::new("recommendations-service", opts.log_level);
    if !opts.no_trace_export {
        telemetry = telemetry.with_otlp_endpoint(opts.otlp_endpoint.clone());
    }
    telemetry.init()?;

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let weather = WeatherClient::new(http_client, &opts.weather_url).unwrap_or_else(|e| {
        tracing::error!(message = "invalid weather service URL", error = %e);
        process::exit(1)
    });

    let state = Arc::new(RecommendationState::new(weather, RuleTable::new()));
    let app = recommendations::router(state);

    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(
        message = "server started",
        address = %opts.bind,
        weather_url = %opts.weather_url,
        trace_export = !opts.no_trace_export,
    );
    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown");
    telemetry.shutdown();
    Ok(())
}
