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
use std::process;
use std::time::Duration;
use tracing::Level;
use weather_stack::client::{RecommendationsClient, WeatherClient};
use weather_stack::telemetry::Telemetry;
use weather_stack::traffic::{Target, TrafficGenerator};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_WEATHER_URL: &str = "http://localhost:8000";
const DEFAULT_RECOMMENDATIONS_URL: &str = "http://localhost:8001";
const DEFAULT_ITERATIONS: u32 = 10;
const DEFAULT_INTERVAL_SECS: u64 = 2;
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;

/// Generate traffic to the weather and recommendations services to populate dashboards
#[derive(Debug, Parser)]
#[clap(name = "traffic_gen", version = clap::crate_version!())]
struct TrafficGenApplication {
    /// Which service to generate traffic for
    #[clap(long, short, value_enum, default_value_t = Target::Recommendations)]
    service: Target,

    /// Location to query. A random city is picked for each request if not set.
    #[clap(long, short)]
    location: Option<String>,

    /// Number of requests to make to each service
    #[clap(long = "iterations", short = 'n', default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Seconds between requests
    #[clap(long = "interval", short = 'i', default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,

    /// Base URL of the weather service
    #[clap(long, default_value_t = DEFAULT_WEATHER_URL.into())]
    weather_url: String,

    /// Base URL of the recommendations service
    #[clap(long, default_value_t = DEFAULT_RECOMMENDATIONS_URL.into())]
    recommendations_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = TrafficGenApplication::parse();
    Telemetry::new("traffic-gen", opts.log_level).init()?;

    let http_client = Client::builder()
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MILLIS))
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(message = "unable to initialize HTTP client", error = %e);
            process::exit(1)
        });

    let weather = WeatherClient::new(http_client.clone(), &opts.weather_url)?;
    let recommendations = RecommendationsClient::new(http_client, &opts.recommendations_url)?;
    let generator = TrafficGenerator::new(
        weather,
        recommendations,
        opts.iterations,
        Duration::from_secs(opts.interval),
    );

    if let Err(e) = generator.check(opts.service).await {
        tracing::error!(message = "could not connect to service, make sure it is running", error = %e);
        process::exit(1);
    }

    match generator.run(opts.service, opts.location.as_deref()).await {
        Ok(sent) => {
            tracing::info!(message = "traffic generation complete", requests = sent);
            Ok(())
        }
        Err(e) => {
            tracing::error!(message = "traffic generation failed", error = %e);
            process::exit(1)
        }
    }
}
