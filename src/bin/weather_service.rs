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
use std::error::Error;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tracing::Level;
use weather_stack::http::shutdown_signal;
use weather_stack::predictor::WeatherPredictor;
use weather_stack::telemetry::Telemetry;
use weather_stack::weather::{self, WeatherState};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8000);

#[derive(Debug, Parser)]
#[clap(name = "weather_service", version = clap::crate_version!())]
struct WeatherServiceApplication {
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
    let opts = WeatherServiceApplication::parse();
    let telemetry = Telemetry::new("weather-service", opts.log_level);
    telemetry.init()?;

    let state = Arc::new(WeatherState::new(WeatherPredictor::new()));
    let app = weather::router(state);

    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(message = "server started", address = %opts.bind);
    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}
