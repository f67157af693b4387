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

use crate::client::{ClientError, RecommendationsClient, WeatherClient};
use clap::ValueEnum;
use rand::Rng;
use std::time::Duration;

/// Cities requests are made for when no location is given.
pub const CITIES: [&str; 15] = [
    "Mumbai",
    "London",
    "Tokyo",
    "Paris",
    "Berlin",
    "Sydney",
    "Toronto",
    "Dubai",
    "Singapore",
    "Seattle",
    "NewYork",
    "Boston",
    "Chicago",
    "Miami",
    "LosAngeles",
];

/// Which services to send traffic to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Weather,
    Recommendations,
    Both,
}

impl Target {
    pub fn weather(&self) -> bool {
        matches!(self, Self::Weather | Self::Both)
    }

    pub fn recommendations(&self) -> bool {
        matches!(self, Self::Recommendations | Self::Both)
    }
}

/// Makes a fixed number of requests to the demo services so that their
/// metrics, logs, and traces have something in them.
#[derive(Debug)]
pub struct TrafficGenerator {
    weather: WeatherClient,
    recommendations: RecommendationsClient,
    iterations: u32,
    interval: Duration,
}

impl TrafficGenerator {
    pub fn new(
        weather: WeatherClient,
        recommendations: RecommendationsClient,
        iterations: u32,
        interval: Duration,
    ) -> Self {
        TrafficGenerator {
            weather,
            recommendations,
            iterations,
            interval,
        }
    }

    /// Make sure every targeted service is up before sending it traffic.
    pub async fn check(&self, target: Target) -> Result<(), ClientError> {
        if target.weather() {
            self.weather.health().await?;
        }

        if target.recommendations() {
            self.recommendations.health().await?;
        }

        Ok(())
    }

    /// Send traffic to each targeted service in turn, weather first.
    ///
    /// Returns the number of successful requests. The first failed request
    /// ends the run.
    pub async fn run(&self, target: Target, location: Option<&str>) -> Result<u32, ClientError> {
        let mut sent = 0;

        if target.weather() {
            sent += self.weather_traffic(location).await?;
        }

        if target.recommendations() {
            sent += self.recommendations_traffic(location).await?;
        }

        Ok(sent)
    }

    async fn weather_traffic(&self, location: Option<&str>) -> Result<u32, ClientError> {
        tracing::info!(message = "generating weather requests", iterations = self.iterations);

        for i in 1..=self.iterations {
            let selected = pick_location(location);
            let res = self.weather.prediction(Some(&selected)).await.map_err(|e| {
                tracing::error!(message = "weather request failed", iteration = i, error = %e);
                e
            })?;

            tracing::info!(
                message = "weather",
                iteration = i,
                location = res.location.as_deref().unwrap_or("Unknown"),
                temperature_celsius = ?res.temperature_celsius,
                condition = ?res.condition,
            );

            self.pause(i).await;
        }

        Ok(self.iterations)
    }

    async fn recommendations_traffic(&self, location: Option<&str>) -> Result<u32, ClientError> {
        tracing::info!(message = "generating recommendations requests", iterations = self.iterations);

        for i in 1..=self.iterations {
            let selected = pick_location(location);
            let res = self.recommendations.recommendations(&selected).await.map_err(|e| {
                tracing::error!(message = "recommendations request failed", iteration = i, error = %e);
                e
            })?;

            tracing::info!(
                message = "recommendations",
                iteration = i,
                location = %res.location,
                condition = %res.weather_condition,
                best_activity = ?res.best_activity,
            );

            self.pause(i).await;
        }

        Ok(self.iterations)
    }

    async fn pause(&self, iteration: u32) {
        if iteration < self.iterations {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// The requested location or a random one from [`CITIES`].
pub fn pick_location(location: Option<&str>) -> String {
    match location {
        Some(l) => l.to_owned(),
        None => CITIES[rand::thread_rng().gen_range(0..CITIES.len())].to_owned(),
    }
}
