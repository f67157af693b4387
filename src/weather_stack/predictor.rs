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

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Locations a prediction is made for when the caller doesn't pick one.
pub const LOCATIONS: [&str; 5] = ["New York", "Los Angeles", "London", "Tokyo", "Sydney"];

const TEMPERATURE_CELSIUS: (f64, f64) = (-10.0, 40.0);
const HUMIDITY_PERCENT: (f64, f64) = (20.0, 100.0);
const PRESSURE_HPA: (f64, f64) = (980.0, 1040.0);
const WIND_SPEED_KMH: (f64, f64) = (0.0, 50.0);
const PRECIPITATION_MM: (f64, f64) = (0.0, 10.0);

/// Categorical weather label that drives activity recommendations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Foggy,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Sunny,
        Condition::Cloudy,
        Condition::Rainy,
        Condition::Snowy,
        Condition::Foggy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::Foggy => "foggy",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown weather condition {0}")]
pub struct UnknownCondition(pub String);

impl FromStr for Condition {
    type Err = UnknownCondition;

    /// Parse a condition, ignoring case (`"Rainy"` and `"rainy"` are the same).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownCondition(s.to_owned()))
    }
}

/// A single made up weather prediction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub pressure_hpa: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub condition: Condition,
}

/// Generator of pseudo-random weather readings.
///
/// Every numeric field is drawn independently and uniformly from a fixed range
/// and rounded to two decimal places. The condition is drawn independently of
/// the numbers, so a "snowy" reading at 35°C is entirely possible.
#[derive(Debug, Clone, Default)]
pub struct WeatherPredictor;

impl WeatherPredictor {
    pub fn new() -> Self {
        WeatherPredictor
    }

    /// Locations that may be picked when no location is requested.
    pub fn locations(&self) -> &'static [&'static str] {
        &LOCATIONS
    }

    /// Make a prediction for `location` or a random catalog location, using
    /// the thread-local random number generator.
    pub fn predict(&self, location: Option<&str>) -> WeatherReading {
        self.predict_with(&mut rand::thread_rng(), location)
    }

    /// Make a prediction using the provided source of randomness.
    pub fn predict_with<R: Rng + ?Sized>(&self, rng: &mut R, location: Option<&str>) -> WeatherReading {
        let location = match location {
            Some(l) => l.to_owned(),
            None => LOCATIONS[rng.gen_range(0..LOCATIONS.len())].to_owned(),
        };

        WeatherReading {
            location,
            timestamp: Utc::now(),
            temperature_celsius: uniform(rng, TEMPERATURE_CELSIUS),
            humidity_percent: uniform(rng, HUMIDITY_PERCENT),
            pressure_hpa: uniform(rng, PRESSURE_HPA),
            wind_speed_kmh: uniform(rng, WIND_SPEED_KMH),
            precipitation_mm: uniform(rng, PRECIPITATION_MM),
            condition: Condition::ALL[rng.gen_range(0..Condition::ALL.len())],
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64)) -> f64 {
    round2(rng.gen_range(low..=high))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
