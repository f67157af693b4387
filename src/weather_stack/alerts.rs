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

use crate::error::AppError;
use crate::http::instrument;
use axum::body::Bytes;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single alert as sent by an alert manager webhook.
///
/// Nothing is required. Each field is read on its own so a missing or oddly
/// typed value only blanks that value, not the rest of the alert.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertEvent {
    pub status: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl AlertEvent {
    /// Read an alert leniently, keeping every string valued field and
    /// dropping anything else.
    pub fn from_value(value: &Value) -> Self {
        AlertEvent {
            status: value.get("status").and_then(Value::as_str).map(str::to_owned),
            labels: string_map(value.get("labels")),
            annotations: string_map(value.get("annotations")),
        }
    }

    pub fn alertname(&self) -> Option<&str> {
        self.labels.get("alertname").map(String::as_str)
    }

    pub fn severity(&self) -> Option<&str> {
        self.labels.get("severity").map(String::as_str)
    }

    pub fn instance(&self) -> Option<&str> {
        self.labels.get("instance").map(String::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.annotations.get("summary").map(String::as_str)
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

/// Alerts contained in a webhook payload. Anything other than an object with
/// an `alerts` array is treated as containing no alerts.
pub fn alerts_from_payload(payload: &Value) -> Vec<AlertEvent> {
    payload
        .get("alerts")
        .and_then(Value::as_array)
        .map(|alerts| alerts.iter().map(AlertEvent::from_value).collect())
        .unwrap_or_default()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AlertHealth {
    pub status: String,
    pub ts: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AlertReceipt {
    pub status: String,
    pub count: usize,
}

/// Build the router for the alert notifier.
pub fn router() -> Router {
    instrument(
        Router::new()
            .route("/health", get(health))
            .route("/alerts", post(receive)),
    )
}

async fn health() -> Json<AlertHealth> {
    Json(AlertHealth {
        status: "ok".to_owned(),
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
    })
}

async fn receive(body: Bytes) -> Result<Json<AlertReceipt>, AppError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| AppError::InvalidPayload(e.to_string()))?;
    let alerts = alerts_from_payload(&payload);

    for alert in &alerts {
        tracing::info!(
            message = "ALERT",
            alertname = alert.alertname().unwrap_or_default(),
            status = alert.status.as_deref().unwrap_or_default(),
            severity = alert.severity().unwrap_or_default(),
            instance = alert.instance().unwrap_or_default(),
            summary = alert.summary().unwrap_or_default(),
        );
    }

    let raw = serde_json::to_string_pretty(&payload).unwrap_or_default();
    tracing::info!(message = "RAW_PAYLOAD", payload = %raw);

    Ok(Json(AlertReceipt {
        status: "received".to_owned(),
        count: alerts.len(),
    }))
}
