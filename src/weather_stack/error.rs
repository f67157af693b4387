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

use crate::client::ClientError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned for every failed request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        ErrorResponse { error: error.into() }
    }
}

/// Failures that can be reported to callers of one of the services.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to get weather data: {0}")]
    UpstreamUnavailable(#[source] ClientError),

    #[error("missing required query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid request body: {0}")]
    InvalidPayload(String),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingParameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidPayload(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
