// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Mapping from store errors onto HTTP statuses and the shared error body.

use crate::error::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use observix_model::api::{ErrorBody, ErrorCode};

/// Wrapper turning catalog failures into HTTP responses, so handlers can
/// propagate them with `?`.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// A store operation failed.
    Store(StoreError),
    /// The request body did not deserialize into the expected shape.
    InvalidBody {
        /// What the deserializer rejected.
        message: String,
    },
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::InvalidBody {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Store(e) => {
                let (status, code) = match &e {
                    StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
                    StoreError::DuplicateAssignment { .. } => {
                        (StatusCode::CONFLICT, ErrorCode::Conflict)
                    }
                    StoreError::InvalidSpec(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidSpec),
                    StoreError::Backend { .. } => {
                        tracing::error!(error = %e, "store failure");
                        (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StoreError)
                    }
                };
                (status, code, e.to_string())
            }
            ApiError::InvalidBody { message } => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidSpec, message)
            }
        };
        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}
