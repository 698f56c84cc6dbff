//! Gate responses.
//!
//! # Responsibilities
//! - Map every gate rejection to a well-formed response
//! - Build the temporary redirect to the admin host
//!
//! # Design Decisions
//! - JSON bodies carry `success: false` for programmatic callers
//! - No internal detail (reasons, key names) ever reaches the client
//! - 429 always carries `Retry-After`

use axum::http::header::{LOCATION, RETRY_AFTER};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::routing::RouteClass;
use crate::security::{OriginRejection, Unauthorized};

/// Body of every JSON rejection.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            success: false,
            error,
            retry_after: None,
        }
    }
}

/// Terminal outcome of a gate check that stops the request.
#[derive(Debug, thiserror::Error)]
pub enum GateRejection {
    #[error("rate limited on {class} routes")]
    RateLimited { class: RouteClass, retry_after_secs: u64 },

    /// Also covers malformed origin input, which fails closed.
    #[error("bad origin: {0}")]
    BadOrigin(#[from] OriginRejection),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] Unauthorized),

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GateRejection::BadOrigin(_) => StatusCode::FORBIDDEN,
            GateRejection::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GateRejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GateRejection::RateLimited {
                class,
                retry_after_secs,
            } => {
                let retry_after = HeaderValue::from(retry_after_secs);
                let mut response = match class {
                    RouteClass::Admin => (status, "Too Many Requests").into_response(),
                    RouteClass::Api => (
                        status,
                        Json(ErrorBody {
                            retry_after: Some(retry_after_secs),
                            ..ErrorBody::new("Too Many Requests")
                        }),
                    )
                        .into_response(),
                };
                response.headers_mut().insert(RETRY_AFTER, retry_after);
                response
            }
            GateRejection::BadOrigin(_) => (status, Json(ErrorBody::new("Bad origin"))).into_response(),
            GateRejection::Unauthorized(_) => {
                (status, Json(ErrorBody::new("Unauthorized"))).into_response()
            }
            GateRejection::Internal(_) => {
                (status, Json(ErrorBody::new("Internal Server Error"))).into_response()
            }
        }
    }
}

/// 302 to `target`. A target that is not a valid header value fails closed.
pub fn redirect(target: &str) -> Response {
    match HeaderValue::try_from(target) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!("Redirect target is not a valid Location header");
            GateRejection::Internal("invalid redirect target").into_response()
        }
    }
}
