//! Extractors that re-check the caller inside privileged handlers.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::gate::Gate;
use crate::http::request::RequestFacts;
use crate::http::response::GateRejection;
use crate::security::CallerSession;

/// Admin session re-derived from the request's own credentials.
#[derive(Debug, Clone)]
pub struct AdminSession(pub CallerSession);

impl<S> FromRequestParts<S> for AdminSession
where
    Arc<Gate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = Arc::<Gate>::from_ref(state);
        let facts = RequestFacts::from_parts(parts);
        gate.authorize(&parts.headers, &facts).map(AdminSession)
    }
}

/// Request whose Origin (or Referer) passed the allow-list.
#[derive(Debug, Clone, Copy)]
pub struct TrustedOrigin;

impl<S> FromRequestParts<S> for TrustedOrigin
where
    Arc<Gate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = Arc::<Gate>::from_ref(state);
        gate.check_origin(&RequestFacts::from_parts(parts))?;
        Ok(TrustedOrigin)
    }
}
