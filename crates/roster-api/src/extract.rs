//! Request extractors.
//!
//! [`Caller`] builds the [`RequestContext`] for a request: the principal
//! from `X-Principal-Id` (absent means "no principal"), the configured
//! request deadline and a cancellation signal tied to server shutdown.
//! [`IfMatch`] decodes the version token a conditional write presents.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::IF_MATCH;
use axum::http::request::Parts;
use roster_core::RequestContext;
use roster_types::{PrincipalId, VersionToken};

use crate::error::ApiError;
use crate::etag::parse_etag;
use crate::state::AppState;

/// Header carrying the caller's principal id.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// The ambient context of one request.
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let mut ctx = RequestContext::new().with_cancellation(state.shutdown.child_token());
        if let Some(timeout) = state.request_timeout {
            ctx = ctx.with_timeout(timeout);
        }

        if let Some(raw) = parts.headers.get(PRINCIPAL_HEADER) {
            let id: i64 = raw
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| ApiError::BadRequest(format!("{PRINCIPAL_HEADER} must be an integer")))?;
            ctx = ctx.with_principal(PrincipalId(id));
        }

        Ok(Self(ctx))
    }
}

/// The version token from a required `If-Match` header.
#[derive(Debug, Clone, Copy)]
pub struct IfMatch(pub VersionToken);

impl<S: Send + Sync> FromRequestParts<S> for IfMatch {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IF_MATCH)
            .ok_or(ApiError::PreconditionMissing)?
            .to_str()
            .map_err(|e| ApiError::BadRequest(format!("If-Match: {e}")))?;
        Ok(Self(parse_etag(raw)?))
    }
}
