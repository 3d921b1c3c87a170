//! Per-request caller context

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use core_kernel::OperationMetadata;

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::middleware::REQUEST_ID_HEADER;

/// The authenticated caller and the metadata passed down to the service
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub claims: Claims,
    pub metadata: OperationMetadata,
}

impl RequestContext {
    /// Fails with 403 unless the caller holds `permission`
    pub fn require(&self, permission: &str) -> Result<&OperationMetadata, ApiError> {
        auth::require(&self.claims, permission)?;
        Ok(&self.metadata)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        let correlation_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let metadata = OperationMetadata {
            correlation_id,
            initiated_by: Some(claims.sub.clone()),
        };

        Ok(Self { claims, metadata })
    }
}
