use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::validation::validate_account_id;

pub const FARMER_ACCOUNT_HEADER: &str = "x-farmer-account";

/// Verified farmer identity for the current request.
///
/// Session handling lives in front of this service: the auth layer verifies
/// the farmer's session and forwards the resolved account id in
/// `x-farmer-account`. Handlers take the identity as an extractor argument
/// and pass it explicitly into the orchestrator; nothing below the handler
/// resolves identity on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmerIdentity(pub String);

impl FarmerIdentity {
    pub fn account_id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for FarmerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get(FARMER_ACCOUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing farmer identity".to_string()))?;

        validate_account_id(account_id)
            .map_err(|err| AppError::Unauthorized(format!("invalid farmer identity: {err}")))?;

        Ok(FarmerIdentity(account_id.trim().to_string()))
    }
}
