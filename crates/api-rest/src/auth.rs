use crate::error::ApiError;
use crate::AppState;
use api_shared::parse_basic_authorization;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use his_core::models::accounts::Account;

/// The account authenticated by the request's Basic credentials.
pub struct Actor(pub Account);

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let credentials = parse_basic_authorization(header).map_err(|e| {
            tracing::debug!("rejected authorization header: {e}");
            ApiError::Unauthorized
        })?;

        let account = state
            .services
            .auth
            .authenticate(&credentials.username, &credentials.password)?;
        Ok(Self(account))
    }
}
