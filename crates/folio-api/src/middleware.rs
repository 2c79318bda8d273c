use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use folio_types::api::Claims;

use crate::auth::{AppState, verify_token};
use crate::error::ApiError;

/// Extract and validate the bearer token from the Authorization header,
/// attaching the decoded claims to the request. Performs no database access.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::MissingCredential)?;

    let claims = verify_token(&state.jwt_secret, token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Ownership check for user-resource mutations: only the authenticated
/// identity may mutate its own record. Projects and homepage deliberately
/// carry no ownership check.
pub fn ensure_owner(claims: &Claims, target_id: i64) -> Result<(), ApiError> {
    if claims.sub != target_id {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
