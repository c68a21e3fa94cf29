use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::extract::Request;

use crate::domain::{Identity, IdentityRole};
use crate::state::AppState;

/// Extracts the `Authorization: Bearer <token>` header, verifies it,
/// and inserts the resulting `Identity` into request extensions so
/// handlers can pull it out via `Identity` itself as an extractor.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.strip_prefix("Bearer ").ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state.jwt_manager.validate_token(token).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let identity = claims_to_identity(&claims).map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn claims_to_identity(claims: &super::jwt::Claims) -> Result<Identity, uuid::Error> {
    let id = uuid::Uuid::parse_str(&claims.sub)?;
    let role = match claims.role.as_str() {
        "viewer" => IdentityRole::Viewer,
        "editor" => IdentityRole::Editor,
        "owner" => IdentityRole::Owner,
        "admin" => IdentityRole::Admin,
        "service" => IdentityRole::Service,
        _ => IdentityRole::Viewer,
    };
    Ok(Identity { id, role, exp: claims.exp as i64 })
}

/// Pulls the `Identity` the middleware stashed in request extensions.
/// A handler that declares `identity: Identity` as an argument gets
/// the already-verified caller; there is no way to construct one
/// inside a handler body.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().ok_or(StatusCode::UNAUTHORIZED)
    }
}
