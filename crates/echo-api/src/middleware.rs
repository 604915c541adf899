use axum::{
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use echo_types::api::Claims;
use echo_types::models::{UserContext, Viewer};

fn jwt_secret() -> String {
    std::env::var("ECHO_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into())
}

fn decode_claims(token: &str) -> Result<Claims, StatusCode> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StatusCode::UNAUTHORIZED)
}

fn bearer_token(req: &Request) -> Option<Result<&str, StatusCode>> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    Some(header.strip_prefix("Bearer ").ok_or(StatusCode::UNAUTHORIZED))
}

pub fn viewer_from(claims: &Claims) -> Viewer {
    Viewer::User(UserContext {
        id: claims.sub,
        moderator: claims.moderator,
    })
}

/// Extract and validate JWT from Authorization header. Rejects requests
/// without one.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)??;
    let claims = decode_claims(token)?;

    req.extensions_mut().insert(viewer_from(&claims));
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Resolve the viewer for read endpoints that also serve signed-out users.
/// No Authorization header means anonymous; a header that is present but
/// invalid is still rejected rather than silently downgraded.
pub async fn attach_viewer(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let viewer = match bearer_token(&req) {
        None => Viewer::Anonymous,
        Some(token) => viewer_from(&decode_claims(token?)?),
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}
