use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

#[derive(Clone, Default)]
pub struct IngressAuth {
    pub bearer: Option<String>,
}

/// Simple bearer token check on `Authorization: Bearer <TOKEN>`
pub async fn verify_bearer(req: Request<Body>, next: Next) -> Response {
    let cfg = req
        .extensions()
        .get::<IngressAuth>()
        .cloned()
        .unwrap_or_default();
    if let Some(token) = cfg.bearer {
        let ok = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .is_some_and(|provided| provided == token);
        if !ok {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    next.run(req).await
}
