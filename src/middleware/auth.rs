use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Identity attached to every request. `None` for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester(pub Option<String>);

impl Requester {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Clone)]
pub struct AuthState {
    secret: Arc<str>,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            secret: Arc::from(jwt_secret),
        }
    }
}

fn unauthorized(message: &str) -> Response {
    Error::Unauthorized(message.to_string()).into_response()
}

/// Accepts anonymous requests. A request that does present a bearer token
/// must present a valid one.
pub async fn optional_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        req.extensions_mut().insert(Requester(None));
        return next.run(req).await;
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("Authorization header is not valid text");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("Only bearer tokens are supported");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) if !data.claims.sub.trim().is_empty() => {
            req.extensions_mut()
                .insert(Requester(Some(data.claims.sub.trim().to_string())));
            next.run(req).await
        }
        Ok(_) => unauthorized("Token has no subject"),
        Err(err) => {
            tracing::debug!(error = %err, "Rejected bearer token");
            unauthorized("Token is invalid or expired")
        }
    }
}
