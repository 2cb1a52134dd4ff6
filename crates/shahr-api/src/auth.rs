//! API authentication via bearer tokens.
//!
//! Login hands out a random token; protected endpoints look it up in the
//! session table through the [`require_auth`] middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::error::ApiError;
use crate::state::{AppState, UserSession};

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Clone)]
pub struct AuthContext {
    pub token: String,
    pub session: UserSession,
}

/// Middleware that validates Bearer token authentication.
///
/// Extracts the token from `Authorization: Bearer <token>` and looks it up
/// in `AppState.sessions`. Returns 401 if missing or unknown.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    match state.session(&token) {
        Ok(Some(session)) => {
            req.extensions_mut().insert(AuthContext { token, session });
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthorized("Invalid bearer token".to_string()).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn bearer_token(req: &Request) -> Result<String, ApiError> {
    let value = req
        .headers()
        .get("authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = value.to_str().map_err(|_| {
        ApiError::Unauthorized("Invalid Authorization header encoding".to_string())
    })?;
    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = Request::builder()
            .header("authorization", "Bearer abc123")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).unwrap(), "abc123");

        let req = Request::builder()
            .header("authorization", "Basic abc123")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(bearer_token(&req).is_err());

        let req = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert!(bearer_token(&req).is_err());
    }
}
