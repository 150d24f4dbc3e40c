//! Authentication and authorization.
//!
//! Tokens are issued by the identity provider; this service only validates
//! them and enforces role/permission gates. The `master_admin` role bypasses
//! permission checks entirely.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

mod permissions;

pub use permissions::consts;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,                  // Subject (user ID)
    pub name: Option<String>,         // User's name
    pub email: Option<String>,        // User's email
    pub role: String,                 // User's role name
    pub permissions: Vec<String>,     // User's explicit permissions
    pub client_id: Option<String>,    // Tenant scope
    pub jti: String,                  // JWT ID
    pub iat: i64,                     // Issued at time
    pub exp: i64,                     // Expiration time
    pub iss: String,                  // Issuer
    pub aud: String,                  // Audience
}

/// Authenticated user data extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub client_id: Option<String>,
}

impl AuthUser {
    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Check if the user belongs to a specific client tenant
    pub fn belongs_to_client(&self, client_id: &str) -> bool {
        self.client_id.as_ref().map_or(false, |cid| cid == client_id)
    }

    /// Master admins bypass all permission checks
    pub fn is_master_admin(&self) -> bool {
        self.role == "master_admin"
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    ExpiredToken,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AuthError::InvalidToken(_) | AuthError::ExpiredToken => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AuthError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

/// Validates bearer tokens against the configured secret, issuer, and audience.
#[derive(Clone)]
pub struct AuthVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthVerifier {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

fn user_from_claims(claims: Claims) -> AuthUser {
    AuthUser {
        user_id: claims.sub,
        name: claims.name,
        email: claims.email,
        role: claims.role,
        permissions: claims.permissions,
        client_id: claims.client_id,
    }
}

/// Authentication middleware that validates the bearer token and stores the
/// resulting `AuthUser` in request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AuthError> {
    let verifier = request
        .extensions()
        .get::<Arc<AuthVerifier>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("auth verifier not available".to_string()))?;

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingAuth)?;

    let claims = verifier.validate_token(token)?;
    request.extensions_mut().insert(user_from_claims(claims));

    Ok(next.run(request).await)
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if user.is_master_admin() {
        return Ok(next.run(request).await);
    }

    if !user.has_permission(&required_permission) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_for_auth_unit_tests_only";

    fn make_claims(exp_offset: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: "user-1".into(),
            name: Some("Test User".into()),
            email: Some("test@example.com".into()),
            role: "estimator".into(),
            permissions: vec!["estimates:read".into()],
            client_id: Some("client-1".into()),
            jti: "jti-1".into(),
            iat: now,
            exp: now + exp_offset,
            iss: "effibuild-api".into(),
            aud: "effibuild".into(),
        }
    }

    fn sign(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let verifier = AuthVerifier::new(SECRET, "effibuild-api", "effibuild");
        let token = sign(&make_claims(3600));

        let claims = verifier.validate_token(&token).expect("token should verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.permissions, vec!["estimates:read".to_string()]);
    }

    #[test]
    fn expired_token_rejected() {
        let verifier = AuthVerifier::new(SECRET, "effibuild-api", "effibuild");
        let token = sign(&make_claims(-3600));

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn wrong_audience_rejected() {
        let verifier = AuthVerifier::new(SECRET, "effibuild-api", "other-audience");
        let token = sign(&make_claims(3600));

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn master_admin_bypasses_permissions() {
        let user = AuthUser {
            user_id: "u".into(),
            name: None,
            email: None,
            role: "master_admin".into(),
            permissions: vec![],
            client_id: None,
        };
        assert!(user.is_master_admin());
        assert!(!user.has_permission("estimates:read"));
    }

    #[test]
    fn tenant_membership_check() {
        let user = AuthUser {
            user_id: "u".into(),
            name: None,
            email: None,
            role: "estimator".into(),
            permissions: vec![],
            client_id: Some("client-1".into()),
        };
        assert!(user.belongs_to_client("client-1"));
        assert!(!user.belongs_to_client("client-2"));
    }
}
