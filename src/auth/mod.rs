/*!
 * # Authentication and Authorization Module
 *
 * Bearer tokens are issued by the external identity service; this module only
 * validates them (HS256, issuer and audience checked) and turns the claims
 * into an [`Actor`] that handlers and services use for authorization.
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod rbac;

pub use rbac::{Action, ActorRole};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub role: ActorRole,          // Single role per principal
    pub office_id: Option<Uuid>,  // Home office for staff roles
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// Authenticated principal extracted from the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
    pub office_id: Option<Uuid>,
}

impl Actor {
    pub fn new(user_id: Uuid, role: ActorRole, office_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            role,
            office_id,
        }
    }

    /// The actor's home office, or `Forbidden` when the token carries none.
    pub fn require_office(&self) -> Result<Uuid, ServiceError> {
        self.office_id.ok_or_else(|| {
            ServiceError::Forbidden(format!("{} {} has no office assigned", self.role, self.user_id))
        })
    }

    pub fn ensure(&self, action: Action) -> Result<(), ServiceError> {
        if self.role.permits(action) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {} may not perform {:?}",
                self.role, action
            )))
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            issuer: cfg.auth_issuer.clone(),
            audience: cfg.auth_audience.clone(),
        }
    }
}

/// Validates bearer tokens
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            decoding_key,
        }
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        Ok(claims)
    }

    pub fn authenticate(&self, token: &str) -> Result<Actor, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Actor::new(user_id, claims.role, claims.office_id))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::MissingAuth | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that validates the bearer token and stores the [`Actor`]
pub async fn auth_middleware(
    Extension(auth_service): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingAuth)?;

    let actor = auth_service.authenticate(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        e
    })?;
    debug!(user_id = %actor.user_id, role = %actor.role, "authenticated request");

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Rejects actors whose role does not permit the route group's action
pub async fn action_middleware(
    State(action): State<Action>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or(AuthError::MissingAuth)?;

    if !actor.role.permits(action) {
        warn!(user_id = %actor.user_id, role = %actor.role, ?action, "action denied");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_action(self, action: Action) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_action(self, action: Action) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            action,
            action_middleware,
        ))
        .with_auth()
    }
}
