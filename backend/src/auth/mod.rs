use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "admin_session";
pub const ADMIN_USER_TYPE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub user_type: String,
    pub exp: usize,
}

/// Authenticated admin for the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub user_id: Uuid,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct AdminAuthKeys {
    decoding_key: DecodingKey,
    login_url: String,
}

impl AdminAuthKeys {
    pub fn new(jwt_secret: &str, login_url: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            login_url: login_url.into(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn validate_admin_jwt(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let validation = Validation::new(jsonwebtoken::Algorithm::HS256);

        let token_data = decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

        Ok(token_data.claims)
    }

    /// Validates the token and requires an admin user with a UUID subject.
    pub fn authenticate(&self, token: &str) -> Result<AdminSession, AuthError> {
        let claims = self.validate_admin_jwt(token)?;

        if claims.user_type != ADMIN_USER_TYPE {
            return Err(anyhow::anyhow!("user type {} is not allowed", claims.user_type).into());
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| anyhow::anyhow!("Invalid user ID in token"))?;

        Ok(AdminSession { user_id })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    Arc<AdminAuthKeys>: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<AdminAuthKeys>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            warn!(path = %parts.uri.path(), "auth: missing admin session cookie");
            return Err(Redirect::to(keys.login_url()));
        };

        keys.authenticate(cookie.value()).map_err(|err| {
            warn!(path = %parts.uri.path(), error = %err, "auth: admin session rejected");
            Redirect::to(keys.login_url())
        })
    }
}
