//! Bearer-token authentication and per-prefix role gates.

use crate::error::ApiError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use corehub_core::access::{Principal, Role};
use corehub_core::account::model::User;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    pub exp: usize,
}

/// Signing and verification keys for access tokens.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl AuthKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours: ttl_hours.max(1),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = chrono::Utc::now() + chrono::Duration::hours(self.ttl_hours);
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            admin_id: user.admin_id.clone(),
            exp: exp.timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;
        let claims = data.claims;
        Ok(Principal::new(claims.sub, claims.role, claims.admin_id))
    }
}

fn bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the bearer token into a [`Principal`] request extension.
pub async fn authenticate(
    State(keys): State<Arc<AuthKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer(&request)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    let principal = keys.verify(token)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Allow only the listed roles through. Runs after [`authenticate`].
pub async fn require_roles(
    State(roles): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    if !roles.contains(&principal.role) {
        return Err(ApiError::Forbidden(format!(
            "Role {} cannot access this endpoint",
            principal.role.as_str()
        )));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, admin_id: Option<&str>) -> User {
        User {
            id: "u-1".into(),
            role,
            name: "Meera".into(),
            email: "meera@example.com".into(),
            phone: None,
            admin_id: admin_id.map(Into::into),
            super_admin_id: None,
            company_name: None,
            enquiry_slug: None,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = AuthKeys::new("test-secret", 2);
        let token = keys.issue(&user(Role::Ops, Some("adm-1"))).unwrap();
        let principal = keys.verify(&token).unwrap();
        assert_eq!(principal, Principal::new("u-1", Role::Ops, Some("adm-1".into())));
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = AuthKeys::new("one", 2).issue(&user(Role::Admin, None)).unwrap();
        let err = AuthKeys::new("two", 2).verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
