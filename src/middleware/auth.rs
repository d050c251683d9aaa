use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::{Caller, Role};

/// Session token claims. Tokens are issued elsewhere and only verified here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::new(claims.sub, claims.role)
    }
}

/// HS256 verifier shared by every request
#[derive(Clone)]
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    /// An empty secret yields a verifier that rejects every token.
    pub fn new(secret: &str) -> Self {
        let key = (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes()));
        Self { key, validation: Validation::new(Algorithm::HS256) }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("JWT secret not configured"))?;
        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Invalid JWT token: {}", e)))
    }
}

/// Resolve the caller from the Authorization header and attach it to the
/// request. No header means an anonymous caller; a bad token is a 401.
pub async fn caller_middleware(
    State(verifier): State<TokenVerifier>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match extract_jwt_from_headers(&headers)? {
        Some(token) => Caller::from(verifier.verify(&token)?),
        None => Caller::anonymous(),
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, claims: &Claims) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims(role: Role) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims { sub: Uuid::new_v4(), role, exp: now + 3600, iat: now }
    }

    #[test]
    fn verifies_tokens_signed_with_the_shared_secret() {
        let verifier = TokenVerifier::new("s3cret");
        let c = claims(Role::Therapist);
        let verified = verifier.verify(&token("s3cret", &c)).unwrap();
        assert_eq!(verified.sub, c.sub);
        assert_eq!(verified.role, Role::Therapist);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let verifier = TokenVerifier::new("s3cret");
        assert!(verifier.verify(&token("other", &claims(Role::Admin))).is_err());

        let mut expired = claims(Role::Individual);
        expired.exp = chrono::Utc::now().timestamp() - 3600;
        assert!(verifier.verify(&token("s3cret", &expired)).is_err());
    }

    #[test]
    fn empty_secret_rejects_everything() {
        let verifier = TokenVerifier::new("");
        let err = verifier.verify(&token("x", &claims(Role::Admin))).unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }

    #[test]
    fn header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap().as_deref(), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_jwt_from_headers(&headers).is_err());
    }
}
