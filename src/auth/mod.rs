// ============================================================================
// Auth - bearer token verification
// ============================================================================
//
// Turns `Authorization: Bearer <jwt>` into a Principal. Tokens are HS256,
// signed elsewhere; this service only verifies them.
//
// ============================================================================

use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::{ready, Ready};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    Buyer,
    Seller,
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalType::Buyer => f.write_str("buyer"),
            PrincipalType::Seller => f.write_str("seller"),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: String,
    pub principal_type: PrincipalType,
}

impl Principal {
    pub fn new(principal_id: impl Into<String>, principal_type: PrincipalType) -> Self {
        Self {
            principal_id: principal_id.into(),
            principal_type,
        }
    }

    /// Fails with `Forbidden` unless the caller is of kind `required`.
    pub fn require(&self, required: PrincipalType) -> Result<(), AuthError> {
        if self.principal_type == required {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "{} access required, caller is a {}",
                required, self.principal_type
            )))
        }
    }
}

/// Token payload. Older tokens carry the id as `sellerId` / `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "sellerId", alias = "userId")]
    pub sub: String,
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

pub struct JwtVerifier {
    #[cfg(test)]
    secret: Vec<u8>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            #[cfg(test)]
            secret: secret.to_vec(),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Unauthorized("token expired".to_string()),
                ErrorKind::InvalidSignature => AuthError::Unauthorized("invalid signature".to_string()),
                _ => AuthError::Unauthorized(format!("invalid token: {e}")),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::Unauthorized("token has no subject".to_string()));
        }
        Ok(Principal::new(data.claims.sub, data.claims.principal_type))
    }

    /// Sign a token for `principal`. Only used where this service has to
    /// mint its own tokens (tests).
    #[cfg(test)]
    pub fn issue(&self, principal: &Principal, ttl: chrono::Duration) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = Claims {
            sub: principal.principal_id.clone(),
            principal_type: principal.principal_type,
            exp: (chrono::Utc::now() + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .expect("HS256 encoding cannot fail with a byte secret")
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: String,
}

/// Bearer header first; browsers' EventSource cannot set headers, so
/// `?access_token=` is accepted as a fallback.
fn bearer_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    from_header.or_else(|| {
        web::Query::<TokenQuery>::from_query(req.query_string())
            .ok()
            .map(|q| q.into_inner().access_token)
    })
}

fn authenticate(req: &HttpRequest) -> Result<Principal, ApiError> {
    let verifier = req
        .app_data::<web::Data<JwtVerifier>>()
        .ok_or_else(|| ApiError::internal("token verifier not configured"))?;

    let token = bearer_token(req)
        .ok_or_else(|| AuthError::Unauthorized("missing bearer token".to_string()))?;

    verifier.verify(&token).map_err(|e| {
        tracing::warn!(path = %req.path(), error = %e, "Rejected request token");
        ApiError::from(e)
    })
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::Duration;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_verify_round_trip() {
        let verifier = JwtVerifier::new(SECRET);
        let seller = Principal::new("s1", PrincipalType::Seller);

        let token = verifier.issue(&seller, Duration::minutes(5));
        assert_eq!(verifier.verify(&token).unwrap(), seller);
    }

    #[test]
    fn test_expired_and_foreign_tokens_are_unauthorized() {
        let verifier = JwtVerifier::new(SECRET);
        let buyer = Principal::new("b1", PrincipalType::Buyer);

        let expired = verifier.issue(&buyer, Duration::minutes(-10));
        assert!(matches!(verifier.verify(&expired), Err(AuthError::Unauthorized(_))));

        let foreign = JwtVerifier::new(b"another-secret-entirely-different-key").issue(&buyer, Duration::minutes(5));
        assert!(matches!(verifier.verify(&foreign), Err(AuthError::Unauthorized(_))));

        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_legacy_claim_names() {
        let claims: Claims =
            serde_json::from_str(r#"{"sellerId":"s7","type":"seller","exp":4102444800}"#).unwrap();
        assert_eq!(claims.sub, "s7");
        assert_eq!(claims.principal_type, PrincipalType::Seller);
    }

    #[test]
    fn test_require_principal_type() {
        let buyer = Principal::new("b1", PrincipalType::Buyer);
        assert!(buyer.require(PrincipalType::Buyer).is_ok());
        assert!(matches!(buyer.require(PrincipalType::Seller), Err(AuthError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn test_extractor_reads_header_or_query() {
        let verifier = web::Data::new(JwtVerifier::new(SECRET));
        let buyer = Principal::new("b1", PrincipalType::Buyer);
        let token = verifier.issue(&buyer, Duration::minutes(5));

        let req = TestRequest::default()
            .app_data(verifier.clone())
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(authenticate(&req).unwrap(), buyer);

        let req = TestRequest::with_uri(&format!("/api/events?access_token={token}"))
            .app_data(verifier.clone())
            .to_http_request();
        assert_eq!(authenticate(&req).unwrap(), buyer);

        let req = TestRequest::default().app_data(verifier).to_http_request();
        assert!(authenticate(&req).is_err());
    }
}
