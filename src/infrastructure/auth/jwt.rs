//! Bearer JWT verification

use std::fmt::Debug;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DomainError, Principal, PrincipalVerifier};

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Claims issued by the ward application's identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authentication settings
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Expected `iss` claim, checked when set
    #[serde(default)]
    pub issuer: Option<String>,
    /// Roles permitted to call the gateway; empty admits any authenticated caller
    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: None,
            allowed_roles: Vec::new(),
        }
    }
}

impl Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[hidden]")
            .field("issuer", &self.issuer)
            .field("allowed_roles", &self.allowed_roles)
            .finish()
    }
}

impl AuthConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// HS256 verifier over a shared secret
#[derive(Clone)]
pub struct JwtPrincipalVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Debug for JwtPrincipalVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtPrincipalVerifier")
            .field("decoding_key", &"[hidden]")
            .field("issuer", &self.validation.iss)
            .finish()
    }
}

impl JwtPrincipalVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self, DomainError> {
        if config.jwt_secret.is_empty() {
            return Err(DomainError::configuration("auth.jwt_secret must not be empty"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }
}

impl PrincipalVerifier for JwtPrincipalVerifier {
    fn verify(&self, token: &str) -> Result<Principal, DomainError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            DomainError::unauthenticated("Invalid or expired token")
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(DomainError::unauthenticated("Token has no subject"));
        }

        let mut principal = Principal::new(claims.sub).with_roles(claims.roles);
        if let Some(email) = claims.email {
            principal = principal.with_email(email);
        }

        Ok(principal)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{sign, token_for, TEST_SECRET};
    use super::*;

    fn verifier() -> JwtPrincipalVerifier {
        JwtPrincipalVerifier::new(&AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_principal() {
        let principal = verifier().verify(&token_for("nurse-7", &["nurse"])).unwrap();

        assert_eq!(principal.id(), "nurse-7");
        assert_eq!(principal.email(), Some("nurse-7@ward.example"));
        assert_eq!(principal.roles(), &["nurse".to_string()]);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = JwtClaims {
            sub: "x".into(),
            email: None,
            roles: vec![],
            exp: chrono::Utc::now().timestamp() + 60,
            iss: None,
        };
        let token = sign(claims, "another-secret");

        let err = verifier().verify(&token).unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = JwtClaims {
            sub: "x".into(),
            email: None,
            roles: vec![],
            exp: chrono::Utc::now().timestamp() - 3600,
            iss: None,
        };

        assert!(verifier().verify(&sign(claims, TEST_SECRET)).is_err());
    }

    #[test]
    fn test_issuer_enforced_when_configured() {
        let verifier = JwtPrincipalVerifier::new(&AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            issuer: Some("ward-auth".to_string()),
            allowed_roles: vec![],
        })
        .unwrap();

        let mut claims = JwtClaims {
            sub: "doc-1".into(),
            email: None,
            roles: vec!["doctor".into()],
            exp: chrono::Utc::now().timestamp() + 60,
            iss: Some("someone-else".into()),
        };
        assert!(verifier.verify(&sign(claims.clone(), TEST_SECRET)).is_err());

        claims.iss = Some("ward-auth".into());
        assert!(verifier.verify(&sign(claims, TEST_SECRET)).is_ok());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verifier().verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let result = JwtPrincipalVerifier::new(&AuthConfig {
            jwt_secret: String::new(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = AuthConfig {
            jwt_secret: "super-secret".into(),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
