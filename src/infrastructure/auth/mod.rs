//! Authentication infrastructure module

mod jwt;

pub use jwt::{AuthConfig, JwtClaims, JwtPrincipalVerifier, DEFAULT_JWT_SECRET};

#[cfg(test)]
pub(crate) use jwt::test_support;
