//! Authenticated caller identity

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Caller identity established by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    email: Option<String>,
    roles: Vec<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            roles: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// True when `allowed` is empty or the principal holds one of its roles
    pub fn has_any_role(&self, allowed: &[String]) -> bool {
        allowed.is_empty() || self.roles.iter().any(|r| allowed.contains(r))
    }
}

/// Turns a bearer credential into a principal
pub trait PrincipalVerifier: Send + Sync + Debug {
    fn verify(&self, token: &str) -> Result<Principal, DomainError>;
}
