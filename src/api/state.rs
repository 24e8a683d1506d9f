//! Application state shared by handlers

use std::fmt;
use std::sync::Arc;

use crate::domain::audit::AuditRepository;
use crate::domain::cache::ResponseCacheRepository;
use crate::domain::PrincipalVerifier;
use crate::infrastructure::services::GatewayService;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub verifier: Arc<dyn PrincipalVerifier>,
    /// Probed by `/ready`
    pub cache: Arc<dyn ResponseCacheRepository>,
    /// Probed by `/ready`
    pub audit: Arc<dyn AuditRepository>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}
