use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::profile::ProfileRecords;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Where CVs live. Default: the identity provider's user metadata.
    pub profiles: Arc<dyn ProfileRecords>,
    pub sessions: Arc<dyn SessionVerifier>,
}
