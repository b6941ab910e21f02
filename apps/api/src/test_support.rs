//! Fixtures shared by handler and client tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::SessionVerifier;
use crate::errors::AppError;
use crate::models::user::{User, UserId};
use crate::profile::MemoryProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

pub const ADA_TOKEN: &str = "sess_ada";

/// Fixed token → user table.
pub struct StaticSessions(pub HashMap<String, UserId>);

#[async_trait]
impl SessionVerifier for StaticSessions {
    async fn verify(&self, session_token: &str) -> Result<Option<UserId>, AppError> {
        Ok(self.0.get(session_token).cloned())
    }
}

pub fn ada() -> User {
    User {
        id: UserId::from("user_ada"),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
    }
}

/// State with one known user (`ada`) signed in under `ADA_TOKEN`.
pub fn test_state() -> (AppState, Arc<MemoryProfileStore>) {
    let profiles = Arc::new(MemoryProfileStore::with_users([ada()]));
    let sessions = StaticSessions(HashMap::from([(ADA_TOKEN.to_string(), ada().id)]));
    let state = AppState {
        profiles: profiles.clone(),
        sessions: Arc::new(sessions),
    };
    (state, profiles)
}

/// Serves the full router on an ephemeral local port.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("test server");
    });
    addr
}
