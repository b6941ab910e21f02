//! Identity-provider REST client.
//!
//! Resolves session tokens to user ids and keeps the CV inside the user's
//! private metadata. Endpoints used:
//!
//! - `GET   /v1/sessions/{session_id}`
//! - `GET   /v1/users/{user_id}`
//! - `PATCH /v1/users/{user_id}` (`private_metadata` is replaced whole)
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::auth::SessionVerifier;
use crate::cv::CvDocument;
use crate::errors::AppError;
use crate::models::user::{User, UserId};
use crate::profile::{ProfileRecord, ProfileRecords, CV_ATTRIBUTE};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ProviderSession {
    user_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ProviderEmail {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ProviderEmail>,
    #[serde(default)]
    private_metadata: Map<String, Value>,
}

impl ProviderUser {
    /// The flagged primary address, falling back to the first one on file.
    fn primary_email(&self) -> Option<String> {
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| Some(e.id.as_str()) == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
    }

    fn into_record(mut self) -> Result<ProfileRecord, AppError> {
        let cv = match self.private_metadata.remove(CV_ATTRIBUTE) {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                AppError::Validation(format!("stored {CV_ATTRIBUTE} for {}: {e}", self.id))
            })?),
        };
        let email = self.primary_email();
        Ok(ProfileRecord {
            user: User {
                id: UserId(self.id),
                first_name: self.first_name,
                last_name: self.last_name,
                email,
            },
            cv,
        })
    }
}

/// Session ids are opaque `[A-Za-z0-9_]` strings; anything else never reaches the provider.
fn is_session_id(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, secret_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build identity provider HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_user(&self, user: &UserId) -> Result<ProviderUser, AppError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/users/{user}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "fetching user {user} returned {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SessionVerifier for IdentityClient {
    async fn verify(&self, session_token: &str) -> Result<Option<UserId>, AppError> {
        if !is_session_id(session_token) {
            debug!("Rejecting malformed session token");
            return Ok(None);
        }
        let response = self
            .client
            .get(self.url(&format!("/v1/sessions/{session_token}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "session lookup returned {status}"
            )));
        }

        let session: ProviderSession = response.json().await?;
        if session.status != "active" {
            debug!("Rejecting session in state '{}'", session.status);
            return Ok(None);
        }
        Ok(Some(UserId(session.user_id)))
    }
}

#[async_trait]
impl ProfileRecords for IdentityClient {
    async fn fetch(&self, user: &UserId) -> Result<ProfileRecord, AppError> {
        self.get_user(user).await?.into_record()
    }

    /// Read-modify-write of the whole metadata map so that keys dropped from
    /// the CV do not survive a nested merge.
    async fn store_cv(&self, user: &UserId, cv: &CvDocument) -> Result<(), AppError> {
        let mut metadata = self.get_user(user).await?.private_metadata;
        let cv = serde_json::to_value(cv).map_err(|e| AppError::Internal(e.into()))?;
        metadata.insert(CV_ATTRIBUTE.to_string(), cv);

        let response = self
            .client
            .patch(self.url(&format!("/v1/users/{user}")))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "private_metadata": metadata }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "updating user {user} returned {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode as HttpStatus},
        routing::get,
        Json, Router,
    };

    const SECRET: &str = "sk_test";

    type Provider = Arc<Mutex<Value>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer sk_test")
    }

    async fn get_user(
        State(provider): State<Provider>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<Value>, HttpStatus> {
        if !authorized(&headers) {
            return Err(HttpStatus::UNAUTHORIZED);
        }
        if id != "user_1" {
            return Err(HttpStatus::NOT_FOUND);
        }
        Ok(Json(provider.lock().unwrap().clone()))
    }

    fn deep_merge(target: &mut Value, patch: &Value) {
        match (target, patch) {
            (Value::Object(target), Value::Object(patch)) => {
                for (k, v) in patch {
                    deep_merge(target.entry(k.clone()).or_insert(Value::Null), v);
                }
            }
            (target, patch) => *target = patch.clone(),
        }
    }

    // The provider deep-merges nested objects on this endpoint.
    async fn patch_metadata(
        State(provider): State<Provider>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> HttpStatus {
        if !authorized(&headers) {
            return HttpStatus::UNAUTHORIZED;
        }
        let mut user = provider.lock().unwrap();
        if let Some(patch) = body.get("private_metadata") {
            deep_merge(&mut user["private_metadata"], patch);
        }
        HttpStatus::OK
    }

    async fn patch_user(
        State(provider): State<Provider>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> HttpStatus {
        if !authorized(&headers) {
            return HttpStatus::UNAUTHORIZED;
        }
        let mut user = provider.lock().unwrap();
        if let Some(metadata) = body.get("private_metadata") {
            user["private_metadata"] = metadata.clone();
        }
        HttpStatus::OK
    }

    async fn get_session(Path(id): Path<String>) -> Result<Json<Value>, HttpStatus> {
        match id.as_str() {
            "sess_active" => Ok(Json(json!({"id": id, "user_id": "user_1", "status": "active"}))),
            "sess_ended" => Ok(Json(json!({"id": id, "user_id": "user_1", "status": "ended"}))),
            _ => Err(HttpStatus::NOT_FOUND),
        }
    }

    async fn spawn_provider() -> (IdentityClient, Provider) {
        let provider: Provider = Arc::new(Mutex::new(json!({
            "id": "user_1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "primary_email_address_id": "idn_2",
            "email_addresses": [
                {"id": "idn_1", "email_address": "old@example.com"},
                {"id": "idn_2", "email_address": "ada@example.com"}
            ],
            "private_metadata": {"plan": "free"}
        })));
        let app = Router::new()
            .route("/v1/users/:id", get(get_user).patch(patch_user))
            .route("/v1/users/:id/metadata", axum::routing::patch(patch_metadata))
            .route("/v1/sessions/:id", get(get_session))
            .with_state(Arc::clone(&provider));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = IdentityClient::new(&format!("http://{addr}/"), SECRET).unwrap();
        (client, provider)
    }

    #[tokio::test]
    async fn test_fetch_seeds_from_primary_email() {
        let (client, _provider) = spawn_provider().await;
        let record = client.fetch(&UserId::from("user_1")).await.unwrap();
        assert_eq!(record.cv, None);
        assert_eq!(record.user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(
            record.cv_or_seeded(),
            CvDocument::seeded("Ada", "Lovelace", "ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_store_cv_keeps_other_metadata() {
        let (client, provider) = spawn_provider().await;
        let user = UserId::from("user_1");
        let mut cv = CvDocument::seeded("Ada", "Lovelace", "ada@example.com");
        cv.personal_info.title = Some("Analyst".to_string());

        client.store_cv(&user, &cv).await.unwrap();

        assert_eq!(provider.lock().unwrap()["private_metadata"]["plan"], json!("free"));
        assert_eq!(client.fetch(&user).await.unwrap().cv, Some(cv));
    }

    #[tokio::test]
    async fn test_store_cv_drops_cleared_fields() {
        let (client, provider) = spawn_provider().await;
        let user = UserId::from("user_1");
        let mut cv = CvDocument::seeded("Ada", "Lovelace", "ada@example.com");
        cv.personal_info.title = Some("Analyst".to_string());
        cv.certifications.push("CFA".to_string());
        client.store_cv(&user, &cv).await.unwrap();

        cv.personal_info.title = None;
        cv.certifications.clear();
        client.store_cv(&user, &cv).await.unwrap();

        let stored = provider.lock().unwrap()["private_metadata"]["cvData"].clone();
        assert!(stored["personalInfo"].get("title").is_none());
        assert!(stored.get("certifications").is_none());
        assert_eq!(client.fetch(&user).await.unwrap().cv, Some(cv));
    }

    #[tokio::test]
    async fn test_unknown_user_is_upstream_error() {
        let (client, _provider) = spawn_provider().await;
        let result = client.fetch(&UserId::from("user_404")).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_corrupt_cv_attribute_is_rejected() {
        let (client, provider) = spawn_provider().await;
        provider.lock().unwrap()["private_metadata"]["cvData"] = json!("not a cv");
        let result = client.fetch(&UserId::from("user_1")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_session_verification() {
        let (client, _provider) = spawn_provider().await;
        assert_eq!(
            client.verify("sess_active").await.unwrap(),
            Some(UserId::from("user_1"))
        );
        assert_eq!(client.verify("sess_ended").await.unwrap(), None);
        assert_eq!(client.verify("sess_forged").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tokens_outside_session_id_charset_are_rejected() {
        let (client, _provider) = spawn_provider().await;
        assert_eq!(client.verify("../users/user_1").await.unwrap(), None);
        assert_eq!(client.verify("sess_active?junk=1").await.unwrap(), None);
        assert_eq!(client.verify("sess_active/").await.unwrap(), None);
    }
}
