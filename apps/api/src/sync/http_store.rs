//! `ProfileStore` over the profile API.
//!
//! The server derives identity from the session token, so the `user`
//! argument is only used for logging.
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::cv::CvDocument;
use crate::sync::store::{ProfileStore, StoreError, UserId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpProfileStore {
    client: Client,
    base_url: String,
    session_token: String,
}

impl HttpProfileStore {
    pub fn new(base_url: &str, session_token: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build profile API HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn unavailable(e: reqwest::Error) -> StoreError {
    StoreError::RemoteUnavailable(e.to_string())
}

fn check(response: Response) -> Result<Response, StoreError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthenticated),
        status if !status.is_success() => Err(StoreError::RemoteUnavailable(format!(
            "{} returned {status}",
            response.url().path()
        ))),
        _ => Ok(response),
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn get(&self, user: &UserId) -> Result<Option<CvDocument>, StoreError> {
        debug!("Loading CV for {user}");
        let response = self
            .client
            .get(self.url("/api/cv/load"))
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(unavailable)?;
        let document = check(response)?.json().await.map_err(unavailable)?;
        Ok(Some(document))
    }

    async fn set(&self, user: &UserId, document: &CvDocument) -> Result<(), StoreError> {
        debug!("Saving CV for {user}");
        let response = self
            .client
            .post(self.url("/api/cv/save"))
            .bearer_auth(&self.session_token)
            .json(document)
            .send()
            .await
            .map_err(unavailable)?;
        check(response)?;
        Ok(())
    }
}
