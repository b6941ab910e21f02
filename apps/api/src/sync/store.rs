use async_trait::async_trait;
use thiserror::Error;

use crate::cv::CvDocument;
pub use crate::models::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no valid session")]
    Unauthenticated,

    #[error("profile store unavailable: {0}")]
    RemoteUnavailable(String),
}

/// Remote per-user profile record, as seen by the sync controller.
///
/// Writes always replace the whole document.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user: &UserId) -> Result<Option<CvDocument>, StoreError>;

    async fn set(&self, user: &UserId, document: &CvDocument) -> Result<(), StoreError>;
}
