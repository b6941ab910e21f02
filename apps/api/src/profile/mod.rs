//! Server-side per-user profile records.
//!
//! A record is a richer per-user attribute map; the CV occupies a single
//! attribute (`cvData`) in it and is always replaced whole.

pub mod identity;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::cv::CvDocument;
use crate::errors::AppError;
use crate::models::user::{User, UserId};

/// Metadata key the CV is stored under.
pub const CV_ATTRIBUTE: &str = "cvData";

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub user: User,
    pub cv: Option<CvDocument>,
}

impl ProfileRecord {
    /// The stored CV, or a new document seeded from the identity profile.
    pub fn cv_or_seeded(self) -> CvDocument {
        match self.cv {
            Some(cv) => cv,
            None => CvDocument::seeded(
                self.user.first_name.as_deref().unwrap_or_default(),
                self.user.last_name.as_deref().unwrap_or_default(),
                self.user.email.as_deref().unwrap_or_default(),
            ),
        }
    }
}

/// Backend holding profile records. Carried in `AppState` as `Arc<dyn ProfileRecords>`.
#[async_trait]
pub trait ProfileRecords: Send + Sync {
    async fn fetch(&self, user: &UserId) -> Result<ProfileRecord, AppError>;

    async fn store_cv(&self, user: &UserId, cv: &CvDocument) -> Result<(), AppError>;
}

/// Process-local profile records. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryProfileStore {
    records: RwLock<HashMap<UserId, ProfileRecord>>,
}

impl MemoryProfileStore {
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let records = users
            .into_iter()
            .map(|user| (user.id.clone(), ProfileRecord { user, cv: None }))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    fn poisoned() -> AppError {
        AppError::Internal(anyhow::anyhow!("profile store lock poisoned"))
    }
}

#[async_trait]
impl ProfileRecords for MemoryProfileStore {
    async fn fetch(&self, user: &UserId) -> Result<ProfileRecord, AppError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(user).cloned().unwrap_or_else(|| ProfileRecord {
            user: User::anonymous(user.clone()),
            cv: None,
        }))
    }

    async fn store_cv(&self, user: &UserId, cv: &CvDocument) -> Result<(), AppError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        records
            .entry(user.clone())
            .or_insert_with(|| ProfileRecord {
                user: User::anonymous(user.clone()),
                cv: None,
            })
            .cv = Some(cv.clone());
        Ok(())
    }
}
