// Client-side autosave: keeps the local CV in step with the profile API.
// The controller is the only component that talks to a ProfileStore.

pub mod admission;
pub mod controller;
pub mod debounce;
pub mod http_store;
pub mod notify;
pub mod store;

pub use controller::{Phase, SyncController, SyncError, SyncHandle, SyncStatus};
pub use http_store::HttpProfileStore;
pub use notify::{Notification, Severity};
pub use store::{ProfileStore, StoreError, UserId};
