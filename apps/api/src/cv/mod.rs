// CV document model, edit operations, payload checks and the local snapshot cache.

pub mod cache;
pub mod edit;
pub mod model;
pub mod validation;

pub use edit::{EditError, EditOp, Item, LocalEditStore, PersonalField, Section};
pub use model::CvDocument;
