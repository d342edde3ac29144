//! Cached user profile and validated merges.

mod manager;
mod model;

pub use manager::ProfileManager;
pub use model::{DEFAULT_PROFILE_ID, FieldValue, ProfileField, ProfileUpdate, UserProfile};
