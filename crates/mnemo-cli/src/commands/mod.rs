pub mod chat;
pub mod profile;
pub mod setup;
