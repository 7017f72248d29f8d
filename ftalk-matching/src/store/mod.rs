pub mod cache;
pub mod sessions;
