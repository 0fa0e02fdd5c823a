pub mod backup;
pub mod sessions;
