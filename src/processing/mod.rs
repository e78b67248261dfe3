pub mod export;
pub mod profile;
pub mod result;
pub mod summary;
