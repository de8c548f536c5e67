pub mod challenge;
pub mod email;
pub mod repository;
pub mod types;
