//! Auth types shared by Portico services.
//!
//! Provides JWT access-token validation and the bearer `Identity` extractor. Tokens are
//! issued by the user service; this crate only verifies them.

pub mod identity;
pub mod token;
