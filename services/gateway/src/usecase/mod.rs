pub mod account;
pub mod avatar;
pub mod password_reset;
