pub mod cache;
pub mod grpc;
pub mod mail;
pub mod rate_limit;
pub mod storage;
