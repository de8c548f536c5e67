//! Cross-cutting plumbing shared by Portico services: tracing setup, request-id and
//! trace layers, health handlers and environment helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod tracing;
