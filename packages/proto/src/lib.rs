//! Generated gRPC bindings for services the gateway talks to.

pub mod user {
    tonic::include_proto!("user");
}
