//! Clients for external stores.

pub mod dynamodb;
