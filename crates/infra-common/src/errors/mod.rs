//! Error types for infra-common

pub mod types;
