//! Logging bootstrap

pub mod setup;
