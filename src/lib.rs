//! # FHIR Gateway Library
//!
//! Sits between API consumers and an upstream FHIR server: authenticates
//! with a signed bearer assertion (backend-services client-credentials
//! flow), forwards reads and searches, normalizes upstream errors into an
//! OperationOutcome envelope, and short-circuits repeated by-id lookups
//! with a time-boxed cache.
//!
//! Modules:
//! - `config` — service configuration (YAML)
//! - `auth` — key material, assertion signing, metadata resolution, token lifecycle
//! - `proxy` — response normalization, reference expansion, request forwarding
//! - `cache` — short-term resource cache with interval sweep
//! - `server` — axum routes and application state

pub mod auth;
pub mod cache;
pub mod config;
pub mod observability;
pub mod proxy;
pub mod server;
pub mod tests;
pub mod utils;
