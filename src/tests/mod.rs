#[cfg(test)]
pub mod common;

pub mod cache_sweep;
pub mod config_validation;
pub mod server_routes;
