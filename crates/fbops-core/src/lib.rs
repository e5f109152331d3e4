pub mod app_hosting;
pub mod clock;
pub mod config;
pub mod emulators;
pub mod error;
pub mod iam;
pub mod package;
pub mod ports;
pub mod project;
pub mod rollout;
pub mod runner;
pub mod service_account;

#[cfg(test)]
mod testing;

pub use error::{FbopsError, Result};
