pub mod emulators;
pub mod iam;
pub mod ports;
pub mod prepare;
pub mod rollout;
pub mod service_account;
