//! ACME account setup for certificate issuers.
//!
//! [`setup::AccountSetup`] makes sure an issuer has an account key stored in
//! a secret and an account registered with its ACME server, and reports the
//! outcome as the issuer's `Ready` condition. Writing that status back and
//! deciding when to run again are left to the caller.

pub mod acme;
mod cancel;
pub mod config;
pub mod domain;
pub mod events;
pub mod issuer;
pub mod secrets;
pub mod setup;

pub use config::ControllerConfig;
pub use setup::{AccountSetup, SetupError};
