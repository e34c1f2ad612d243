//! Account setup: key provisioning plus registration verification.

mod account_key;
mod error;
pub mod reasons;
mod reconciler;

pub use account_key::AccountKeyProvisioner;
pub use error::{KeyProvisionError, SetupError, SetupFailure};
pub use reconciler::AccountSetup;
