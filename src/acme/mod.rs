mod client;
mod http;
mod jws;
mod key;

pub use client::{
    AcmeClient, AcmeClientError, AcmeClientFactory, NewRegistration, Problem, Registration,
};
pub use http::{HttpAcmeClient, HttpAcmeClientFactory};
pub use key::{ACCOUNT_KEY_BITS, AccountKey, KeyError};
