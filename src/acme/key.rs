use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::{
    hash::MessageDigest,
    pkey::{Id, PKey, Private},
    rsa::Rsa,
    sign::Signer,
};
use serde_json::{Value, json};
use thiserror::Error;
use zeroize::Zeroizing;

/// Modulus size for newly generated account keys.
pub const ACCOUNT_KEY_BITS: u32 = 2048;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to generate RSA key: {0}")]
    Generate(openssl::error::ErrorStack),
    #[error("failed to decode private key PEM: {0}")]
    Decode(openssl::error::ErrorStack),
    #[error("unsupported account key type {0:?}; expected RSA")]
    Unsupported(Id),
    #[error("failed to encode private key: {0}")]
    Encode(openssl::error::ErrorStack),
    #[error("failed to sign request: {0}")]
    Sign(openssl::error::ErrorStack),
}

/// RSA private key identifying an ACME account.
#[derive(Clone)]
pub struct AccountKey {
    pkey: PKey<Private>,
}

impl AccountKey {
    pub fn generate_rsa(bits: u32) -> Result<Self, KeyError> {
        let rsa = Rsa::generate(bits).map_err(KeyError::Generate)?;
        let pkey = PKey::from_rsa(rsa).map_err(KeyError::Generate)?;
        Ok(Self { pkey })
    }

    /// Accepts PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) PEM.
    pub fn from_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let pkey = PKey::private_key_from_pem(pem).map_err(KeyError::Decode)?;
        if pkey.id() != Id::RSA {
            return Err(KeyError::Unsupported(pkey.id()));
        }
        Ok(Self { pkey })
    }

    pub fn to_pkcs1_pem(&self) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        let rsa = self.pkey.rsa().map_err(KeyError::Encode)?;
        rsa.private_key_to_pem()
            .map(Zeroizing::new)
            .map_err(KeyError::Encode)
    }

    pub fn bits(&self) -> u32 {
        self.pkey.bits()
    }

    pub fn public_key_eq(&self, other: &AccountKey) -> bool {
        self.pkey.public_eq(&other.pkey)
    }

    /// Public half as an RFC 7517 JWK.
    pub(crate) fn jwk(&self) -> Result<Value, KeyError> {
        let rsa = self.pkey.rsa().map_err(KeyError::Encode)?;
        Ok(json!({
            "e": URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
            "kty": "RSA",
            "n": URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
        }))
    }

    /// RSASSA-PKCS1-v1_5 with SHA-256 (JWS `RS256`).
    pub(crate) fn sign_rs256(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.pkey).map_err(KeyError::Sign)?;
        signer.update(data).map_err(KeyError::Sign)?;
        signer.sign_to_vec().map_err(KeyError::Sign)
    }

    #[cfg(test)]
    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.pkey
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("type", &self.pkey.id())
            .field("bits", &self.pkey.bits())
            .finish_non_exhaustive()
    }
}
