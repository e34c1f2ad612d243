use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};

use super::key::{AccountKey, KeyError};

/// How the signing key is identified in the protected header.
#[derive(Clone, Copy, Debug)]
pub(crate) enum KeyId<'a> {
    /// Embed the public key; only valid for `newAccount`.
    Jwk,
    /// Reference an existing account URL.
    Kid(&'a str),
}

/// Builds a flattened JWS body. `None` payload produces a POST-as-GET.
pub(crate) fn sign(
    key: &AccountKey,
    key_id: KeyId<'_>,
    nonce: &str,
    url: &str,
    payload: Option<&Value>,
) -> Result<Value, KeyError> {
    let mut protected = json!({
        "alg": "RS256",
        "nonce": nonce,
        "url": url,
    });
    match key_id {
        KeyId::Jwk => protected["jwk"] = key.jwk()?,
        KeyId::Kid(kid) => protected["kid"] = Value::String(kid.to_string()),
    }

    let protected = URL_SAFE_NO_PAD.encode(protected.to_string());
    let payload = match payload {
        Some(value) => URL_SAFE_NO_PAD.encode(value.to_string()),
        None => String::new(),
    };
    let signature = key.sign_rs256(format!("{protected}.{payload}").as_bytes())?;

    Ok(json!({
        "protected": protected,
        "payload": payload,
        "signature": URL_SAFE_NO_PAD.encode(signature),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::acme::key::ACCOUNT_KEY_BITS;
    use openssl::{hash::MessageDigest, sign::Verifier};

    pub(crate) fn decode_segment(segment: &str) -> Value {
        let raw = URL_SAFE_NO_PAD.decode(segment).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    pub(crate) fn verify(key: &AccountKey, jws: &Value) -> bool {
        let signing_input = format!(
            "{}.{}",
            jws["protected"].as_str().unwrap(),
            jws["payload"].as_str().unwrap()
        );
        let signature = URL_SAFE_NO_PAD
            .decode(jws["signature"].as_str().unwrap())
            .unwrap();
        let mut verifier = Verifier::new(MessageDigest::sha256(), key.pkey()).unwrap();
        verifier.update(signing_input.as_bytes()).unwrap();
        verifier.verify(&signature).unwrap()
    }

    #[test]
    fn jwk_header_for_new_account() {
        let key = AccountKey::generate_rsa(ACCOUNT_KEY_BITS).unwrap();
        let payload = json!({ "termsOfServiceAgreed": true });
        let jws = sign(
            &key,
            KeyId::Jwk,
            "nonce-1",
            "https://ca.example/new-acct",
            Some(&payload),
        )
        .unwrap();

        let protected = decode_segment(jws["protected"].as_str().unwrap());
        assert_eq!(protected["alg"], "RS256");
        assert_eq!(protected["nonce"], "nonce-1");
        assert_eq!(protected["url"], "https://ca.example/new-acct");
        assert_eq!(protected["jwk"]["kty"], "RSA");
        assert!(protected.get("kid").is_none());
        assert_eq!(decode_segment(jws["payload"].as_str().unwrap()), payload);
        assert!(verify(&key, &jws));
    }

    #[test]
    fn kid_header_and_empty_payload_for_post_as_get() {
        let key = AccountKey::generate_rsa(ACCOUNT_KEY_BITS).unwrap();
        let jws = sign(
            &key,
            KeyId::Kid("https://ca.example/acct/42"),
            "nonce-2",
            "https://ca.example/acct/42",
            None,
        )
        .unwrap();

        let protected = decode_segment(jws["protected"].as_str().unwrap());
        assert_eq!(protected["kid"], "https://ca.example/acct/42");
        assert!(protected.get("jwk").is_none());
        assert_eq!(jws["payload"], "");
        assert!(verify(&key, &jws));
    }
}
