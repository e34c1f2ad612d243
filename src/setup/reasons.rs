//! Stable reason codes and messages written to the issuer `Ready` condition.

pub const ERROR_ACCOUNT_REGISTRATION_FAILED: &str = "ErrRegisterACMEAccount";
pub const ERROR_ACCOUNT_VERIFICATION_FAILED: &str = "ErrVerifyACMEAccount";

pub const SUCCESS_ACCOUNT_REGISTERED: &str = "ACMEAccountRegistered";
pub const SUCCESS_ACCOUNT_VERIFIED: &str = "ACMEAccountVerified";

pub const MESSAGE_ACCOUNT_REGISTRATION_FAILED: &str = "Failed to register ACME account: ";
pub const MESSAGE_ACCOUNT_VERIFICATION_FAILED: &str = "Failed to verify ACME account: ";
pub const MESSAGE_ACCOUNT_REGISTERED: &str = "The ACME account was registered with the ACME server";
pub const MESSAGE_ACCOUNT_VERIFIED: &str = "The ACME account was verified with the ACME server";
