//! # saml2-crypto
//!
//! Cryptographic primitives for the SAML 2.0 service provider, built on aws-lc-rs.
//!
//! SAML deployments still negotiate SHA-256 signatures and RSA-OAEP key
//! transport, so this crate exposes exactly the operations XML-DSig and
//! XML-Enc need:
//!
//! - [`hash`] - message digests for reference values
//! - [`rsa`] - PKCS#1 v1.5 signatures and RSA-OAEP key transport
//! - [`aead`] - AES-GCM content encryption
//! - [`keys`] - PEM/DER handling and certificate public key extraction
//! - [`random`] - secure random bytes for content keys and IVs

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod hash;
pub mod keys;
pub mod random;
pub mod rsa;

pub use aead::ContentEncryptionAlgorithm;
pub use error::{CryptoError, CryptoResult};
pub use hash::{digest, DigestAlgorithm};
pub use keys::{certificate_public_key, certificate_subject, pem_to_der, private_key_pem_to_der};
pub use rsa::{oaep_decrypt, oaep_encrypt, rsa_sign, rsa_verify, RsaSignatureAlgorithm};
