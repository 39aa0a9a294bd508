//! RSA operations for XML-DSig and XML-Enc.
//!
//! SAML interoperability still depends on RSA PKCS#1 v1.5 signatures with
//! SHA-256 and on RSA-OAEP (SHA-1, MGF1-SHA-1) key transport, so both are
//! exposed here with raw DER inputs. Callers hold the key material; nothing
//! here caches parsed keys.

use aws_lc_rs::{
    rand::SystemRandom,
    rsa::{
        OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey,
        PublicEncryptingKey, OAEP_SHA1_MGF1SHA1,
    },
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};

use crate::error::{CryptoError, CryptoResult};

/// RSA PKCS#1 v1.5 signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaSignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    Rs512,
}

impl RsaSignatureAlgorithm {
    /// Returns the XML-DSig algorithm URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }
}

/// Signs data using RSA PKCS#1 v1.5.
///
/// # Arguments
///
/// * `key_der` - RSA private key in DER format (PKCS#1 or PKCS#8)
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
pub fn rsa_sign(
    key_der: &[u8],
    data: &[u8],
    algorithm: RsaSignatureAlgorithm,
) -> CryptoResult<Vec<u8>> {
    let key_pair = RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut signature = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        RsaSignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaSignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaSignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut signature)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(signature)
}

/// Verifies an RSA PKCS#1 v1.5 signature.
///
/// Returns `Ok(false)` when the signature does not match; errors are reserved
/// for unusable inputs.
///
/// # Arguments
///
/// * `public_key_der` - RSA public key in DER format (`SubjectPublicKeyInfo`)
/// * `data` - Original data that was signed
/// * `sig` - Signature to verify
/// * `algorithm` - Signature algorithm
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaSignatureAlgorithm,
) -> CryptoResult<bool> {
    use aws_lc_rs::signature::{
        RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    };

    if public_key_der.is_empty() {
        return Err(CryptoError::InvalidKey("empty public key".to_string()));
    }

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        RsaSignatureAlgorithm::Rs256 => &RSA_PKCS1_2048_8192_SHA256,
        RsaSignatureAlgorithm::Rs384 => &RSA_PKCS1_2048_8192_SHA384,
        RsaSignatureAlgorithm::Rs512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    Ok(public_key.verify(data, sig).is_ok())
}

/// Encrypts a content key with RSA-OAEP (SHA-1, MGF1 with SHA-1).
///
/// * `public_key_der` - recipient public key (`SubjectPublicKeyInfo`)
pub fn oaep_encrypt(public_key_der: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let public_key = PublicEncryptingKey::from_der(public_key_der)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA public key: {e}")))?;
    let oaep = OaepPublicEncryptingKey::new(public_key)
        .map_err(|_| CryptoError::Encryption("RSA key unsuitable for OAEP".to_string()))?;

    let mut ciphertext = vec![0u8; oaep.ciphertext_size()];
    let written = oaep
        .encrypt(&OAEP_SHA1_MGF1SHA1, plaintext, &mut ciphertext, None)
        .map_err(|_| CryptoError::Encryption("RSA-OAEP encryption failed".to_string()))?
        .len();
    ciphertext.truncate(written);

    Ok(ciphertext)
}

/// Decrypts an RSA-OAEP (SHA-1, MGF1 with SHA-1) encrypted content key.
///
/// * `private_key_der` - PKCS#8 encoded RSA private key
pub fn oaep_decrypt(private_key_der: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let private_key = PrivateDecryptingKey::from_pkcs8(private_key_der)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA private key: {e}")))?;
    let oaep = OaepPrivateDecryptingKey::new(private_key).map_err(|_| CryptoError::Decryption)?;

    let mut plaintext = vec![0u8; oaep.min_output_size()];
    let written = oaep
        .decrypt(&OAEP_SHA1_MGF1SHA1, ciphertext, &mut plaintext, None)
        .map_err(|_| CryptoError::Decryption)?
        .len();
    plaintext.truncate(written);

    Ok(plaintext)
}
