//! Key and certificate encoding helpers.

use base64::Engine;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{CryptoError, CryptoResult};

/// Extracts DER data from the first PEM block with the given label.
pub fn pem_to_der(pem: &str, label: &str) -> CryptoResult<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem
        .find(&begin)
        .map(|pos| pos + begin.len())
        .ok_or_else(|| CryptoError::InvalidKey(format!("missing {label} PEM block")))?;
    let end_pos = pem[start..]
        .find(&end)
        .map(|pos| start + pos)
        .ok_or_else(|| CryptoError::InvalidKey(format!("unterminated {label} PEM block")))?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(b64_data)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid {label} PEM body: {e}")))
}

/// Reads a private key PEM in PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) form.
pub fn private_key_pem_to_der(pem: &str) -> CryptoResult<Vec<u8>> {
    pem_to_der(pem, "PRIVATE KEY").or_else(|_| pem_to_der(pem, "RSA PRIVATE KEY"))
}

/// Parses a certificate and returns its `SubjectPublicKeyInfo` as DER.
pub fn certificate_public_key(cert_der: &[u8]) -> CryptoResult<Vec<u8>> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;

    Ok(cert.public_key().raw.to_vec())
}

/// Returns the certificate subject as an RFC 4514 string.
pub fn certificate_subject(cert_der: &[u8]) -> CryptoResult<String> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CryptoError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;

    Ok(cert.subject().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_to_der_extracts_body() {
        let pem = "-----BEGIN CERTIFICATE-----\nTUIJ\n-----END CERTIFICATE-----";
        assert_eq!(pem_to_der(pem, "CERTIFICATE").unwrap(), vec![0x4d, 0x42, 0x09]);
    }

    #[test]
    fn pem_to_der_rejects_wrong_label() {
        let pem = "-----BEGIN CERTIFICATE-----\nTUIJ\n-----END CERTIFICATE-----";
        assert!(pem_to_der(pem, "PRIVATE KEY").is_err());
    }

    #[test]
    fn certificate_public_key_rejects_garbage() {
        assert!(matches!(
            certificate_public_key(b"not a certificate"),
            Err(CryptoError::InvalidCertificate(_))
        ));
    }
}
