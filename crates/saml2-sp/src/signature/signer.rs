//! XML Signature creation.

use base64::Engine;

use crate::credential::{CredentialUsage, X509Credential};
use crate::error::{SamlError, SamlResult};
use crate::types::transforms;
use crate::xml::{self, normalize_whitespace};

use super::SignatureAlgorithm;

/// Signs the element carrying `ID="reference_id"` and inserts the
/// `ds:Signature` after its `Issuer` child (or first in its content).
pub(super) fn sign_enveloped(
    document: &str,
    reference_id: &str,
    credential: &X509Credential,
    algorithm: SignatureAlgorithm,
    include_certificate: bool,
) -> SamlResult<String> {
    let span = xml::find_element_by_id(document, reference_id)
        .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
    if span.is_empty_element() {
        return Err(SamlError::SignatureCreation(format!(
            "element '{reference_id}' has no content to carry a signature"
        )));
    }

    let insert_position = xml::find_child(document, &span, "Issuer")
        .map_or(span.start_tag_end, |issuer| issuer.end);

    let canonical_element = normalize_whitespace(&document[span.start..span.end]);
    let digest = saml2_crypto::digest(algorithm.digest(), canonical_element.as_bytes());
    let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

    let signed_info = build_signed_info(reference_id, &digest_b64, algorithm);
    let signature_value = sign_data(
        normalize_whitespace(&signed_info).as_bytes(),
        credential,
        algorithm,
    )?;
    let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

    let certificate = include_certificate.then(|| credential.certificate_der());
    let signature_element = build_signature_element(&signed_info, &signature_b64, certificate);

    Ok(format!(
        "{}{}{}",
        &document[..insert_position],
        signature_element,
        &document[insert_position..]
    ))
}

/// Signs raw data with the credential's private key.
pub(super) fn sign_data(
    data: &[u8],
    credential: &X509Credential,
    algorithm: SignatureAlgorithm,
) -> SamlResult<Vec<u8>> {
    let key = credential
        .require_private_key(CredentialUsage::Signing)
        .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
    saml2_crypto::rsa_sign(key, data, algorithm.rsa())
        .map_err(|e| SamlError::SignatureCreation(format!("RSA signing failed: {e}")))
}

fn build_signed_info(reference_id: &str, digest_b64: &str, algorithm: SignatureAlgorithm) -> String {
    format!(
        r##"<ds:SignedInfo>
<ds:CanonicalizationMethod Algorithm="{c14n}"/>
<ds:SignatureMethod Algorithm="{signature}"/>
<ds:Reference URI="#{reference_id}">
<ds:Transforms>
<ds:Transform Algorithm="{enveloped}"/>
<ds:Transform Algorithm="{c14n}"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="{digest}"/>
<ds:DigestValue>{digest_b64}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>"##,
        c14n = transforms::EXCLUSIVE_C14N,
        signature = algorithm.uri(),
        enveloped = transforms::ENVELOPED_SIGNATURE,
        digest = algorithm.digest_uri(),
    )
}

fn build_signature_element(
    signed_info: &str,
    signature_value: &str,
    certificate_der: Option<&[u8]>,
) -> String {
    let mut signature = format!(
        r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
{signed_info}
<ds:SignatureValue>{signature_value}</ds:SignatureValue>"#
    );

    if let Some(cert) = certificate_der {
        let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
        signature.push_str(&format!(
            r#"
<ds:KeyInfo>
<ds:X509Data>
<ds:X509Certificate>{cert_b64}</ds:X509Certificate>
</ds:X509Data>
</ds:KeyInfo>"#
        ));
    }

    signature.push_str("\n</ds:Signature>");
    signature
}
