//! XML Signature validation.

use base64::Engine;

use crate::credential::X509Credential;
use crate::error::{SamlError, SamlResult};
use crate::xml::{self, normalize_whitespace, XmlElement};

use super::{digest_from_uri, SignatureAlgorithm};

/// Values read from a `ds:Signature` element.
#[derive(Debug)]
struct XmlSignature {
    algorithm: SignatureAlgorithm,
    reference_uri: String,
    digest_method: String,
    digest_value: Vec<u8>,
    signature_value: Vec<u8>,
}

/// Verifies the enveloped signature of the element carrying
/// `ID="reference_id"`.
///
/// The element must be the only one carrying that ID, its own `Signature`
/// child must reference it by `#ID`, the digest over the element minus the
/// signature must match, and `SignedInfo` must verify under `credential`.
pub(super) fn verify_enveloped(
    document: &str,
    reference_id: &str,
    credential: &X509Credential,
) -> SamlResult<()> {
    let span = xml::find_element_by_id(document, reference_id)?;
    let signature_span = xml::find_child(document, &span, "Signature").ok_or_else(|| {
        SamlError::SignatureInvalid(format!("element '{reference_id}' is not signed"))
    })?;
    let signature_xml = &document[signature_span.start..signature_span.end];
    let signed_info_span = xml::find_child(document, &signature_span, "SignedInfo")
        .ok_or_else(|| SamlError::SignatureInvalid("no SignedInfo element found".to_string()))?;

    let signature = extract_signature(&XmlElement::parse(signature_xml)?)?;

    if signature.reference_uri != format!("#{reference_id}") {
        return Err(SamlError::SignatureInvalid(format!(
            "reference {} does not point at '{reference_id}'",
            signature.reference_uri
        )));
    }

    // Enveloped-signature transform: digest the element without its signature.
    let element_without_signature = format!(
        "{}{}",
        &document[span.start..signature_span.start],
        &document[signature_span.end..span.end]
    );
    let digest_algorithm = digest_from_uri(&signature.digest_method).ok_or_else(|| {
        SamlError::SignatureInvalid(format!(
            "unsupported digest algorithm: {}",
            signature.digest_method
        ))
    })?;
    let calculated = saml2_crypto::digest(
        digest_algorithm,
        normalize_whitespace(&element_without_signature).as_bytes(),
    );
    if calculated != signature.digest_value {
        return Err(SamlError::SignatureInvalid("digest value mismatch".to_string()));
    }

    let signed_info = normalize_whitespace(&document[signed_info_span.start..signed_info_span.end]);
    verify_data(
        signed_info.as_bytes(),
        &signature.signature_value,
        credential,
        signature.algorithm,
    )
}

/// Verifies a raw signature with the credential's public key.
pub(super) fn verify_data(
    data: &[u8],
    signature: &[u8],
    credential: &X509Credential,
    algorithm: SignatureAlgorithm,
) -> SamlResult<()> {
    let valid = saml2_crypto::rsa_verify(credential.public_key_der(), data, signature, algorithm.rsa())
        .map_err(|e| SamlError::SignatureInvalid(format!("signature verification error: {e}")))?;
    if valid {
        Ok(())
    } else {
        Err(SamlError::SignatureInvalid("signature verification failed".to_string()))
    }
}

fn extract_signature(signature: &XmlElement) -> SamlResult<XmlSignature> {
    let signed_info = signature
        .child("SignedInfo")
        .ok_or_else(|| SamlError::SignatureInvalid("no SignedInfo element found".to_string()))?;

    let algorithm_uri = signed_info
        .child("SignatureMethod")
        .and_then(|m| m.attr("Algorithm"))
        .ok_or_else(|| SamlError::SignatureInvalid("no SignatureMethod found".to_string()))?;
    let algorithm = SignatureAlgorithm::from_uri(algorithm_uri).ok_or_else(|| {
        SamlError::SignatureInvalid(format!("unsupported signature algorithm: {algorithm_uri}"))
    })?;

    let mut references = signed_info.children_named("Reference");
    let reference = references
        .next()
        .ok_or_else(|| SamlError::SignatureInvalid("no Reference found".to_string()))?;
    if references.next().is_some() {
        return Err(SamlError::SignatureInvalid(
            "signature must carry exactly one Reference".to_string(),
        ));
    }

    let reference_uri = reference
        .attr("URI")
        .ok_or_else(|| SamlError::SignatureInvalid("no Reference URI found".to_string()))?
        .to_string();
    let digest_method = reference
        .child("DigestMethod")
        .and_then(|m| m.attr("Algorithm"))
        .ok_or_else(|| SamlError::SignatureInvalid("no DigestMethod found".to_string()))?
        .to_string();
    let digest_value = decode_b64(reference.child_text("DigestValue"), "DigestValue")?;
    let signature_value = decode_b64(signature.child_text("SignatureValue"), "SignatureValue")?;

    Ok(XmlSignature {
        algorithm,
        reference_uri,
        digest_method,
        digest_value,
        signature_value,
    })
}

fn decode_b64(value: Option<&str>, name: &str) -> SamlResult<Vec<u8>> {
    let value: String = value
        .ok_or_else(|| SamlError::SignatureInvalid(format!("no {name} found")))?
        .split_whitespace()
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| SamlError::SignatureInvalid(format!("invalid {name} encoding: {e}")))
}
