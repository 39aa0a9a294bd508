//! Binding codec behavior across the public API.

use saml2_sp::bindings::{self, HttpMethod, Saml2MessageBinding};

const PAYLOADS: [&str; 2] = [
    r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_1"/>"#,
    "<a>café &amp; 日本語</a>",
];

#[test]
fn redirect_encoding_decodes_with_get() -> anyhow::Result<()> {
    for payload in PAYLOADS {
        for binding in [Saml2MessageBinding::Redirect, Saml2MessageBinding::RedirectXmlSignature] {
            let encoded = bindings::encode(payload, binding)?;
            assert_eq!(bindings::decode(&encoded, HttpMethod::Get)?, payload);
        }
    }
    Ok(())
}

#[test]
fn post_encoding_decodes_without_inflate() -> anyhow::Result<()> {
    for payload in PAYLOADS {
        for binding in [Saml2MessageBinding::Post, Saml2MessageBinding::PostSimpleSign] {
            let encoded = bindings::encode(payload, binding)?;
            assert_eq!(bindings::decode(&encoded, HttpMethod::Post)?, payload);
        }
    }
    Ok(())
}

#[test]
fn empty_and_corrupt_values_are_malformed() {
    for (value, method) in [
        ("", HttpMethod::Post),
        ("", HttpMethod::Get),
        ("not base64!", HttpMethod::Post),
        ("%%%", HttpMethod::Get),
    ] {
        let err = bindings::decode(value, method).unwrap_err();
        assert_eq!(err.code(), "malformed_response_data", "{value:?} via {method:?}");
    }
}

#[test]
fn binding_urns_are_stable() {
    let urns: Vec<&str> = Saml2MessageBinding::ALL.iter().map(|b| b.urn()).collect();
    assert_eq!(
        urns,
        [
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            "urn:oasis:names:tc:SAML:2.0:bindings:URI",
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST-SimpleSign",
        ]
    );
}
