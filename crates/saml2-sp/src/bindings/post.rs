//! HTTP-POST Binding implementation.
//!
//! Messages are base64-encoded into a hidden field of an HTML form that
//! submits itself to the destination.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{SamlMessageType, SimpleSignature};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Base64-encodes a message. No compression is applied.
    #[must_use]
    pub fn encode_message(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Base64-decodes a posted message.
    pub fn decode_message(encoded: &str) -> SamlResult<String> {
        let compact: String = encoded.split_whitespace().collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;
        if decoded.is_empty() {
            return Err(SamlError::MalformedMessage("posted message is empty".to_string()));
        }
        Ok(String::from_utf8(decoded)?)
    }

    /// Renders the auto-submitting form.
    ///
    /// `encoded_message` is the output of [`Self::encode_message`]; every
    /// attribute value is HTML-escaped. A simple signature adds hidden
    /// `SigAlg` and `Signature` inputs.
    #[must_use]
    pub fn render_form(
        destination: &str,
        message_type: SamlMessageType,
        encoded_message: &str,
        relay_state: Option<&str>,
        signature: Option<&SimpleSignature>,
    ) -> String {
        let mut inputs = hidden_input(message_type.form_param(), encoded_message);
        if let Some(rs) = relay_state {
            inputs.push_str("\n        ");
            inputs.push_str(&hidden_input("RelayState", rs));
        }
        if let Some(sig) = signature {
            inputs.push_str("\n        ");
            inputs.push_str(&hidden_input("SigAlg", &sig.sig_alg));
            inputs.push_str("\n        ");
            inputs.push_str(&hidden_input("Signature", &sig.signature));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            inputs
        )
    }
}

fn hidden_input(name: &str, value: &str) -> String {
    format!(
        r#"<input type="hidden" name="{name}" value="{}"/>"#,
        html_escape(value)
    )
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(html: &'a str, name: &str) -> &'a str {
        let marker = format!(r#"name="{name}" value=""#);
        let start = html.find(&marker).unwrap() + marker.len();
        let end = html[start..].find('"').unwrap();
        &html[start..start + end]
    }

    #[test]
    fn form_carries_message_and_relay_state() {
        let xml = r#"<samlp:AuthnRequest>test</samlp:AuthnRequest>"#;
        let encoded = HttpPostBinding::encode_message(xml);
        let html = HttpPostBinding::render_form(
            "https://idp.example.com/sso",
            SamlMessageType::Request,
            &encoded,
            Some("state123"),
            None,
        );

        assert!(html.contains(r#"action="https://idp.example.com/sso""#));
        assert!(!html.contains("SigAlg"));
        assert_eq!(HttpPostBinding::decode_message(field(&html, "SAMLRequest")).unwrap(), xml);
        assert_eq!(field(&html, "RelayState"), "state123");
    }

    #[test]
    fn simple_signature_fields_are_rendered() {
        let signature = SimpleSignature {
            sig_alg: "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256".to_string(),
            signature: "c2lnbmF0dXJl".to_string(),
        };
        let html = HttpPostBinding::render_form(
            "https://idp.example.com/sso",
            SamlMessageType::Request,
            "PHg+",
            None,
            Some(&signature),
        );
        assert_eq!(field(&html, "SigAlg"), signature.sig_alg);
        assert_eq!(field(&html, "Signature"), "c2lnbmF0dXJl");
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let html = HttpPostBinding::render_form(
            "https://idp.example.com/sso?a=1&b=2",
            SamlMessageType::Response,
            "PHg+",
            Some(r#""><script>alert(1)</script>"#),
            None,
        );
        assert!(html.contains("a=1&amp;b=2"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn decode_empty_message() {
        assert!(matches!(
            HttpPostBinding::decode_message(""),
            Err(SamlError::MalformedMessage(_))
        ));
    }

    #[test]
    fn html_escape_special_chars() {
        let escaped = html_escape(r#"<script>alert("xss")</script>"#);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
    }
}
