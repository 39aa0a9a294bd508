//! Message decoding.

use saml2_sp::bindings::{self, HttpMethod};

/// Decodes a binding value to XML.
pub fn run_decode(value: &str, method: HttpMethod) -> crate::CliResult<String> {
    Ok(bindings::decode(value.trim(), method)?)
}

#[cfg(test)]
mod tests {
    use saml2_sp::bindings::{HttpPostBinding, HttpRedirectBinding};

    use super::*;

    #[test]
    fn decodes_both_methods() {
        let xml = "<samlp:Response/>";
        assert_eq!(run_decode(&HttpPostBinding::encode_message(xml), HttpMethod::Post).unwrap(), xml);
        let deflated = HttpRedirectBinding::encode_message(xml).unwrap();
        assert_eq!(run_decode(&deflated, HttpMethod::Get).unwrap(), xml);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(run_decode("%%%", HttpMethod::Post).is_err());
    }
}
