//! HTTP-Redirect Binding implementation.
//!
//! Messages travel in URL query parameters after DEFLATE compression and
//! base64 encoding. Parameter values are percent-encoded as ISO-8859-1.

use std::borrow::Cow;
use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType, SimpleSignature};

/// Largest message accepted after inflation, in bytes.
pub const MAX_INFLATED_SIZE: u64 = 2 * 1024 * 1024;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Deflates and base64-encodes a message.
    pub fn encode_message(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }

    /// Base64-decodes and inflates a message.
    pub fn decode_message(encoded: &str) -> SamlResult<String> {
        let compact: String = encoded.split_whitespace().collect();
        let compressed = base64::engine::general_purpose::STANDARD.decode(compact)?;
        let xml = deflate_decompress(&compressed)?;
        if xml.is_empty() {
            return Err(SamlError::MalformedMessage("inflated message is empty".to_string()));
        }
        Ok(String::from_utf8(xml)?)
    }

    /// Builds the redirect URL.
    ///
    /// Parameters appear in the fixed order `SAMLRequest`/`SAMLResponse`,
    /// `RelayState`, `SigAlg`, `Signature`. `encoded_message` is the output
    /// of [`Self::encode_message`].
    #[must_use]
    pub fn build_url(
        destination: &str,
        message_type: SamlMessageType,
        encoded_message: &str,
        relay_state: Option<&str>,
        signature: Option<&SimpleSignature>,
    ) -> String {
        let separator = if destination.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{destination}{separator}{}={}",
            message_type.form_param(),
            latin1_percent_encode(encoded_message)
        );

        if let Some(rs) = relay_state {
            url.push_str("&RelayState=");
            url.push_str(&latin1_percent_encode(rs));
        }
        if let Some(sig) = signature {
            url.push_str("&SigAlg=");
            url.push_str(&latin1_percent_encode(&sig.sig_alg));
            url.push_str("&Signature=");
            url.push_str(&latin1_percent_encode(&sig.signature));
        }

        url
    }

    /// Decodes a message from a full URL.
    ///
    /// Parameter values are read back as ISO-8859-1, the charset
    /// [`Self::build_url`] writes.
    pub fn decode_url(url: &str) -> SamlResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SamlError::MalformedMessage(format!("invalid URL: {e}")))?;

        let mut message = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for pair in parsed.query().unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "SAMLRequest" => message = Some((latin1_percent_decode(value), SamlMessageType::Request)),
                "SAMLResponse" => message = Some((latin1_percent_decode(value), SamlMessageType::Response)),
                "RelayState" => relay_state = Some(latin1_percent_decode(value)),
                "Signature" => signature = Some(latin1_percent_decode(value)),
                "SigAlg" => sig_alg = Some(latin1_percent_decode(value)),
                _ => {}
            }
        }

        let (encoded, message_type) = message.ok_or_else(|| {
            SamlError::MalformedMessage("no SAMLRequest or SAMLResponse parameter".to_string())
        })?;

        Ok(DecodedMessage {
            xml: Self::decode_message(&encoded)?,
            message_type,
            relay_state,
            signature,
            sig_alg,
        })
    }
}

/// Percent-encodes `value` as ISO-8859-1.
///
/// Characters outside Latin-1 cannot be represented and are replaced by `?`.
#[must_use]
pub fn latin1_percent_encode(value: &str) -> String {
    let bytes: Vec<u8> = value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    match urlencoding::encode_binary(&bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Decodes a value written by [`latin1_percent_encode`]. Each decoded byte
/// is one ISO-8859-1 character; `+` stands for a space.
#[must_use]
pub fn latin1_percent_decode(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode_binary(value.as_bytes())
        .iter()
        .map(|&b| char::from(b))
        .collect()
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses raw DEFLATE data, refusing output beyond
/// [`MAX_INFLATED_SIZE`].
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .take(MAX_INFLATED_SIZE + 1)
        .read_to_end(&mut decompressed)?;
    if decompressed.len() as u64 > MAX_INFLATED_SIZE {
        return Err(SamlError::MalformedMessage(format!(
            "inflated message exceeds {MAX_INFLATED_SIZE} bytes"
        )));
    }
    Ok(decompressed)
}
