//! Service provider configuration.
//!
//! Settings are plain serde structs with defaults. [`SpConfig`] is the TOML
//! file form: the settings plus one `[[registration]]` table per identity
//! provider, with key material referenced by PEM file path.
//!
//! ```toml
//! [validator]
//! clock_skew_secs = 300
//!
//! [[registration]]
//! registration_id = "idp1"
//! entity_id = "https://idp.example/metadata"
//! web_sso_url = "https://idp.example/sso"
//! binding = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
//! verification_certificates = ["idp.crt"]
//!
//! [[registration.signing]]
//! private_key = "sp.key"
//! certificate = "sp.crt"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bindings::Saml2MessageBinding;
use crate::credential::X509Credential;
use crate::error::{SamlError, SamlResult};
use crate::registration::RelyingPartyRegistration;
use crate::signature::SignatureAlgorithm;

/// Environment variable overriding [`ValidatorSettings::clock_skew`].
pub const ENV_CLOCK_SKEW_SECS: &str = "SAML2_CLOCK_SKEW_SECS";

/// Environment variable overriding [`ValidatorSettings::require_signed_response`].
pub const ENV_REQUIRE_SIGNED_RESPONSE: &str = "SAML2_REQUIRE_SIGNED_RESPONSE";

/// Response validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// Tolerance applied to every temporal bound.
    #[serde(rename = "clock_skew_secs", with = "seconds")]
    pub clock_skew: Duration,

    /// Reject every assertion unless the response itself is validly signed.
    pub require_signed_response: bool,

    /// Authorities granted to every authenticated subject.
    pub default_authorities: Vec<String>,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            clock_skew: Duration::from_secs(300),
            require_signed_response: false,
            default_authorities: vec!["ROLE_USER".to_string()],
        }
    }
}

/// Outbound authentication request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Algorithm for XML and simple signatures.
    pub signature_algorithm: SignatureAlgorithm,

    /// Binding URN the identity provider should answer with.
    pub protocol_binding: String,

    /// Ask the identity provider to re-authenticate the user.
    pub force_authn: bool,

    /// Ask the identity provider not to interact with the user.
    pub is_passive: bool,

    /// Requested name identifier format URI.
    pub name_id_format: Option<String>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            signature_algorithm: SignatureAlgorithm::default(),
            protocol_binding: Saml2MessageBinding::Post.urn().to_string(),
            force_authn: false,
            is_passive: false,
            name_id_format: None,
        }
    }
}

/// A local key pair referenced by file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairProperties {
    /// PKCS#8 private key PEM file.
    pub private_key: PathBuf,
    /// X.509 certificate PEM file.
    pub certificate: PathBuf,
}

/// One identity provider as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyProperties {
    /// Registration id.
    pub registration_id: String,

    /// Identity provider entity ID.
    pub entity_id: String,

    /// Identity provider single sign-on URL.
    pub web_sso_url: String,

    /// Binding used to reach the identity provider.
    #[serde(default)]
    pub binding: Saml2MessageBinding,

    /// Whether authentication requests are signed.
    #[serde(default = "default_true")]
    pub sign_request: bool,

    /// Local entity ID template override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id_template: Option<String>,

    /// Assertion consumer service URL template override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acs_url_template: Option<String>,

    /// Local key pairs, used for signing and decryption.
    #[serde(default)]
    pub signing: Vec<KeyPairProperties>,

    /// Identity provider certificates, used for verification and encryption.
    #[serde(default)]
    pub verification_certificates: Vec<PathBuf>,
}

const fn default_true() -> bool {
    true
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpConfig {
    /// Response validation settings.
    #[serde(default)]
    pub validator: ValidatorSettings,

    /// Outbound request settings.
    #[serde(default)]
    pub request: RequestSettings,

    /// Identity providers.
    #[serde(default, rename = "registration")]
    pub registrations: Vec<RelyingPartyProperties>,

    /// Directory relative key paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl SpConfig {
    /// Loads the configuration file at `path`.
    ///
    /// Relative key paths inside the file resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> SamlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SamlError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> SamlResult<Self> {
        toml::from_str(content)
            .map_err(|e| SamlError::Configuration(format!("failed to parse config: {e}")))
    }

    /// Applies environment overrides, reading `.env` first if present.
    pub fn from_env_overrides(self) -> SamlResult<Self> {
        let _ = dotenvy::dotenv();
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> SamlResult<Self> {
        if let Some(value) = lookup(ENV_CLOCK_SKEW_SECS) {
            let secs: u64 = value.trim().parse().map_err(|_| {
                SamlError::Configuration(format!("{ENV_CLOCK_SKEW_SECS} must be a number of seconds, got '{value}'"))
            })?;
            self.validator.clock_skew = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(ENV_REQUIRE_SIGNED_RESPONSE) {
            self.validator.require_signed_response = value.trim().parse().map_err(|_| {
                SamlError::Configuration(format!("{ENV_REQUIRE_SIGNED_RESPONSE} must be true or false, got '{value}'"))
            })?;
        }
        Ok(self)
    }

    /// Builds validated registrations, reading every referenced PEM file.
    ///
    /// Verification certificates are added before signing key pairs, each
    /// group in file order.
    pub fn registrations(&self) -> SamlResult<Vec<RelyingPartyRegistration>> {
        self.registrations
            .iter()
            .map(|properties| self.registration(properties))
            .collect()
    }

    fn registration(&self, properties: &RelyingPartyProperties) -> SamlResult<RelyingPartyRegistration> {
        let mut builder = RelyingPartyRegistration::with_registration_id(&properties.registration_id)
            .remote_idp_entity_id(&properties.entity_id)
            .idp_web_sso_url(&properties.web_sso_url)
            .binding(properties.binding)
            .sign_authn_request(properties.sign_request);
        if let Some(template) = &properties.entity_id_template {
            builder = builder.entity_id_template(template);
        }
        if let Some(template) = &properties.acs_url_template {
            builder = builder.assertion_consumer_service_url_template(template);
        }

        for certificate in &properties.verification_certificates {
            builder = builder.credential(X509Credential::verification(&self.read(certificate)?)?);
        }
        for key_pair in &properties.signing {
            builder = builder.credential(X509Credential::signing(
                &self.read(&key_pair.certificate)?,
                &self.read(&key_pair.private_key)?,
            )?);
        }

        builder.build()
    }

    fn read(&self, path: &Path) -> SamlResult<String> {
        let resolved = match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        std::fs::read_to_string(&resolved).map_err(|e| {
            SamlError::Configuration(format!("failed to read {}: {e}", resolved.display()))
        })
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
