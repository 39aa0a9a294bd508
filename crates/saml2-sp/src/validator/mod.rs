//! Response and assertion validation.
//!
//! [`Saml2ResponseValidator::authenticate`] runs one response through:
//!
//! 1. destination check against the delivery URL
//! 2. issuer resolution against the registration's identity provider
//! 3. response signature check (first verification credential to validate wins)
//! 4. assertion candidates: plaintext first, then encrypted, first valid wins
//! 5. subject extraction, decrypting an `EncryptedID` when needed
//!
//! Candidate failures collapse into [`SamlError::NoValidAssertion`].

mod conditions;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ValidatorSettings;
use crate::context::SamlContext;
use crate::credential::{CredentialUsage, X509Credential};
use crate::error::{SamlError, SamlResult};
use crate::registration::RelyingPartyRegistration;
use crate::types::{Assertion, EncryptedElement, NameId, Response};
use crate::xml::{self, XmlElement};

use conditions::AssertionConditions;

/// An inbound response awaiting validation.
#[derive(Debug, Clone)]
pub struct Saml2AuthenticationToken {
    saml_response: String,
    recipient_uri: String,
    idp_entity_id: String,
    local_sp_entity_id: String,
    credentials: Vec<X509Credential>,
}

impl Saml2AuthenticationToken {
    /// Creates a token.
    ///
    /// `recipient_uri` is the URL the response was delivered to, without
    /// query string.
    pub fn new(
        saml_response: impl Into<String>,
        recipient_uri: impl Into<String>,
        idp_entity_id: impl Into<String>,
        local_sp_entity_id: impl Into<String>,
        credentials: Vec<X509Credential>,
    ) -> Self {
        Self {
            saml_response: saml_response.into(),
            recipient_uri: recipient_uri.into(),
            idp_entity_id: idp_entity_id.into(),
            local_sp_entity_id: local_sp_entity_id.into(),
            credentials,
        }
    }

    /// Creates a token for `registration`, resolving the local entity ID
    /// against `base_url`.
    #[must_use]
    pub fn for_registration(
        registration: &RelyingPartyRegistration,
        saml_response: impl Into<String>,
        recipient_uri: impl Into<String>,
        base_url: &str,
    ) -> Self {
        Self::new(
            saml_response,
            recipient_uri,
            registration.remote_idp_entity_id(),
            registration.resolve_entity_id(base_url),
            registration.credentials().to_vec(),
        )
    }

    /// The decoded response XML.
    #[must_use]
    pub fn saml_response(&self) -> &str {
        &self.saml_response
    }

    /// The URL the response was delivered to.
    #[must_use]
    pub fn recipient_uri(&self) -> &str {
        &self.recipient_uri
    }

    /// The expected identity provider entity ID.
    #[must_use]
    pub fn idp_entity_id(&self) -> &str {
        &self.idp_entity_id
    }

    /// The local service provider entity ID.
    #[must_use]
    pub fn local_sp_entity_id(&self) -> &str {
        &self.local_sp_entity_id
    }

    fn credentials_for(&self, usage: CredentialUsage) -> impl Iterator<Item = &X509Credential> {
        self.credentials.iter().filter(move |c| c.has_usage(usage))
    }
}

/// The authenticated identity extracted from a valid assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedAssertion {
    /// Subject name identifier.
    pub subject: String,
    /// Granted authorities.
    pub authorities: BTreeSet<String>,
    /// ID of the accepted assertion.
    pub assertion_id: String,
    /// Identity provider session index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,
    /// Attribute values by attribute name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// Maps the default authorities to the ones granted.
pub trait AuthoritiesMapper: Send + Sync {
    /// Returns the authorities to grant.
    fn map_authorities(&self, authorities: BTreeSet<String>) -> BTreeSet<String>;
}

impl<F> AuthoritiesMapper for F
where
    F: Fn(BTreeSet<String>) -> BTreeSet<String> + Send + Sync,
{
    fn map_authorities(&self, authorities: BTreeSet<String>) -> BTreeSet<String> {
        self(authorities)
    }
}

/// Validates responses and extracts the authenticated subject.
#[derive(Clone)]
pub struct Saml2ResponseValidator {
    context: SamlContext,
    settings: ValidatorSettings,
    authorities_mapper: Option<Arc<dyn AuthoritiesMapper>>,
}

impl fmt::Debug for Saml2ResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saml2ResponseValidator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Saml2ResponseValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(context: SamlContext, settings: ValidatorSettings) -> Self {
        Self {
            context,
            settings,
            authorities_mapper: None,
        }
    }

    /// Sets the authorities mapper. Without one, the configured default
    /// authorities are granted unchanged.
    #[must_use]
    pub fn with_authorities_mapper(mut self, mapper: impl AuthoritiesMapper + 'static) -> Self {
        self.authorities_mapper = Some(Arc::new(mapper));
        self
    }

    /// The validator settings.
    #[must_use]
    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    /// Validates `token` at the current time.
    pub fn authenticate(&self, token: &Saml2AuthenticationToken) -> SamlResult<ValidatedAssertion> {
        self.authenticate_at(token, Utc::now())
    }

    /// Validates `token` as of `now`.
    pub fn authenticate_at(
        &self,
        token: &Saml2AuthenticationToken,
        now: DateTime<Utc>,
    ) -> SamlResult<ValidatedAssertion> {
        let xml = token.saml_response();
        let response = Response::parse(xml)?;

        if let Some(destination) = response.destination.as_deref().filter(|d| !d.is_empty()) {
            if destination != token.recipient_uri() {
                return Err(SamlError::DestinationMismatch {
                    expected: token.recipient_uri().to_string(),
                    actual: destination.to_string(),
                });
            }
        }

        let issuer = response.issuer.as_deref().unwrap_or_default();
        if issuer != token.idp_entity_id() {
            return Err(SamlError::ProviderNotFound(format!(
                "no identity provider registered for issuer '{issuer}'"
            )));
        }
        debug!(issuer, response_id = %response.id, "processing SAML response");

        let response_signed =
            response.signed && self.has_valid_signature(xml, &response.id, Placement::Root, token);
        if !response_signed {
            debug!(response_id = %response.id, "response is not validly signed");
            if self.settings.require_signed_response {
                warn!(issuer, "rejecting response without a valid signature");
                return Err(SamlError::NoValidAssertion);
            }
        }

        if !response.is_success() {
            warn!(issuer, "identity provider returned a non-success status");
            return Err(SamlError::NoValidAssertion);
        }

        let clock_skew = chrono::Duration::from_std(self.settings.clock_skew)
            .map_err(|e| SamlError::Configuration(format!("invalid clock skew: {e}")))?;
        let conditions = AssertionConditions::new(
            token.idp_entity_id(),
            token.local_sp_entity_id(),
            token.recipient_uri(),
            now,
            clock_skew,
        )?;

        let assertion = self
            .first_valid_assertion(xml, &response, token, response_signed, &conditions)?
            .ok_or_else(|| {
                warn!(issuer, "no valid assertion in response");
                SamlError::NoValidAssertion
            })?;

        let subject = self.subject(&assertion, token)?;
        debug!(assertion_id = %assertion.id, "assertion accepted");

        let default_authorities: BTreeSet<String> =
            self.settings.default_authorities.iter().cloned().collect();
        let authorities = match &self.authorities_mapper {
            Some(mapper) => mapper.map_authorities(default_authorities),
            None => default_authorities,
        };

        let mut attributes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for attribute in &assertion.attributes {
            attributes
                .entry(attribute.name.clone())
                .or_default()
                .extend(attribute.values.iter().cloned());
        }

        Ok(ValidatedAssertion {
            subject,
            authorities,
            session_index: assertion.session_index().map(str::to_string),
            assertion_id: assertion.id,
            attributes,
        })
    }

    /// Returns the first candidate passing every check, in document order:
    /// plaintext assertions, then encrypted ones.
    fn first_valid_assertion(
        &self,
        xml: &str,
        response: &Response,
        token: &Saml2AuthenticationToken,
        response_signed: bool,
        conditions: &AssertionConditions<'_>,
    ) -> SamlResult<Option<Assertion>> {
        for assertion in &response.assertions {
            if self.accept(xml, Placement::ChildOfRoot, assertion, token, response_signed, conditions) {
                return Ok(Some(assertion.clone()));
            }
        }

        for encrypted in &response.encrypted_assertions {
            let plaintext = self.decrypt(encrypted, token)?;
            let assertion = match XmlElement::parse(&plaintext).and_then(|e| Assertion::from_element(&e)) {
                Ok(assertion) => assertion,
                Err(e) => {
                    debug!(error = %e, "decrypted assertion is not usable");
                    continue;
                }
            };
            if self.accept(&plaintext, Placement::Root, &assertion, token, response_signed, conditions) {
                return Ok(Some(assertion));
            }
        }

        Ok(None)
    }

    fn accept(
        &self,
        document: &str,
        placement: Placement,
        assertion: &Assertion,
        token: &Saml2AuthenticationToken,
        response_signed: bool,
        conditions: &AssertionConditions<'_>,
    ) -> bool {
        if assertion.signed {
            if !self.has_valid_signature(document, &assertion.id, placement, token) {
                debug!(assertion_id = %assertion.id, "assertion signature is invalid");
                return false;
            }
        } else if !response_signed {
            debug!(assertion_id = %assertion.id, "assertion is not signed");
            return false;
        }

        match conditions.validate(assertion) {
            Ok(()) => true,
            Err(reason) => {
                debug!(assertion_id = %assertion.id, reason, "assertion rejected");
                false
            }
        }
    }

    /// Tries every verification credential in order, once the element
    /// carrying `id` is known to be the one the validator parsed.
    fn has_valid_signature(
        &self,
        document: &str,
        id: &str,
        placement: Placement,
        token: &Saml2AuthenticationToken,
    ) -> bool {
        if !placement.holds(document, id) {
            debug!(id, ?placement, "signed element is not where it was parsed from");
            return false;
        }
        token
            .credentials_for(CredentialUsage::Verification)
            .enumerate()
            .any(|(index, credential)| {
                match self.context.signatures.verify_enveloped(document, id, credential) {
                    Ok(()) => {
                        debug!(id, credential = index, "signature verified");
                        true
                    }
                    Err(e) => {
                        debug!(id, credential = index, error = %e, "signature not verified");
                        false
                    }
                }
            })
    }

    /// Tries every decryption credential in order, returning the last
    /// failure when none succeeds.
    fn decrypt(&self, encrypted: &EncryptedElement, token: &Saml2AuthenticationToken) -> SamlResult<String> {
        let mut last_error = None;
        for credential in token.credentials_for(CredentialUsage::Decryption) {
            match self.context.encryption.decrypt(encrypted, credential) {
                Ok(plaintext) => return Ok(plaintext),
                Err(e) => {
                    debug!(error = %e, "decryption credential failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            SamlError::DecryptionFailed("no decryption credential configured".to_string())
        }))
    }

    fn subject(&self, assertion: &Assertion, token: &Saml2AuthenticationToken) -> SamlResult<String> {
        let Some(subject) = &assertion.subject else {
            return Err(SamlError::MissingUserIdentifier);
        };

        let name_id = match (&subject.name_id, &subject.encrypted_id) {
            (Some(name_id), _) => name_id.clone(),
            (None, Some(encrypted)) => {
                let plaintext = self.decrypt(encrypted, token)?;
                NameId::from_element(&XmlElement::parse(&plaintext)?)
            }
            (None, None) => return Err(SamlError::MissingUserIdentifier),
        };

        let value = name_id.value.trim();
        if value.is_empty() {
            return Err(SamlError::MissingUserIdentifier);
        }
        Ok(value.to_string())
    }
}

/// Where a signed element sits in the document it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Root,
    ChildOfRoot,
}

impl Placement {
    /// True when the single element carrying `id` is at this position.
    fn holds(self, document: &str, id: &str) -> bool {
        let (Ok(element), Ok(root)) = (xml::find_element_by_id(document, id), xml::root_span(document)) else {
            return false;
        };
        match self {
            Self::Root => element.start == root.start,
            Self::ChildOfRoot => xml::child_spans(document, &root).any(|child| child.start == element.start),
        }
    }
}
