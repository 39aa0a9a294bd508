//! Registration lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SamlError, SamlResult};

use super::RelyingPartyRegistration;

/// Read-only lookup of registrations by id.
pub trait RelyingPartyRegistrationRepository: Send + Sync {
    /// Returns the registration with `registration_id`, if any.
    fn find_by_registration_id(&self, registration_id: &str) -> Option<Arc<RelyingPartyRegistration>>;

    /// Returns the registration or a provider-not-found error.
    fn require(&self, registration_id: &str) -> SamlResult<Arc<RelyingPartyRegistration>> {
        self.find_by_registration_id(registration_id)
            .ok_or_else(|| SamlError::ProviderNotFound(registration_id.to_string()))
    }
}

/// Registrations held in memory, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelyingPartyRegistrationRepository {
    registrations: HashMap<String, Arc<RelyingPartyRegistration>>,
}

impl InMemoryRelyingPartyRegistrationRepository {
    /// Creates the repository. Duplicate ids are a configuration error.
    pub fn new(registrations: impl IntoIterator<Item = RelyingPartyRegistration>) -> SamlResult<Self> {
        let mut by_id = HashMap::new();
        for registration in registrations {
            let id = registration.registration_id().to_string();
            if by_id.insert(id.clone(), Arc::new(registration)).is_some() {
                return Err(SamlError::Configuration(format!(
                    "duplicate registration id: {id}"
                )));
            }
        }
        Ok(Self { registrations: by_id })
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if no registration is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registration ids, sorted.
    #[must_use]
    pub fn registration_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.registrations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl RelyingPartyRegistrationRepository for InMemoryRelyingPartyRegistrationRepository {
    fn find_by_registration_id(&self, registration_id: &str) -> Option<Arc<RelyingPartyRegistration>> {
        self.registrations.get(registration_id).cloned()
    }
}
