//! Assertion condition checks.
//!
//! Every check returns a static reason on failure. Reasons are logged at
//! debug level only and never reach the caller.

use chrono::{DateTime, Duration, Utc};

use crate::error::{SamlError, SamlResult};
use crate::types::{Assertion, SubjectConfirmation, SubjectConfirmationData};

/// Why a candidate assertion was rejected.
pub(super) type Rejection = &'static str;

/// Checks one assertion against the expectations of a login attempt.
#[derive(Debug)]
pub(super) struct AssertionConditions<'a> {
    /// Expected assertion issuer.
    pub issuer: &'a str,
    /// Local entity ID that must appear as an audience.
    pub audience: &'a str,
    /// URL the response was delivered to.
    pub recipient: &'a str,
    /// `now - skew`: the earliest acceptable `NotOnOrAfter`.
    earliest: DateTime<Utc>,
    /// `now + skew`: the latest acceptable `NotBefore`.
    latest: DateTime<Utc>,
}

impl<'a> AssertionConditions<'a> {
    /// Fails when `now` widened by `clock_skew` leaves the representable
    /// range of instants.
    pub(super) fn new(
        issuer: &'a str,
        audience: &'a str,
        recipient: &'a str,
        now: DateTime<Utc>,
        clock_skew: Duration,
    ) -> SamlResult<Self> {
        let out_of_range = || SamlError::Configuration(format!("clock skew of {clock_skew} is out of range"));
        Ok(Self {
            issuer,
            audience,
            recipient,
            earliest: now.checked_sub_signed(clock_skew).ok_or_else(out_of_range)?,
            latest: now.checked_add_signed(clock_skew).ok_or_else(out_of_range)?,
        })
    }
}

impl AssertionConditions<'_> {
    pub(super) fn validate(&self, assertion: &Assertion) -> Result<(), Rejection> {
        self.check_issuer(assertion)?;
        self.check_conditions(assertion)?;
        self.check_subject_confirmation(assertion)
    }

    fn check_issuer(&self, assertion: &Assertion) -> Result<(), Rejection> {
        match assertion.issuer.as_deref() {
            Some(issuer) if issuer == self.issuer => Ok(()),
            Some(_) => Err("assertion issuer does not match the identity provider"),
            None => Err("assertion has no issuer"),
        }
    }

    fn check_conditions(&self, assertion: &Assertion) -> Result<(), Rejection> {
        let conditions = assertion
            .conditions
            .as_ref()
            .ok_or("assertion has no conditions")?;
        self.check_time_bounds(conditions.not_before, conditions.not_on_or_after)?;

        if conditions.audience_restrictions.is_empty() {
            return Err("assertion has no audience restriction");
        }
        // Each restriction must admit this service provider.
        if conditions
            .audience_restrictions
            .iter()
            .any(|r| !r.audiences.iter().any(|a| a == self.audience))
        {
            return Err("service provider is not an intended audience");
        }
        Ok(())
    }

    fn check_subject_confirmation(&self, assertion: &Assertion) -> Result<(), Rejection> {
        let subject = assertion.subject.as_ref().ok_or("assertion has no subject")?;
        let mut bearers = subject
            .subject_confirmations
            .iter()
            .filter(|c| c.is_bearer())
            .peekable();
        if bearers.peek().is_none() {
            return Err("assertion has no bearer subject confirmation");
        }

        let mut last = "no bearer subject confirmation is valid";
        for confirmation in bearers {
            match self.check_bearer(confirmation) {
                Ok(()) => return Ok(()),
                Err(reason) => last = reason,
            }
        }
        Err(last)
    }

    fn check_bearer(&self, confirmation: &SubjectConfirmation) -> Result<(), Rejection> {
        let Some(SubjectConfirmationData {
            not_before,
            not_on_or_after,
            recipient,
            ..
        }) = &confirmation.subject_confirmation_data
        else {
            return Ok(());
        };

        if recipient.as_deref().is_some_and(|r| r != self.recipient) {
            return Err("subject confirmation recipient does not match");
        }
        self.check_time_bounds(*not_before, *not_on_or_after)
    }

    /// Valid when `not_before <= now + skew` and `now - skew <= not_on_or_after`.
    fn check_time_bounds(
        &self,
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
    ) -> Result<(), Rejection> {
        if not_before.is_some_and(|t| t > self.latest) {
            return Err("assertion is not yet valid");
        }
        if not_on_or_after.is_some_and(|t| t < self.earliest) {
            return Err("assertion has expired");
        }
        Ok(())
    }
}
