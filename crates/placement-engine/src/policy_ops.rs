//! Policy purchase and status refresh
//!
//! Direct caller-facing policy operations against the insurer. Unlike
//! reconciliation these are synchronous from the caller's point of view, so
//! gateway failures propagate (tagged) instead of being recorded silently.

use crate::gateway::{PlanTerms, PolicyRef};
use crate::reconcile::{ReconcileError, ReconciliationEngine};
use placement_model::{InsurancePolicy, InsuredPerson, PolicyId};

/// A confirmed policy purchase to submit to the issuer
#[derive(Debug, Clone)]
pub struct PolicyApplication {
    /// Person to insure
    pub insured: InsuredPerson,
    /// Plan terms
    pub terms: PlanTerms,
}

impl PolicyApplication {
    /// Create new application
    #[inline]
    #[must_use]
    pub fn new(insured: InsuredPerson, terms: PlanTerms) -> Self {
        Self { insured, terms }
    }
}

impl ReconciliationEngine {
    /// Confirm a policy purchase with the issuer and persist the record
    ///
    /// The local record is persisted in every case; when the issuer call
    /// fails the record keeps its pending status and carries the error
    /// message, ready for a later [`refresh_policy_status`] retry.
    ///
    /// [`refresh_policy_status`]: Self::refresh_policy_status
    ///
    /// # Errors
    /// - `Store` if the record cannot be persisted
    pub async fn confirm_purchase(
        &self,
        application: PolicyApplication,
    ) -> Result<InsurancePolicy, ReconcileError> {
        let mut policy = InsurancePolicy::new(
            application.insured.clone(),
            application.terms.plan_code.clone(),
            application.terms.effective_date,
            application.terms.expire_date,
        );

        match self
            .with_timeout(
                self.gateway_ref()
                    .issue_policy(&application.insured, &application.terms),
            )
            .await
        {
            Ok(issue) => {
                policy.policy_number = issue.policy_number;
                policy.status = issue.status;
                tracing::info!(
                    policy = %policy.id,
                    agency_ref = %policy.agency_ref,
                    "policy purchase confirmed"
                );
            }
            Err(err) => {
                policy.error_message = Some(err.to_string());
                tracing::warn!(
                    agency_ref = %policy.agency_ref,
                    error = %err,
                    "policy purchase not confirmed by issuer"
                );
            }
        }

        self.policies_ref().insert(policy.clone()).await?;
        Ok(policy)
    }

    /// Query the issuer for a policy's current status and update the record
    ///
    /// Looks the policy up by external number when assigned, by agency
    /// reference otherwise.
    ///
    /// # Errors
    /// - `PolicyNotFound` if the local record does not exist
    /// - `Gateway` if the issuer call fails (record left untouched)
    pub async fn refresh_policy_status(
        &self,
        id: PolicyId,
    ) -> Result<InsurancePolicy, ReconcileError> {
        let mut policy = self
            .policies_ref()
            .get(id)
            .await?
            .ok_or(ReconcileError::PolicyNotFound(id))?;

        let lookup = match &policy.policy_number {
            Some(number) => PolicyRef::Number(number.clone()),
            None => PolicyRef::AgencyRef(policy.agency_ref.clone()),
        };

        let status = self
            .with_timeout(self.gateway_ref().query_policy_status(&lookup))
            .await?;

        policy.status = status;
        policy.error_message = None;
        self.policies_ref().update(policy.clone()).await?;

        tracing::debug!(policy = %id, status = ?status, "policy status refreshed");
        Ok(policy)
    }
}
