//! Insurance gateway port
//!
//! The external insurer is a synchronous request/response service across a
//! network boundary. Every failure surfaces as a [`GatewayError`] value;
//! nothing here panics on a bad issuer.

use async_trait::async_trait;
use chrono::NaiveDate;
use placement_model::{InsuredPerson, PolicyStatus};
use std::time::Duration;

/// Error from the external insurer
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Issuer reached but the request was refused
    #[error("issuer rejected the request: {0}")]
    Rejected(String),

    /// Issuer could not be reached
    #[error("issuer unreachable: {0}")]
    Unreachable(String),

    /// Call exceeded the configured deadline
    #[error("issuer call timed out after {0:?}")]
    Timeout(Duration),

    /// Response arrived but could not be interpreted
    #[error("malformed issuer response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Check if a retry might succeed without new input
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

/// Plan terms for a new policy purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTerms {
    /// Issuer plan code
    pub plan_code: String,
    /// Coverage start
    pub effective_date: NaiveDate,
    /// Coverage end
    pub expire_date: NaiveDate,
}

/// Issuer response to a purchase confirmation
#[derive(Debug, Clone)]
pub struct PolicyIssue {
    /// External policy number, when assigned immediately
    pub policy_number: Option<String>,
    /// Status the issuer reports for the new policy
    pub status: PolicyStatus,
    /// Raw response payload, for audit
    pub raw_response: Option<String>,
}

/// Issuer acknowledgement of an insured-person amendment
#[derive(Debug, Clone, Default)]
pub struct AmendReceipt {
    /// Raw response payload, for audit
    pub raw_response: Option<String>,
}

/// How to identify a policy towards the issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRef {
    /// By the external policy number
    Number(String),
    /// By our agency reference (policy number not yet assigned)
    AgencyRef(String),
}

/// External insurer operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InsuranceGateway: Send + Sync {
    /// Confirm a policy purchase with the issuer
    async fn issue_policy(
        &self,
        insured: &InsuredPerson,
        terms: &PlanTerms,
    ) -> Result<PolicyIssue, GatewayError>;

    /// Query the current status of a policy
    async fn query_policy_status(&self, policy: &PolicyRef)
        -> Result<PolicyStatus, GatewayError>;

    /// Replace the insured person on an in-force policy
    async fn amend_insured_person(
        &self,
        policy_number: &str,
        old: &InsuredPerson,
        new: &InsuredPerson,
    ) -> Result<AmendReceipt, GatewayError>;
}
