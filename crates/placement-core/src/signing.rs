//! E-signature gateway port
//!
//! The signing vendor is out of scope except for one coupling point: the
//! lifecycle service polls a contract's signing status and treats "fully
//! signed" as the trigger to activate.

use async_trait::async_trait;

/// Signing progress as reported by the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Sent out, nobody has signed yet
    AwaitingSignatures,
    /// Some signers done, some outstanding
    PartiallySigned,
    /// All parties signed
    FullySigned,
    /// Withdrawn or voided at the vendor
    Revoked,
}

/// E-signature vendor failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("signature vendor error: {0}")]
pub struct SignatureError(pub String);

/// E-signature vendor operations
#[async_trait]
pub trait SignatureGateway: Send + Sync {
    /// Current signing status of an external contract reference
    async fn contract_status(&self, external_ref: &str)
        -> Result<SignatureStatus, SignatureError>;
}
