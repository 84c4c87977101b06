//! Placement Core - contract lifecycle orchestration
//!
//! The lifecycle service owns every caller-facing contract operation:
//! - creation and worker replacement (succession linking)
//! - signature-driven activation, which hands off to the background
//!   reconciliation engine without ever waiting on the insurer
//! - cascading chain deletion
//! - operator recovery through manual insurance resync
//!
//! # Example
//!
//! ```rust,ignore
//! use placement_core::{ContractLifecycleService, NewContract, PlacementConfig};
//!
//! # async fn example(service: ContractLifecycleService) -> Result<(), Box<dyn std::error::Error>> {
//! let contract = service
//!     .create_contract(NewContract::new(customer, worker, kind, start, end))
//!     .await?;
//! service.begin_signing(contract.id).await?;
//! service.mark_active(contract.id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod signing;

// Re-exports for convenience
pub use config::PlacementConfig;
pub use error::LifecycleError;
pub use lifecycle::{
    ChainDeletion, ChainHistory, ContractLifecycleService, NewContract, ReplacementTerms,
};
pub use signing::{SignatureError, SignatureGateway, SignatureStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the lifecycle service
    pub use crate::{
        ContractLifecycleService, LifecycleError, NewContract, PlacementConfig, ReplacementTerms,
        SignatureGateway, SignatureStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
