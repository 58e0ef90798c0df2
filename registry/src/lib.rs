//! Contract registry and service layer
//!
//! Holds contract state in memory behind per-contract locks and exposes the
//! effectivity engine's operations over it: field resolution, effective
//! views, policy requirements and compliance, overlap-validated amendment
//! approval, and renewal processing.
//!
//! # Key Components
//!
//! - [`EffectivityService`]: the boundary-facing operations
//! - [`ContractStore`]: concurrent per-contract state map
//! - [`ContractRepository`]: read-side trait for export layers

pub mod repository;
pub mod service;
pub mod store;

// Re-export main types
pub use repository::ContractRepository;
pub use service::{EffectivityService, RegistryError};
pub use store::{ContractSnapshot, ContractState, ContractStore};
